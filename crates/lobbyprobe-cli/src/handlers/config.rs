//! Config command handler

use crate::commands::{ConfigArgs, PlanArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_plan, Printer};
use lobbyprobe::config::{load_actions, load_targets, load_tiles, GameCatalog, OperatorCurrencyMatrix};
use lobbyprobe::locator::TargetRegistry;
use lobbyprobe::protocol::{DropdownField, LOBBY_MARKER_KEY};
use tracing::debug;

/// Loaded configuration files
#[derive(Debug, Clone)]
pub struct Plan {
    /// Locator targets
    pub targets: TargetRegistry,
    /// Allowed currencies per operator
    pub matrix: OperatorCurrencyMatrix,
    /// Known games
    pub catalog: GameCatalog,
}

/// Load and check all three configuration files
pub fn load_plan(args: &PlanArgs) -> CliResult<Plan> {
    let targets = load_targets(&args.targets)?;
    let matrix = load_actions(&args.actions)?;
    let catalog = load_tiles(&args.tiles)?;
    debug!(
        targets = targets.len(),
        operators = matrix.operators().count(),
        games = catalog.len(),
        "configuration loaded"
    );

    let required = [
        LOBBY_MARKER_KEY.to_string(),
        DropdownField::operator().label_key,
        DropdownField::currency().label_key,
    ];
    if let Some(missing) = required.iter().find(|key| targets.get(key).is_none()) {
        return Err(CliError::config(format!(
            "{} defines no `{missing}` target",
            args.targets.display()
        )));
    }
    if matrix.is_empty() {
        return Err(CliError::config(format!(
            "{} allows no operator/currency pairs",
            args.actions.display()
        )));
    }
    Ok(Plan {
        targets,
        matrix,
        catalog,
    })
}

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let plan = load_plan(&args.plan)?;
    let keys: Vec<&str> = plan.targets.keys().collect();
    let printer = Printer::new(config.use_color(), config.verbosity.is_quiet());
    printer.block(&render_plan(&plan.matrix, &plan.catalog, &keys, config.use_color()));
    printer.always("configuration OK");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const TARGETS: &str = "targets:\n  select_a_game_header:\n    type: text\n    synonyms: [\"Select a Game\"]\n  operator_label:\n    type: text\n  currency_label:\n    type: text\n";
    const ACTIONS: &str = "canonical_menu_actions:\n  operator_and_currency:\n    - name: select_operator\n    - name: select_currency\n      constraints:\n        allowed_values_by_operator:\n          WowVegas: [SC, WOW]\n";
    const TILES: &str = "tiles:\n  edg201: Lucky Sevens\n";

    fn write_plan(dir: &Path, targets: &str, actions: &str) -> PlanArgs {
        let args = PlanArgs {
            targets: dir.join("targets.yaml"),
            actions: dir.join("actions.yaml"),
            tiles: dir.join("tiles.yaml"),
        };
        fs::write(&args.targets, targets).unwrap();
        fs::write(&args.actions, actions).unwrap();
        fs::write(&args.tiles, TILES).unwrap();
        args
    }

    #[test]
    fn test_load_plan() {
        let dir = TempDir::new().unwrap();
        let plan = load_plan(&write_plan(dir.path(), TARGETS, ACTIONS)).unwrap();
        assert_eq!(plan.matrix.currencies_for("Wow Vegas"), ["SC", "WOW"]);
        assert_eq!(plan.catalog.len(), 1);
    }

    #[test]
    fn test_missing_lobby_marker_rejected() {
        let dir = TempDir::new().unwrap();
        let targets = "targets:\n  home_button:\n    type: text\n";
        let err = load_plan(&write_plan(dir.path(), targets, ACTIONS)).unwrap_err();
        assert!(err.to_string().contains(LOBBY_MARKER_KEY));
    }

    #[test]
    fn test_missing_dropdown_label_rejected() {
        let dir = TempDir::new().unwrap();
        let targets = "targets:\n  select_a_game_header:\n    type: text\n  operator_label:\n    type: text\n";
        let err = load_plan(&write_plan(dir.path(), targets, ACTIONS)).unwrap_err();
        assert!(err.to_string().contains("currency_label"));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let dir = TempDir::new().unwrap();
        let actions = "canonical_menu_actions:\n  operator_and_currency:\n    - name: select_currency\n      constraints:\n        allowed_values_by_operator: {}\n";
        let err = load_plan(&write_plan(dir.path(), TARGETS, actions)).unwrap_err();
        assert!(err.to_string().contains("no operator/currency"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut args = write_plan(dir.path(), TARGETS, ACTIONS);
        args.tiles = dir.path().join("absent.yaml");
        let err = load_plan(&args).unwrap_err();
        assert!(matches!(err, CliError::Probe(_)));
    }
}
