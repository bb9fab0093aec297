//! Run configuration.
//!
//! Three YAML files feed a run:
//!
//! - `targets.yaml`: symbolic targets for the [`Locator`](crate::locator::Locator)
//! - `actions.yaml`: the operator to currency allow-list
//! - `tiles.yaml`: the game catalog
//!
//! [`Timings`] collects every settle, pause and poll bound used by the
//! protocols and the runner.

use crate::canonical::{canonical_operator, CanonicalOperator};
use crate::locator::{TargetKind, TargetRegistry, TargetSpec};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::PollOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// TIMINGS
// =============================================================================

/// Settles, pauses and poll bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Settle after clicking a dropdown open
    pub dropdown_open_settle: Duration,
    /// Pause between dropdown attempts and between the two dropdowns
    pub dropdown_pause: Duration,
    /// Poll for the selected value after picking
    pub dropdown_verify: PollOptions,
    /// Settle after each tile scan scroll
    pub scroll_settle: Duration,
    /// Wait for the lobby to go away after a single click
    pub tile_click_wait: PollOptions,
    /// Wait after the stronger click stages
    pub tile_escalation_wait: PollOptions,
    /// Settle after return-to-lobby
    pub return_settle: Duration,
    /// Settle after opening the entry URL
    pub entry_settle: Duration,
    /// Settle after a session was restored
    pub restore_settle: Duration,
    /// Poll for the lobby after both dropdowns
    pub lobby_ready: PollOptions,
    /// Poll for the lobby after leaving a game
    pub lobby_return: PollOptions,
    /// Pause between repeated clicks
    pub click_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            dropdown_open_settle: Duration::from_millis(350),
            dropdown_pause: Duration::from_millis(250),
            dropdown_verify: PollOptions::from_millis(2_500, 150),
            scroll_settle: Duration::from_millis(220),
            tile_click_wait: PollOptions::from_millis(3_000, 150),
            tile_escalation_wait: PollOptions::from_millis(2_000, 150),
            return_settle: Duration::from_millis(600),
            entry_settle: Duration::from_millis(1_800),
            restore_settle: Duration::from_millis(800),
            lobby_ready: PollOptions::from_millis(16_000, 400),
            lobby_return: PollOptions::from_millis(30_000, 500),
            click_settle: Duration::from_millis(50),
        }
    }
}

fn read(path: &Path) -> ProbeResult<String> {
    std::fs::read_to_string(path).map_err(|e| ProbeError::Config {
        message: format!("cannot read {}: {e}", path.display()),
    })
}

fn parse<T: for<'de> Deserialize<'de>>(yaml: &str, what: &str) -> ProbeResult<T> {
    serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::Config {
        message: format!("invalid {what}: {e}"),
    })
}

// =============================================================================
// TARGETS
// =============================================================================

#[derive(Debug, Deserialize)]
struct TargetsFile {
    #[serde(default)]
    targets: BTreeMap<String, TargetKind>,
}

/// Parse `targets.yaml` content
pub fn parse_targets(yaml: &str) -> ProbeResult<TargetRegistry> {
    let file: TargetsFile = parse(yaml, "targets")?;
    let mut registry = TargetRegistry::new();
    for (key, kind) in file.targets {
        if let TargetKind::Object { class_id } = &kind {
            if class_id.trim().is_empty() {
                return Err(ProbeError::config(format!("target {key}: empty class_id")));
            }
        }
        registry.insert(TargetSpec { key, kind });
    }
    Ok(registry)
}

/// Load `targets.yaml`
pub fn load_targets(path: impl AsRef<Path>) -> ProbeResult<TargetRegistry> {
    parse_targets(&read(path.as_ref())?)
}

// =============================================================================
// OPERATOR / CURRENCY MATRIX
// =============================================================================

#[derive(Debug, Deserialize)]
struct ActionsFile {
    #[serde(default)]
    canonical_menu_actions: MenuActions,
}

#[derive(Debug, Default, Deserialize)]
struct MenuActions {
    #[serde(default)]
    operator_and_currency: Vec<MenuAction>,
}

#[derive(Debug, Deserialize)]
struct MenuAction {
    name: String,
    #[serde(default)]
    constraints: Option<ActionConstraints>,
}

#[derive(Debug, Deserialize)]
struct ActionConstraints {
    #[serde(default)]
    allowed_values_by_operator: Option<BTreeMap<String, Vec<String>>>,
}

/// Allowed currencies per operator, keyed by canonical operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorCurrencyMatrix {
    allowed: BTreeMap<CanonicalOperator, Vec<String>>,
}

impl OperatorCurrencyMatrix {
    /// Build from raw operator names; names are canonicalized
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: AsRef<str>,
    {
        let mut allowed = BTreeMap::new();
        for (name, currencies) in entries {
            allowed.insert(canonical_operator(name.as_ref()), currencies);
        }
        Self { allowed }
    }

    /// Allowed currencies for an operator, in configured order
    #[must_use]
    pub fn currencies_for(&self, operator: &str) -> &[String] {
        self.allowed
            .get(&canonical_operator(operator))
            .map_or(&[], Vec::as_slice)
    }

    /// Configured operators
    pub fn operators(&self) -> impl Iterator<Item = &CanonicalOperator> {
        self.allowed.keys()
    }

    /// Whether no operator is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Parse `actions.yaml` content
pub fn parse_actions(yaml: &str) -> ProbeResult<OperatorCurrencyMatrix> {
    let file: ActionsFile = parse(yaml, "actions")?;
    let mapping = file
        .canonical_menu_actions
        .operator_and_currency
        .into_iter()
        .find(|a| a.name == "select_currency")
        .and_then(|a| a.constraints)
        .and_then(|c| c.allowed_values_by_operator)
        .ok_or_else(|| ProbeError::config("allowed_values_by_operator not found in actions config"))?;
    Ok(OperatorCurrencyMatrix::from_entries(mapping))
}

/// Load `actions.yaml`
pub fn load_actions(path: impl AsRef<Path>) -> ProbeResult<OperatorCurrencyMatrix> {
    parse_actions(&read(path.as_ref())?)
}

// =============================================================================
// GAME CATALOG
// =============================================================================

/// A game in the catalog
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Game {
    /// Tile id, also the detector label
    pub id: String,
    /// Display name
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TilesFile {
    #[serde(default)]
    tiles: BTreeMap<String, String>,
}

/// Games ordered by the numeric suffix of their id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameCatalog {
    games: Vec<Game>,
}

fn numeric_suffix(id: &str) -> u64 {
    let digits: String = id
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(u64::MAX)
}

impl GameCatalog {
    /// Build from `(id, name)` pairs
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut games: Vec<Game> = entries.into_iter().map(|(id, name)| Game { id, name }).collect();
        games.sort_by(|a, b| {
            numeric_suffix(&a.id)
                .cmp(&numeric_suffix(&b.id))
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { games }
    }

    /// All games in catalog order
    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Number of games
    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Find a game by id or display name, ignoring case
    #[must_use]
    pub fn resolve(&self, id_or_name: &str) -> Option<&Game> {
        let wanted = id_or_name.trim();
        self.games
            .iter()
            .find(|g| g.id.eq_ignore_ascii_case(wanted))
            .or_else(|| self.games.iter().find(|g| g.name.eq_ignore_ascii_case(wanted)))
    }

    /// Resolve a list of ids or names, failing on the first unknown one
    pub fn resolve_all<S: AsRef<str>>(&self, selection: &[S]) -> ProbeResult<Vec<Game>> {
        selection
            .iter()
            .map(|s| {
                self.resolve(s.as_ref())
                    .cloned()
                    .ok_or_else(|| ProbeError::config(format!("unknown game: {}", s.as_ref())))
            })
            .collect()
    }
}

/// Parse `tiles.yaml` content
pub fn parse_tiles(yaml: &str) -> ProbeResult<GameCatalog> {
    let file: TilesFile = parse(yaml, "tiles")?;
    Ok(GameCatalog::from_entries(file.tiles))
}

/// Load `tiles.yaml`
pub fn load_tiles(path: impl AsRef<Path>) -> ProbeResult<GameCatalog> {
    parse_tiles(&read(path.as_ref())?)
}
