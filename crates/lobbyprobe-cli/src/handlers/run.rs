//! Run command handler
//!
//! Wires the real collaborators (Chromium behind a session guard,
//! Tesseract, an optional detector command) into a [`MenuRunner`] and
//! prints the report.

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::config::load_plan;
use crate::output::{render_report, Printer};
use lobbyprobe::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Build the runner configuration from the command line
pub fn runner_config(args: &RunArgs) -> CliResult<RunnerConfig> {
    let operators: Vec<String> = args
        .operators
        .iter()
        .map(|op| op.trim().to_string())
        .filter(|op| !op.is_empty())
        .collect();
    if operators.is_empty() {
        return Err(CliError::invalid_argument("at least one --operator is required"));
    }

    let currencies = CurrencySelection::parse(&args.currencies);
    if currencies == CurrencySelection::List(Vec::new()) {
        return Err(CliError::invalid_argument(format!(
            "--currencies `{}` names no currency",
            args.currencies
        )));
    }

    let mut config = RunnerConfig::new()
        .with_entry_url(args.url.trim())
        .with_operators(operators)
        .with_currencies(currencies)
        .with_games(GameSelection::parse(&args.games))
        .with_dwell(Duration::from_secs(args.dwell))
        .with_stop_on_fail(args.stop_on_fail);
    if let Some(player_id) = &args.player_id {
        config = config.with_player_id(player_id.clone());
    }
    Ok(config)
}

/// Browser launch settings from the command line
#[must_use]
pub fn driver_config(args: &RunArgs) -> DriverConfig {
    let config = DriverConfig::new().headless(args.headless);
    match &args.chrome {
        Some(path) => config.executable(path.clone()),
        None => config,
    }
}

/// Secondary variable naming the Tesseract executable
pub const TESSERACT_EXE_ENV: &str = "TESSERACT_EXE";

/// Tesseract executable from `--tesseract` or `TESSERACT_CMD`, else `TESSERACT_EXE`
#[must_use]
pub fn tesseract_program(args: &RunArgs) -> Option<PathBuf> {
    resolve_tesseract(args.tesseract.as_deref(), std::env::var_os(TESSERACT_EXE_ENV))
}

fn resolve_tesseract(explicit: Option<&Path>, fallback: Option<OsString>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| fallback.map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
}

fn build_locator(args: &RunArgs, targets: TargetRegistry, games: &GameSelection) -> CliResult<Locator> {
    let mut recognizer = TesseractRecognizer::new();
    if let Some(program) = tesseract_program(args) {
        info!(program = %program.display(), "using tesseract");
        recognizer = recognizer.with_program(program);
    }
    let locator = Locator::new(targets, Arc::new(recognizer));

    match &args.detector {
        Some(line) => Ok(locator.with_detector(Arc::new(CommandDetector::from_command_line(line)?))),
        None => {
            if *games != GameSelection::None {
                warn!("no --detector given, game tiles will not be found");
            }
            Ok(locator)
        }
    }
}

/// Execute the run command; `Ok(true)` when every cell passed
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<bool> {
    if !CdpFactory::available() {
        return Err(CliError::feature_disabled(
            "`run` drives Chromium; rebuild lobbyprobe-cli with the `browser` feature",
        ));
    }

    let plan = load_plan(&args.plan)?;
    let runner_config = runner_config(args)?;
    let locator = build_locator(args, plan.targets, &runner_config.games)?;

    let clock = SystemClock::shared();
    let timings = Timings::default();
    let mut guard = SessionGuard::new(Box::new(CdpFactory::new(driver_config(args))), clock.clone())
        .with_restore_settle(timings.restore_settle);
    guard.start()?;
    info!(url = %runner_config.entry_url, headless = args.headless, "browser started");

    let it = Interactor::new(Box::new(guard), locator, clock).with_timings(timings);
    let mut runner = MenuRunner::new(it, runner_config, plan.matrix, plan.catalog);
    let result = runner.run();

    let mut browser = runner.into_interactor().into_browser();
    if let Err(e) = browser.close() {
        warn!(error = %e, "browser did not close cleanly");
    }
    let report = result?;

    let printer = Printer::new(config.use_color(), config.verbosity.is_quiet());
    if config.verbosity.is_quiet() {
        printer.always(&report.summary());
    } else {
        printer.block(&render_report(&report, config.use_color()));
    }

    if let Some(path) = &args.report {
        report
            .save_json(path)
            .map_err(|e| CliError::report(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "report written");
    }
    Ok(report.all_passed())
}
