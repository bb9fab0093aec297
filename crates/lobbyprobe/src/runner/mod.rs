//! Matrix runner.
//!
//! Opens the lobby once, then walks every operator × currency cell: both
//! dropdowns, a wait for the lobby, and each requested game (open, dwell,
//! return, wait for the lobby again). Step failures are recorded in the
//! [`MatrixReport`] and the run moves on; only a failed entry navigation or
//! an unresolvable game selection ends it with an error. With stop-on-fail
//! set, a failed dropdown step stops the run after recording its cell.

mod config;
mod state;

pub use config::{
    CurrencySelection, GameSelection, RunnerConfig, DEFAULT_DWELL, DEFAULT_ENTRY_URL, DEFAULT_OPERATOR,
};
pub use state::SessionState;

use crate::config::{Game, GameCatalog, OperatorCurrencyMatrix};
use crate::protocol::{open_tile, return_to_lobby, select, wait_for_lobby, DropdownField, Interactor};
use crate::reporter::{CellReport, FailureMode, GameOutcome, MatrixReport, StepOutcome};
use crate::result::ProbeResult;
use crate::wait::PollOptions;

/// Runs the operator × currency × game matrix
#[derive(Debug)]
pub struct MenuRunner {
    it: Interactor,
    config: RunnerConfig,
    matrix: OperatorCurrencyMatrix,
    catalog: GameCatalog,
    state: SessionState,
}

impl MenuRunner {
    /// Create a runner
    #[must_use]
    pub fn new(it: Interactor, config: RunnerConfig, matrix: OperatorCurrencyMatrix, catalog: GameCatalog) -> Self {
        let state = SessionState::new(config.player_id.clone());
        Self {
            it,
            config,
            matrix,
            catalog,
            state,
        }
    }

    /// Run parameters
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Lobby state as of the last step
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The interactor
    pub fn interactor(&mut self) -> &mut Interactor {
        &mut self.it
    }

    /// Give the interactor back
    #[must_use]
    pub fn into_interactor(self) -> Interactor {
        self.it
    }

    /// Run the whole matrix
    pub fn run(&mut self) -> ProbeResult<MatrixReport> {
        let games = self.config.games.resolve(&self.catalog)?;
        let mut report = MatrixReport::new(
            self.config.entry_url.clone(),
            FailureMode::from_stop_on_fail(self.config.stop_on_fail),
        );
        tracing::info!(run_id = %report.run_id, url = %self.config.entry_url, games = games.len(), "opening lobby");
        self.it.browser().open(&self.config.entry_url)?;
        self.it.sleep(self.it.timings().entry_settle);

        'operators: for operator in self.config.operators.clone() {
            let currencies = self.config.currencies.resolve(&operator, &self.matrix);
            if currencies.is_empty() {
                tracing::warn!(%operator, "no currencies to run");
            }
            let total = currencies.len();
            for (index, currency) in currencies.iter().enumerate() {
                tracing::info!(%operator, %currency, cell = index + 1, of = total, "cell");
                let cell = self.run_cell(&operator, currency, &games);
                if !report.record(cell) {
                    break 'operators;
                }
            }
        }

        report.finish();
        tracing::info!(run_id = %report.run_id, summary = %report.summary(), "run finished");
        Ok(report)
    }

    /// Run one operator/currency cell.
    ///
    /// With `stop_on_fail` a failed dropdown step ends the cell at once,
    /// without waiting for the lobby; `lobby_ready` is then `false`.
    pub fn run_cell(&mut self, operator: &str, currency: &str, games: &[Game]) -> CellReport {
        let (operator_step, currency_step) = self.set_operator_and_currency(operator, currency);
        let mut cell = CellReport {
            operator: operator.to_string(),
            currency: currency.to_string(),
            operator_step,
            currency_step,
            lobby_ready: false,
            games: Vec::new(),
        };
        if self.config.stop_on_fail && !cell.dropdowns_ok() {
            tracing::warn!(%operator, %currency, "dropdown step failed, skipping lobby wait");
            return cell;
        }
        cell.lobby_ready = self.wait_lobby(self.it.timings().lobby_ready);
        for game in games {
            tracing::info!(game = %game.name, id = %game.id, "opening game");
            cell.games.push(self.open_game(game));
        }
        cell
    }

    /// Select the operator, pause, then select the currency
    pub fn set_operator_and_currency(&mut self, operator: &str, currency: &str) -> (StepOutcome, StepOutcome) {
        let result = select(&mut self.it, &DropdownField::operator(), operator);
        if result.is_ok() {
            self.state.set_operator(operator);
        }
        let operator_step = StepOutcome::from_selection(operator, &result);
        self.it.sleep(self.it.timings().dropdown_pause);

        let result = select(&mut self.it, &DropdownField::currency(), currency);
        if result.is_ok() {
            self.state.set_currency(currency);
        }
        let currency_step = StepOutcome::from_selection(currency, &result);
        tracing::info!(
            operator,
            currency,
            operator_ok = operator_step.ok,
            currency_ok = currency_step.ok,
            "dropdowns"
        );
        (operator_step, currency_step)
    }

    /// Open a game, stay for the dwell time and come back.
    ///
    /// Dwell and return only happen when the tile actually opened.
    pub fn open_game(&mut self, game: &Game) -> GameOutcome {
        let opened = match open_tile(&mut self.it, &game.id, &self.config.scan) {
            Ok(opened) => opened,
            Err(failure) => {
                tracing::info!(game = %game.id, %failure, "game did not open");
                return GameOutcome::failed(&game.id, &game.name, failure.to_string());
            }
        };
        self.state.mark_opened(&game.id);
        let mut outcome = GameOutcome::opened(&game.name, &opened);
        self.it.sleep(self.config.dwell);

        match return_to_lobby(&mut self.it) {
            Ok(path) => outcome.return_path = Some(path),
            Err(err) => {
                tracing::warn!(game = %game.id, error = %err, "return to lobby failed");
                outcome.failure = Some(err.to_string());
            }
        }
        let restored = self.wait_lobby(self.it.timings().lobby_return);
        if !restored && outcome.failure.is_none() {
            outcome.failure = Some("lobby did not come back".to_string());
        }
        outcome.lobby_restored = Some(restored);
        tracing::info!(game = %game.id, stage = %opened.stage, restored, "game done");
        outcome
    }

    fn wait_lobby(&mut self, options: PollOptions) -> bool {
        wait_for_lobby(&mut self.it, options).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "lobby check failed");
            false
        })
    }
}
