//! Matrix run report.
//!
//! One [`CellReport`] per operator/currency pair, holding the outcome of both
//! dropdown steps, whether the lobby came back, and one [`GameOutcome`] per
//! requested game. The [`FailureMode`] records whether the run was allowed to
//! stop on a dropdown failure.
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │  FailureMode::       │     │  FailureMode::       │
//! │  AndonCord           │     │  CollectAll          │
//! │                      │     │                      │
//! │  stop the run on the │     │  record every cell   │
//! │  first failed        │     │  and keep going      │
//! │  dropdown step       │     │                      │
//! └──────────────────────┘     └──────────────────────┘
//! ```

use crate::protocol::{ClickStage, ReturnPath, Selection, TileOpen};
use crate::result::{ProbeResult, StepFailure, StepResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// What the runner does after a failed dropdown step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the whole run
    AndonCord,
    /// Record and continue
    #[default]
    CollectAll,
}

impl FailureMode {
    /// Mode matching a stop-on-fail flag
    #[must_use]
    pub const fn from_stop_on_fail(stop_on_fail: bool) -> Self {
        if stop_on_fail {
            Self::AndonCord
        } else {
            Self::CollectAll
        }
    }
}

/// Outcome of one dropdown step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Value asked for
    pub desired: String,
    /// Whether the value was verified
    pub ok: bool,
    /// Attempts used, when verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Failure, when not verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl StepOutcome {
    /// Record a dropdown result
    #[must_use]
    pub fn from_selection(desired: &str, result: &StepResult<Selection>) -> Self {
        match result {
            Ok(selection) => Self {
                desired: desired.to_string(),
                ok: true,
                attempts: Some(selection.attempts),
                failure: None,
            },
            Err(failure) => Self {
                desired: desired.to_string(),
                ok: false,
                attempts: None,
                failure: Some(failure.clone()),
            },
        }
    }
}

/// Outcome of one game in a cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOutcome {
    /// Tile id
    pub game_id: String,
    /// Display name
    pub name: String,
    /// Whether the tile opened
    pub opened: bool,
    /// Click stage that opened the tile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ClickStage>,
    /// Forward scroll steps before the tile opened
    pub scrolls: u32,
    /// How the game was left
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_path: Option<ReturnPath>,
    /// Whether the lobby came back after leaving
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lobby_restored: Option<bool>,
    /// Why the game failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl GameOutcome {
    /// A game whose tile opened
    #[must_use]
    pub fn opened(name: impl Into<String>, open: &TileOpen) -> Self {
        Self {
            game_id: open.tile_id.clone(),
            name: name.into(),
            opened: true,
            stage: Some(open.stage),
            scrolls: open.scrolls,
            return_path: None,
            lobby_restored: None,
            failure: None,
        }
    }

    /// A game whose tile did not open
    #[must_use]
    pub fn failed(game_id: impl Into<String>, name: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            name: name.into(),
            opened: false,
            stage: None,
            scrolls: 0,
            return_path: None,
            lobby_restored: None,
            failure: Some(failure.into()),
        }
    }

    /// Opened and the lobby came back
    #[must_use]
    pub fn passed(&self) -> bool {
        self.opened && self.lobby_restored == Some(true)
    }
}

/// One operator/currency pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellReport {
    /// Operator asked for
    pub operator: String,
    /// Currency asked for
    pub currency: String,
    /// Operator dropdown outcome
    pub operator_step: StepOutcome,
    /// Currency dropdown outcome
    pub currency_step: StepOutcome,
    /// Whether the lobby marker showed after both dropdowns
    pub lobby_ready: bool,
    /// Per-game outcomes, in request order
    pub games: Vec<GameOutcome>,
}

impl CellReport {
    /// Both dropdown steps verified
    #[must_use]
    pub fn dropdowns_ok(&self) -> bool {
        self.operator_step.ok && self.currency_step.ok
    }

    /// Every step in the cell passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.dropdowns_ok() && self.lobby_ready && self.games.iter().all(GameOutcome::passed)
    }
}

/// Report of a whole matrix run
#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    /// Run identifier
    pub run_id: Uuid,
    /// Lobby entry URL
    pub entry_url: String,
    /// Failure mode the run used
    pub failure_mode: FailureMode,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Finish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Whether the run stopped early
    pub aborted: bool,
    /// Cells in run order
    pub cells: Vec<CellReport>,
}

impl MatrixReport {
    /// Start a report now
    #[must_use]
    pub fn new(entry_url: impl Into<String>, failure_mode: FailureMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entry_url: entry_url.into(),
            failure_mode,
            started_at: Utc::now(),
            finished_at: None,
            aborted: false,
            cells: Vec::new(),
        }
    }

    /// Record a cell.
    ///
    /// Returns `false` when the run has to stop: the mode is
    /// [`FailureMode::AndonCord`] and a dropdown step failed.
    pub fn record(&mut self, cell: CellReport) -> bool {
        let pull = self.failure_mode == FailureMode::AndonCord && !cell.dropdowns_ok();
        if pull {
            tracing::warn!(operator = %cell.operator, currency = %cell.currency, "dropdown failed, stopping run");
            self.aborted = true;
        }
        self.cells.push(cell);
        !pull
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Cells that passed
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.passed()).count()
    }

    /// Cells that failed
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.cells.len() - self.passed_count()
    }

    /// Games opened across all cells
    #[must_use]
    pub fn games_opened(&self) -> usize {
        self.cells.iter().flat_map(|c| &c.games).filter(|g| g.opened).count()
    }

    /// Games attempted across all cells
    #[must_use]
    pub fn games_attempted(&self) -> usize {
        self.cells.iter().map(|c| c.games.len()).sum()
    }

    /// Every cell passed and the run was not stopped
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.aborted && self.failed_count() == 0
    }

    /// Wall time of the run, once finished
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} cells passed, {}/{} games opened{}",
            self.passed_count(),
            self.cells.len(),
            self.games_opened(),
            self.games_attempted(),
            if self.aborted { " (stopped early)" } else { "" }
        )
    }

    /// Report as pretty JSON
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> ProbeResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
