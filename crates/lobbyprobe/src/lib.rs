//! Lobbyprobe: visual locator and interaction-retry engine for game lobbies
//!
//! Canvas-rendered lobbies expose no usable DOM, so lobbyprobe works the way
//! a tester does: it reads text off screenshots, recognizes game tiles with a
//! detector, clicks at pixel coordinates, and checks that the screen changed
//! the way it should. Every interaction is retried within fixed bounds and
//! every wait has a deadline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    LOBBYPROBE Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ MenuRunner │───►│ Protocols  │───►│ Locator    │            │
//! │   │ (matrix)   │    │ dropdown   │    │ Canonical  │            │
//! │   │            │    │ tile/lobby │    │ Coords     │            │
//! │   └────────────┘    └─────┬──────┘    └─────┬──────┘            │
//! │                           │                 │                   │
//! │                     ┌─────▼──────┐    ┌─────▼──────┐            │
//! │                     │SessionGuard│    │ Recognizer │            │
//! │                     │ (browser)  │    │ Detector   │            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lobbyprobe::prelude::*;
//!
//! let clock = SystemClock::shared();
//! let mut guard = SessionGuard::new(Box::new(CdpFactory::new(DriverConfig::new())), clock.clone());
//! guard.start()?;
//! let locator = Locator::new(load_targets("targets.yaml")?, Arc::new(TesseractRecognizer::new()));
//! let it = Interactor::new(Box::new(guard), locator, clock);
//! let mut runner = MenuRunner::new(it, RunnerConfig::new(), load_actions("actions.yaml")?, load_tiles("tiles.yaml")?);
//! println!("{}", runner.run()?.summary());
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod browser;
pub mod canonical;
pub mod clock;
pub mod config;
pub mod coords;
pub mod driver;
pub mod geometry;
pub mod locator;
pub mod mock;
pub mod protocol;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod session;
pub mod vision;
pub mod wait;

pub use browser::CdpFactory;
#[cfg(feature = "browser")]
pub use browser::CdpAdapter;
pub use canonical::{canonical_operator, currency_variants, operator_variants, text_variants, CanonicalOperator};
pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{
    load_actions, load_targets, load_tiles, parse_actions, parse_targets, parse_tiles, Game, GameCatalog,
    OperatorCurrencyMatrix, Timings,
};
pub use coords::CoordinateMapper;
pub use driver::{BrowserAdapter, BrowserFactory, DriverConfig, SessionHealth};
pub use geometry::{PixelBox, ViewportPoint};
pub use locator::{Detection, DetectionSource, Locator, SearchContext, TargetKind, TargetQuery, TargetRegistry, TargetSpec};
pub use protocol::{
    in_lobby, open_tile, return_to_lobby, select, wait_for_lobby, wait_lobby_gone, ClickStage, DropdownField,
    Interactor, ReturnPath, Selection, TileOpen, TileScan,
};
pub use reporter::{CellReport, FailureMode, GameOutcome, MatrixReport, StepOutcome};
pub use result::{ProbeError, ProbeResult, StepFailure, StepResult};
pub use runner::{CurrencySelection, GameSelection, MenuRunner, RunnerConfig, SessionState};
pub use session::SessionGuard;
pub use vision::{CommandDetector, RecognizedWord, TesseractRecognizer, TextRecognizer, TileDetection, TileDetector};
pub use wait::{poll_until, PollOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::browser::*;
    pub use super::canonical::*;
    pub use super::clock::*;
    pub use super::config::*;
    pub use super::coords::*;
    pub use super::driver::*;
    pub use super::geometry::*;
    pub use super::locator::*;
    pub use super::protocol::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::session::*;
    pub use super::vision::{CommandDetector, RecognizedWord, TesseractRecognizer, TextRecognizer, TileDetection, TileDetector};
    pub use super::wait::*;
    pub use std::sync::Arc;
}
