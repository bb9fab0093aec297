//! Lobbyprobe CLI library
//!
//! Command-line front end for the lobbyprobe engine: argument parsing,
//! configuration loading, logging setup and terminal output. The binary in
//! `main.rs` only dispatches.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
pub mod output;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, LogFormatArg, PlanArgs, RunArgs, VariantsArgs};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
