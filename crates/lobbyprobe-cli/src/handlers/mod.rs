//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions
//! - Tests

pub mod config;
pub mod run;
pub mod variants;

// Re-export handlers for convenient access
pub use config::{execute_config, load_plan, Plan};
pub use run::{execute_run, runner_config};
pub use variants::{execute_variants, Variants};
