//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Feature compiled out
    #[error("Feature disabled: {message}")]
    FeatureDisabled {
        /// Error message
        message: String,
    },

    /// Report export error
    #[error("Report export failed: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// Logging setup error
    #[error("Logging setup failed: {message}")]
    Logging {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lobbyprobe library error
    #[error("{0}")]
    Probe(#[from] lobbyprobe::ProbeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a feature disabled error
    #[must_use]
    pub fn feature_disabled(message: impl Into<String>) -> Self {
        Self::FeatureDisabled {
            message: message.into(),
        }
    }

    /// Create a report export error
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Create a logging setup error
    #[must_use]
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}
