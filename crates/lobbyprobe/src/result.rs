//! Result and error types for lobbyprobe.
//!
//! Two layers live here. [`ProbeError`] is the error type of every fallible
//! call into a collaborator (browser, recognizer, detector, configuration).
//! [`StepFailure`] is the outcome of a protocol step that did not reach its
//! post-condition; it is recorded in the matrix report rather than raised.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for lobbyprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in lobbyprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The browser session died underneath the call
    #[error("Browser session invalid: {message}")]
    SessionInvalid {
        /// Error message
        message: String,
    },

    /// The session died and could not be re-created
    #[error("Browser session lost: {message}")]
    SessionLost {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Any other browser adapter failure
    #[error("Browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Text recognizer failure
    #[error("Text recognition failed: {message}")]
    Recognizer {
        /// Error message
        message: String,
    },

    /// Tile detector failure
    #[error("Tile detection failed: {message}")]
    Detector {
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Image decoding or processing error
    #[error("Image processing failed: {message}")]
    Image {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a session-invalid error
    #[must_use]
    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self::SessionInvalid {
            message: message.into(),
        }
    }

    /// Create a browser error
    #[must_use]
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error signals that the underlying session is gone
    #[must_use]
    pub const fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }
}

impl From<image::ImageError> for ProbeError {
    fn from(err: image::ImageError) -> Self {
        Self::Image {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// STEP FAILURES
// =============================================================================

/// Why a protocol step did not reach its post-condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    /// Every synonym and fallback region was tried without a qualifying match
    #[error("{target} not found")]
    NotFound {
        /// What was being looked for
        target: String,
    },

    /// The action was dispatched but the expected state never appeared
    #[error("verification timed out after {attempts} attempt(s)")]
    VerificationTimeout {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The browser session died and recovery failed
    #[error("browser session lost")]
    SessionLost,

    /// A scroll command did not move the viewport
    #[error("scroll stuck at offset {offset_y}")]
    ScrollStuck {
        /// Vertical offset that did not change
        offset_y: i32,
    },

    /// The scan reached the bottom of the document too many times
    #[error("scan exhausted after {bottom_passes} bottom pass(es)")]
    ScanExhausted {
        /// Bottom passes counted
        bottom_passes: u32,
    },

    /// The adapter failed for a reason other than session loss
    #[error("browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },
}

impl StepFailure {
    /// Create a not-found failure
    #[must_use]
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }
}

impl From<ProbeError> for StepFailure {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::SessionInvalid { .. } | ProbeError::SessionLost { .. } => Self::SessionLost,
            other => Self::Browser {
                message: other.to_string(),
            },
        }
    }
}

/// Outcome of a protocol step
pub type StepResult<T> = Result<T, StepFailure>;
