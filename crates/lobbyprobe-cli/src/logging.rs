//! Tracing subscriber setup
//!
//! Logs go to stderr so stdout carries only the summary. `RUST_LOG`
//! overrides the level chosen by `-q`/`-v`.

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` when set, else the verbosity default
#[must_use]
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber
pub fn init(config: &CliConfig) -> CliResult<()> {
    let filter = env_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(config.use_color()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(false))
            .try_init(),
    };
    result.map_err(|e| CliError::logging(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Verbosity;

    #[test]
    fn test_filter_follows_verbosity() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = CliConfig::new().with_verbosity(Verbosity::Verbose);
        assert_eq!(env_filter(&config).to_string(), "debug");
    }
}
