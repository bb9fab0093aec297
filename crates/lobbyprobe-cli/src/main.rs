//! Lobbyprobe CLI: matrix runs against a canvas game lobby
//!
//! ## Usage
//!
//! ```bash
//! lobbyprobe run --operator WowVegas --games all   # Run the matrix
//! lobbyprobe config                                 # Validate plans/
//! lobbyprobe variants ".COM"                        # Show text renderings
//! ```

use clap::Parser;
use lobbyprobe_cli::{
    handlers::{execute_config, execute_run, execute_variants},
    logging, Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config)?;

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::Config(args) => {
            execute_config(&config, &args)?;
            Ok(true)
        }
        Commands::Variants(args) => {
            execute_variants(&config, &args)?;
            Ok(true)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use lobbyprobe_cli::{ColorChoice, LogFormat};

    #[test]
    fn test_build_config() {
        let cli = Cli::try_parse_from(["lobbyprobe", "-q", "--color", "never", "variants", "SC"]).unwrap();
        let config = build_config(&cli);
        assert_eq!(config.verbosity, Verbosity::Quiet);
        assert_eq!(config.color, ColorChoice::Never);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
