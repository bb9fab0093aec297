//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use lobbyprobe::runner::{DEFAULT_ENTRY_URL, DEFAULT_OPERATOR};
use std::path::PathBuf;

/// Lobbyprobe: operator/currency/game matrix runs against a canvas game lobby
#[derive(Parser, Debug)]
#[command(name = "lobbyprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the operator/currency matrix against a lobby
    Run(RunArgs),

    /// Validate configuration files and print the matrix and catalog
    Config(ConfigArgs),

    /// Print the renderings the locator tries for a piece of text
    Variants(VariantsArgs),
}

/// Configuration file locations shared by `run` and `config`
#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    /// Target definitions
    #[arg(long, default_value = "plans/targets.yaml")]
    pub targets: PathBuf,

    /// Menu actions with the operator/currency constraints
    #[arg(long, default_value = "plans/actions.yaml")]
    pub actions: PathBuf,

    /// Game id to display name mapping
    #[arg(long, default_value = "plans/tiles.yaml")]
    pub tiles: PathBuf,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Lobby URL
    #[arg(long, default_value = DEFAULT_ENTRY_URL)]
    pub url: String,

    /// Operators to run, in order (repeatable)
    #[arg(long = "operator", value_name = "OP", default_values_t = [DEFAULT_OPERATOR.to_string()])]
    pub operators: Vec<String>,

    /// `All` or a comma-separated currency list
    #[arg(long, default_value = "All")]
    pub currencies: String,

    /// `all` or comma-separated game ids or names
    #[arg(long, default_value = "")]
    pub games: String,

    /// Configuration files
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Tile detector command; reads a PNG on stdin, prints JSON detections
    #[arg(long, value_name = "CMD")]
    pub detector: Option<String>,

    /// Tesseract executable; `TESSERACT_EXE` is read when neither this nor `TESSERACT_CMD` is set
    #[arg(long, value_name = "PATH", env = "TESSERACT_CMD")]
    pub tesseract: Option<PathBuf>,

    /// Chromium executable
    #[arg(long, value_name = "PATH")]
    pub chrome: Option<PathBuf>,

    /// Seconds spent inside each opened game
    #[arg(long, default_value = "15")]
    pub dwell: u64,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Stop the run at the first dropdown failure
    #[arg(long)]
    pub stop_on_fail: bool,

    /// Player id recorded with the session
    #[arg(long)]
    pub player_id: Option<String>,

    /// Write the JSON report here
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration files
    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Arguments for the variants command
#[derive(Parser, Debug)]
pub struct VariantsArgs {
    /// Operator name, label or currency code
    pub text: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::{ColorChoice, LogFormat};

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = Cli::try_parse_from(["lobbyprobe", "run"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.url, DEFAULT_ENTRY_URL);
            assert_eq!(args.operators, vec!["WowVegas"]);
            assert_eq!(args.currencies, "All");
            assert!(args.games.is_empty());
            assert_eq!(args.dwell, 15);
            assert!(!args.headless);
            assert_eq!(args.plan.tiles, PathBuf::from("plans/tiles.yaml"));
        }

        #[test]
        fn test_run_repeated_operators() {
            let cli = Cli::try_parse_from([
                "lobbyprobe",
                "run",
                "--operator",
                "WowVegas",
                "--operator",
                ".COM",
                "--games",
                "edg201,Gold Rush",
                "--stop-on-fail",
                "--report",
                "out.json",
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.operators, vec!["WowVegas", ".COM"]);
            assert_eq!(args.games, "edg201,Gold Rush");
            assert!(args.stop_on_fail);
            assert_eq!(args.report, Some(PathBuf::from("out.json")));
        }

        #[test]
        fn test_global_flags() {
            let cli =
                Cli::try_parse_from(["lobbyprobe", "-vv", "--log-format", "json", "variants", "WowVegas"]).unwrap();
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.log_format, LogFormatArg::Json));
            assert!(matches!(cli.command, Commands::Variants(_)));
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["lobbyprobe"]).is_err());
        }
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
    }
}
