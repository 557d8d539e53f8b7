//! Sheaf CLI — combines site scripts and stylesheets into cached bundles.
//!
//! Provides `sheaf combine` to register requirements and rebuild any stale
//! bundle, and `sheaf status` to report bundle freshness without writing.

#![warn(missing_docs)]

mod combine;
mod pipeline;
mod status;

use std::io::IsTerminal;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "SHEAF_LOG";

/// Sheaf — content-hashed asset bundling.
#[derive(Parser, Debug)]
#[command(name = "sheaf", version, about = "Sheaf asset combiner")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `sheaf.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine the given requirements, rebuilding stale bundles.
    Combine(CombineArgs),
    /// Report which bundles are fresh or stale without writing anything.
    Status(StatusArgs),
}

/// Requirements and mode flags shared by every command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Script paths, in request order.
    #[arg(long = "script", value_name = "PATH")]
    pub scripts: Vec<String>,

    /// Stylesheet paths with an optional media type (e.g. `css/print.css:print`).
    #[arg(long = "style", value_name = "PATH[:MEDIA]")]
    pub styles: Vec<String>,

    /// Run as a development site (files are served individually).
    #[arg(long)]
    pub dev: bool,

    /// Combine even in development mode.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `sheaf combine` subcommand.
#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Requested scripts and styles.
    #[command(flatten)]
    pub request: RequestArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `sheaf status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Requested scripts and styles.
    #[command(flatten)]
    pub request: RequestArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    init_tracing(&global);

    let result = match cli.command {
        Command::Combine(ref args) => combine::run(args, &global),
        Command::Status(ref args) => status::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs a stderr `tracing` subscriber.
///
/// `SHEAF_LOG` wins when set; otherwise `--verbose` and `--quiet` pick the level.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}
