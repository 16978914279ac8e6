use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "lilos",
    version,
    about = "Governance validation for rule documents and decision logs"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level (overridden by LILOS_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract rules and run uniqueness checks only
    Lint(RunArgs),
    /// Run the full detector battery
    Check(RunArgs),
}

impl Command {
    pub fn run_args(&self) -> &RunArgs {
        match self {
            Command::Lint(a) | Command::Check(a) => a,
        }
    }
}

#[derive(Debug, ClapArgs)]
pub struct RunArgs {
    /// Repository root holding the governance documents
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to <root>/lilos.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Evaluation date for time windows (YYYY-MM-DD, defaults to the local date)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Detector wall-clock budget in milliseconds (overrides the config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Disable colored text output
    #[arg(long)]
    pub no_color: bool,

    /// Optional git commit hash for tool metadata
    #[arg(long)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
