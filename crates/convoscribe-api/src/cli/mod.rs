//! CLI command definitions for the `cscribe` binary.

pub mod inspect;
pub mod replay;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Reconstruct voice-agent conversations from pipeline logs.
#[derive(Parser)]
#[command(name = "cscribe", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Only log errors. Command output (tables, JSON) is still printed.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Engine configuration file.
    #[arg(long, global = true, env = "CONVOSCRIBE_CONFIG", default_value = "convoscribe.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a log file through the engine and print every session's turns.
    Replay {
        /// Timestamped log file (JSON lines or timestamp-prefixed text).
        file: PathBuf,

        /// Only print this session.
        #[arg(long)]
        session: Option<String>,
    },

    /// Show what the engine extracts from a single raw line.
    Inspect {
        /// The raw log line.
        line: String,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Shorten `text` to at most `max` characters for table cells.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
