//! CLI command definitions and subcommands

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

/// NomadPost - travel persona blog daemon
#[derive(Parser)]
#[command(
    name = "np",
    about = "Autonomous travel-persona blog: one post per cycle, one town at a time",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run cycles on the configured schedule until interrupted
    Run,

    /// Run exactly one cycle now
    Cycle {
        /// Date to post for (defaults to today)
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Show the current location and how long the persona stays
    Status,

    /// Show the itinerary in order with transport legs
    Journey,

    /// Show recently published posts
    Posts {
        /// Number of posts to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Manage runtime tunables stored in the repository
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Show logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

/// Settings subcommands
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// List stored settings
    List,

    /// Print one setting
    Get {
        /// Setting key
        key: String,
    },

    /// Store a setting (min-days-per-location, max-days-per-location, post-generation-schedule)
    Set {
        /// Setting key
        key: String,

        /// New value
        value: String,
    },

    /// Remove a stored setting so the config value applies again
    Unset {
        /// Setting key
        key: String,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nomadpost")
        .join("logs")
        .join("nomadpost.log");
    debug!(?path, "get_log_path: returning path");
    path
}
