use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::logging::LogDestination;

/// scanwatch: submit masscan jobs to a scanning service and follow them.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scanwatch",
    version,
    about = "Submit scans to a masscan web service and follow them until they finish.",
    long_about = None
)]
pub struct Cli {
    /// RON configuration file. A missing file means built-in defaults.
    #[arg(long, default_value = "scanwatch.ron")]
    pub config: PathBuf,

    /// Base URL of the scanning service (overrides the config file).
    #[arg(long)]
    pub server: Option<String>,

    /// Delay between status polls while a scan is active.
    #[arg(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,

    /// Per-request timeout; 0 disables it.
    #[arg(long = "request-timeout-ms")]
    pub request_timeout_ms: Option<u64>,

    /// Log at debug level.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Where log output goes.
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start a scan and follow it until it completes or fails.
    Scan {
        /// IP range, e.g. 10.0.0.0/24.
        #[arg(long)]
        target: String,
        /// Port list, e.g. 80,443 or 1-1024.
        #[arg(long)]
        ports: String,
        /// Packets per second.
        #[arg(long)]
        rate: String,
    },
    /// Show one past scan, following it if it is still running.
    Inspect { scan_id: String },
    /// List recent scans.
    History,
}
