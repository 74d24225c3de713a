//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Courier - resilient message dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "courier",
    author,
    version,
    about = "Resilient message dispatcher with retry, failover and rate limiting",
    long_about = "Dispatches messages through an ordered list of delivery backends.\n\n\
                  Each message is delivered at most once per identity. Failed attempts \n\
                  are retried with exponential backoff, exhausted backends fail over \n\
                  to the next one, and sends beyond the rate window are queued."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "COURIER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "COURIER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send every message in a JSON file through the configured backends
    Send(SendArgs),

    /// Validate configuration file without sending
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "courier.toml", env = "COURIER_CONFIG")]
    pub config: PathBuf,

    /// JSON file holding an array of messages
    #[arg(short, long, env = "COURIER_MESSAGES")]
    pub messages: PathBuf,

    /// Override attempts per backend
    #[arg(long, env = "COURIER_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Override backoff base in milliseconds
    #[arg(long, env = "COURIER_BASE_DELAY_MS")]
    pub base_delay_ms: Option<u64>,

    /// Override rate window in milliseconds (0 = no rate limit)
    #[arg(long, env = "COURIER_RATE_WINDOW_MS")]
    pub rate_window_ms: Option<u64>,

    /// Abandon queued messages instead of draining them on exit
    #[arg(long)]
    pub no_drain: bool,

    /// Give up waiting for the queue to drain after this many seconds (0 = wait)
    #[arg(long, default_value = "0", env = "COURIER_TIMEOUT")]
    pub timeout: u64,

    /// Load configuration and messages, then exit without sending
    #[arg(long)]
    pub dry_run: bool,

    /// Print per-message results and summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "COURIER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show backend parameters
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
