//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use crate::client::{DEFAULT_FEED_URL, DEFAULT_LIMIT};
use crate::geo::GeoPoint;
use crate::output::Format;

/// Earthquake feed watcher with terminal and web dashboards.
#[derive(Parser, Debug)]
#[command(name = "quakepulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show recent earthquakes (one-shot fetch and exit)
    Tail(TailArgs),

    /// Watch the feed and notify on new earthquakes
    Watch(WatchArgs),

    /// Start the web dashboard server
    Ui(UiArgs),
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    /// Feed URL to fetch
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Number of records to request per fetch
    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Your position as lat,lon for the distance column and nearest quake
    #[arg(long, value_parser = parse_point)]
    pub at: Option<GeoPoint>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Feed URL to poll
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Number of records to request per poll
    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Poll interval in seconds (minimum 30)
    #[arg(long, default_value = "30")]
    pub poll_interval: u64,

    /// Your position as lat,lon for the distance column and nearest quake
    #[arg(long, value_parser = parse_point)]
    pub at: Option<GeoPoint>,

    /// Enable new-quake notifications
    #[arg(long)]
    pub notify: bool,

    /// Webhook URL to POST notifications to (implies --notify)
    #[arg(long)]
    pub webhook: Option<String>,

    /// Minimum seconds between notifications (0 = no cooldown)
    #[arg(long, default_value = "0")]
    pub cooldown: i64,

    /// Output format for event lines
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Feed URL to poll
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Number of records to request per poll
    #[arg(long, short = 'n', default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Poll interval in seconds (minimum 30)
    #[arg(long, default_value = "30")]
    pub poll_interval: u64,

    /// Your position as lat,lon for distance display on the dashboard
    #[arg(long, value_parser = parse_point)]
    pub at: Option<GeoPoint>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a lat,lon position from string.
fn parse_point(s: &str) -> Result<GeoPoint, String> {
    s.parse()
}
