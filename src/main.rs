//! QuakePulse - earthquake feed watcher.
//!
//! A terminal-first client for a public earthquake feed: one-shot listing,
//! a polling watcher that notifies on new events, and a local web
//! dashboard with a live map.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod detect;
mod errors;
mod geo;
mod models;
mod normalize;
mod notify;
mod output;
mod server;

use cli::{Cli, Command};
use client::FeedClient;
use detect::{PollState, Transition};
use notify::{Notifier, NotifyConfig};

/// Polls faster than this hammer the upstream for no benefit.
const MIN_POLL_INTERVAL_SECS: u64 = 30;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Tail(args) => cmd_tail(args),
        Command::Watch(args) => cmd_watch(args),
        Command::Ui(args) => cmd_ui(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `tail` command - one-shot fetch of recent earthquakes.
///
/// This is also the manual-trigger analogue of the dashboard's refresh
/// button: same fetch, same normalization, no detector state.
fn cmd_tail(args: cli::TailArgs) -> Result<()> {
    let client =
        FeedClient::new(&args.feed_url, args.limit).context("failed to create feed client")?;

    let records = client.fetch().context("failed to fetch earthquake feed")?;
    let quakes = normalize::normalize_all(&records, Utc::now());

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &quakes, args.format, args.at)?;

    if let Some(position) = args.at {
        if args.format == output::Format::Human {
            output::write_nearest(&mut handle, position, &quakes)?;
        }
    }

    Ok(())
}

/// Execute the `watch` command - poll the feed and report transitions.
fn cmd_watch(args: cli::WatchArgs) -> Result<()> {
    // Validate poll interval
    let poll_interval = args.poll_interval.max(MIN_POLL_INTERVAL_SECS);
    if poll_interval != args.poll_interval {
        tracing::warn!("poll interval clamped to minimum of {MIN_POLL_INTERVAL_SECS} seconds");
    }

    let client =
        FeedClient::new(&args.feed_url, args.limit).context("failed to create feed client")?;

    let mut state = PollState::new();
    let mut notifier = Notifier::new(NotifyConfig {
        enabled: args.notify || args.webhook.is_some(),
        webhook: args.webhook.clone(),
        cooldown_secs: args.cooldown,
    });

    tracing::info!(
        "watching {} (poll every {}s, limit {})",
        args.feed_url,
        poll_interval,
        args.limit
    );

    loop {
        let now = Utc::now();
        match client.fetch() {
            Ok(records) => {
                let quakes = normalize::normalize_all(&records, now);
                let transition = state.check(&quakes, now);

                let stdout = io::stdout();
                let mut handle = stdout.lock();

                if state.polls() == 1 {
                    // Startup: show the current feed once, then only changes.
                    output::write_events(&mut handle, &quakes, args.format, args.at)?;
                    if let Some(position) = args.at {
                        if args.format == output::Format::Human {
                            output::write_nearest(&mut handle, position, &quakes)?;
                        }
                    }
                } else if let Transition::NewQuake(quake) = &transition {
                    output::write_events(
                        &mut handle,
                        std::slice::from_ref(quake),
                        args.format,
                        args.at,
                    )?;
                    notifier.notify(quake, now);
                }
                let _ = handle.flush();

                tracing::debug!(
                    "poll #{}: {} events, new quake: {}",
                    state.polls(),
                    quakes.len(),
                    transition.is_new()
                );
            }
            Err(e) => {
                // Prior state stays untouched; the next tick retries.
                tracing::warn!("update failed, will retry: {e}");
            }
        }

        std::thread::sleep(std::time::Duration::from_secs(poll_interval));
    }
}

/// Execute the `ui` command - start the dashboard server.
fn cmd_ui(args: cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        feed_url: args.feed_url.clone(),
        limit: args.limit,
        poll_interval: args.poll_interval.max(MIN_POLL_INTERVAL_SECS),
        position: args.at,
    };

    let url = format!("http://{}:{}", args.host, args.port);
    println!("QuakePulse dashboard");
    println!("  Local: {url}");
    println!("  Feed:  {}", args.feed_url);
    println!("  Poll:  {}s", config.poll_interval);
    println!("Press Ctrl+C to stop\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd")
            .args(["/c", "start", &url])
            .spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
