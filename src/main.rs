//! Locus main entry point
//!
//! This is the command-line interface for the Locus multi-locale crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use locus::config::{
    load_config_or_default, validate, validate_fresh_destination, validate_locales,
    validate_seeds, Config, LogLevel,
};
use locus::crawler::{build_http_client, CrawlEngine, HttpFetcher};
use locus::output::{print_statistics, CrawlStatistics};
use locus::state::{CrawlOptions, CrawlState};
use locus::storage::{CheckpointStore, StorageError};
use locus::{DoneReason, LocusError};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Locus: a resumable multi-locale web crawler
///
/// Locus crawls the sites reachable from a list of seed URLs once per locale,
/// stores every distinct page it finds, and can resume an interrupted crawl
/// from the checkpoint left in its output directory.
#[derive(Parser, Debug)]
#[command(name = "locus")]
#[command(version = "1.0.0")]
#[command(about = "A resumable multi-locale web crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Comma-separated strings, one of which every followed URL must contain
    #[arg(long, global = true, value_delimiter = ',')]
    patterns: Vec<String>,

    /// Maximum number of pages to store, 0 for no limit
    #[arg(long, global = true)]
    max_pages: Option<u64>,

    /// Number of pages fetched at once
    #[arg(long, global = true)]
    simultaneous_pages: Option<usize>,

    /// One of: error, warning, info, debug
    #[arg(long, global = true)]
    loglevel: Option<String>,

    /// Also write the log to this file
    #[arg(long, global = true)]
    logfile: Option<PathBuf>,

    /// Path to an optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from seed URLs once per locale
    ///
    /// Targets are either `<urls> <dir>` or `file <url-file> <dir>`.
    Crawl {
        /// Comma-separated ISO 639-1 locale codes, crawled in order
        locales: String,

        #[arg(value_name = "TARGETS", num_args = 2..=3, required = true)]
        targets: Vec<String>,
    },

    /// Download a list of URLs without following links
    ///
    /// Targets are either `<urls> <dir>` or `file <url-file> <dir>`.
    Download {
        #[arg(value_name = "TARGETS", num_args = 2..=3, required = true)]
        targets: Vec<String>,
    },

    /// Resume the crawl checkpointed in a directory
    Resume {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Show statistics of the crawl checkpointed in a directory
    Status {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = effective_config(&cli)?;
    setup_logging(&config)?;

    match cli.command {
        Command::Crawl { locales, targets } => handle_crawl(&config, &locales, &targets).await,
        Command::Download { targets } => handle_download(&config, &targets).await,
        Command::Resume { dir } => handle_resume(&config, &dir, cli.max_pages).await,
        Command::Status { dir } => handle_status(&dir),
    }
}

/// Loads the configuration file, if any, and applies command-line overrides
fn effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config =
        load_config_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    if !cli.patterns.is_empty() {
        config.crawler.patterns = cli.patterns.iter().map(|p| p.trim().to_string()).collect();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(pages) = cli.simultaneous_pages {
        config.crawler.batch_size = pages;
    }
    if let Some(level) = &cli.loglevel {
        config.logging.level = level.clone();
    }
    if let Some(file) = &cli.logfile {
        config.logging.file = Some(file.clone());
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber
///
/// Logs go to stderr, and additionally to the configured log file without colors.
fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let level: LogLevel = config
        .logging
        .level
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let filter = EnvFilter::new(format!("locus={},warn", level.as_directive()));

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Splits `<urls> <dir>` or `file <url-file> <dir>` into seed URLs and a destination
fn parse_targets(targets: &[String]) -> anyhow::Result<(Vec<String>, PathBuf)> {
    let (seeds, dir) = match targets {
        [urls, dir] => {
            let seeds: Vec<String> = urls
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
            (seeds, dir)
        }
        [keyword, file, dir] if keyword == "file" => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("The URL file {} does not exist", file))?;
            let seeds: Vec<String> = content
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            (seeds, dir)
        }
        _ => bail!("Expected `<urls> <dir>` or `file <url-file> <dir>`"),
    };

    validate_seeds(&seeds).context("URLs must start with http:// or https://")?;

    let dir = PathBuf::from(dir);
    validate_fresh_destination(&dir).context("Cannot create output")?;

    Ok((seeds, dir))
}

/// Handles the `crawl` subcommand: starts a new multi-locale crawl
async fn handle_crawl(config: &Config, locales: &str, targets: &[String]) -> anyhow::Result<()> {
    let locales: Vec<String> = locales.split(',').map(|l| l.trim().to_string()).collect();
    validate_locales(&locales).context("All locales must be 2-letter ISO 639-1 codes")?;

    let (seeds, dir) = parse_targets(targets)?;

    let options = CrawlOptions {
        patterns: config.crawler.patterns.clone(),
        max_pages: config.crawler.max_pages,
        batch_size: config.crawler.batch_size,
        max_no_progress_rounds: config.crawler.max_no_progress_rounds,
    };

    tracing::info!(
        "Starting crawl of {} seed(s) in locale(s) {} into {}",
        seeds.len(),
        locales.join(","),
        dir.display()
    );
    let state = CrawlState::fresh(seeds, locales, dir, options)?;
    run_engine(config, state).await
}

/// Handles the `download` subcommand: fetches a URL list without following links
async fn handle_download(config: &Config, targets: &[String]) -> anyhow::Result<()> {
    let (seeds, dir) = parse_targets(targets)?;

    tracing::info!("Starting download of {} URL(s) into {}", seeds.len(), dir.display());
    let state = CrawlState::download(seeds, dir, config.crawler.max_pages)?;
    run_engine(config, state).await
}

/// Handles the `resume` subcommand: continues a checkpointed crawl
///
/// An explicit `--max-pages` replaces the checkpointed limit; other crawl flags are ignored.
async fn handle_resume(
    config: &Config,
    dir: &Path,
    max_pages: Option<u64>,
) -> anyhow::Result<()> {
    let state = load_checkpoint(dir, max_pages)?;
    tracing::info!(
        "Resuming {} crawl at locale {} with {} page(s) stored, locales left: {}",
        state.mode,
        state.current_locale,
        state.stored_count,
        state.remaining_locales().join(",")
    );
    run_engine(config, state).await
}

/// Handles the `status` subcommand: prints statistics of a checkpointed crawl
fn handle_status(dir: &Path) -> anyhow::Result<()> {
    let state = load_checkpoint(dir, None)?;
    print_statistics(&CrawlStatistics::from_state(&state));
    println!("Checkpoint: {}", CheckpointStore::in_dir(dir).path().display());
    Ok(())
}

fn load_checkpoint(dir: &Path, max_pages: Option<u64>) -> anyhow::Result<CrawlState> {
    match CrawlState::resume_with_limit(dir, max_pages) {
        Ok(state) => Ok(state),
        Err(StorageError::CheckpointNotFound(path)) => bail!(
            "Cannot recover crawl from {}: no checkpoint at {}",
            dir.display(),
            path.display()
        ),
        Err(e) => {
            Err(e).with_context(|| format!("Cannot recover crawl from {}", dir.display()))
        }
    }
}

/// Runs the engine over the HTTP fetcher until it reaches a terminal state
async fn run_engine(config: &Config, state: CrawlState) -> anyhow::Result<()> {
    let client = build_http_client().context("Failed to build HTTP client")?;
    let fetcher = Arc::new(HttpFetcher::new(
        client,
        config.crawler.accept_language_fallback,
    ));

    let span = tracing::info_span!("crawl", mode = %state.mode);
    let mut engine = CrawlEngine::new(state, fetcher, config.crawler.engine_settings())
        .with_shutdown(spawn_signal_handler())
        .with_span(span);

    let reason = match engine.run().await {
        Ok(reason) => reason,
        Err(LocusError::InvalidTransition { from, .. }) => {
            bail!("This crawl has already finished ({})", from)
        }
        Err(e) => return Err(e).context("Crawl failed"),
    };

    println!("\n=== Crawl finished: {} ===\n", reason);
    print_statistics(&CrawlStatistics::from_state(engine.state()));

    let destination = engine.state().destination.display();
    match reason {
        DoneReason::LimitReached => println!(
            "Raise the limit to continue: locus resume --max-pages <n> {}",
            destination
        ),
        DoneReason::Interrupted => println!("Resume with: locus resume {}", destination),
        DoneReason::Completed => {}
    }

    Ok(())
}

/// Spawns a task that flips the shutdown flag on SIGINT or SIGTERM
fn spawn_signal_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Signal received: stopping crawl");
        let _ = tx.send(true);
    });

    rx
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
