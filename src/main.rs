//! qa-harvest main entry point
//!
//! This is the command-line interface for the qa-harvest question crawler.

use anyhow::Context;
use clap::Parser;
use qa_harvest::checkpoint::CheckpointManager;
use qa_harvest::config::{load_config_with_hash, validate, Config, OutputFormat, ProxyConfig};
use qa_harvest::crawler::{crawl, CrawlStatus};
use qa_harvest::output::print_statistics;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// qa-harvest: a resumable question/answer crawler
///
/// qa-harvest walks a site made of theme pages that link to question pages, and
/// collects every question with its answer. An interrupted crawl (Ctrl-C) saves a
/// checkpoint and picks up where it left off on the next run.
#[derive(Parser, Debug)]
#[command(name = "qa-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable question/answer crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, visible_alias = "debug", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Number of concurrent workers
    #[arg(short = 't', long)]
    workers: Option<usize>,

    /// Completed pages between checkpoints
    #[arg(short = 'c', long)]
    checkpoint_interval: Option<usize>,

    /// Forward proxy for all requests (e.g. http://127.0.0.1:3128)
    #[arg(long)]
    proxy: Option<String>,

    /// Records output file
    #[arg(long)]
    output: Option<String>,

    /// Checkpoint file
    #[arg(long)]
    checkpoint_file: Option<String>,

    /// Records output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Page the crawl starts from
    #[arg(long)]
    start_url: Option<String>,

    /// Start a fresh crawl, discarding any checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_effective_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("qa_harvest=info,warn"),
            1 => EnvFilter::new("qa_harvest=debug,info"),
            _ => EnvFilter::new("qa_harvest=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any), applies command-line overrides and validates the result
fn load_effective_config(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(interval) = cli.checkpoint_interval {
        config.crawler.checkpoint_interval = interval;
    }
    if let Some(url) = &cli.proxy {
        config.proxy = Some(ProxyConfig { url: url.clone() });
    }
    if let Some(output) = &cli.output {
        config.output.records_path = output.clone();
    }
    if let Some(checkpoint) = &cli.checkpoint_file {
        config.output.checkpoint_path = checkpoint.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(start_url) = &cli.start_url {
        config.crawler.start_url = start_url.clone();
    }

    validate(&config).context("Invalid configuration")?;

    Ok((config, config_hash))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== qa-harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Checkpoint interval: {} pages",
        config.crawler.checkpoint_interval
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nProxy:");
    match &config.proxy {
        Some(proxy) => println!("  {}", proxy.url),
        None => println!("  (direct)"),
    }

    println!("\nOutput:");
    println!(
        "  Records: {} ({:?})",
        config.output.records_path, config.output.format
    );
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    let checkpoints = CheckpointManager::new(&config.output.checkpoint_path);
    println!("\n✓ Configuration is valid");
    if checkpoints.exists() {
        println!("✓ Would resume from {}", checkpoints.path().display());
    } else {
        println!("✓ Would start crawling from {}", config.crawler.start_url);
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    fresh: bool,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
        CheckpointManager::new(&config.output.checkpoint_path)
            .delete()
            .context("Failed to remove previous checkpoint")?;
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }

    tracing::info!(
        "Workers: {}, checkpoint every {} pages",
        config.crawler.workers,
        config.crawler.checkpoint_interval
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current round");
            signal.cancel();
        }
    });

    match crawl(&config, config_hash, shutdown).await {
        Ok(result) => {
            print_statistics(&result.stats, result.records);
            match result.status {
                CrawlStatus::Completed => tracing::info!(
                    "Crawl completed successfully: {} records in {}",
                    result.records,
                    config.output.records_path
                ),
                CrawlStatus::Interrupted => tracing::info!(
                    "Crawl interrupted with {} URLs pending; run again to resume",
                    result.pending
                ),
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
