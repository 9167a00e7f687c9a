//! Catalog-Walk main entry point
//!
//! This is the command-line interface for the Catalog-Walk crawler.

use catalog_walk::config::{load_config_with_hash, validate, BridgeOrder, Config};
use catalog_walk::crawler::crawl_until;
use catalog_walk::output::{LineSink, NdjsonSink, Sink};
use catalog_walk::Location;
use clap::{Parser, ValueEnum};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Walk: crawl a linked JSON catalog
///
/// Starting from a root document (an HTTP(S) URL or a local path), follows
/// every `child` and `item` link and writes each document it reaches to
/// stdout.
#[derive(Parser, Debug)]
#[command(name = "catalog-walk")]
#[command(version)]
#[command(about = "Crawl a linked JSON catalog", long_about = None)]
struct Cli {
    /// Root catalog URL or path
    #[arg(value_name = "ROOT")]
    root: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format written to stdout
    #[arg(short, long, value_enum, default_value_t = Format::Lines)]
    format: Format,

    /// Maximum number of concurrent fetches
    #[arg(long)]
    concurrency: Option<u32>,

    /// Minimum time between fetch dispatches, in milliseconds
    #[arg(long, value_name = "MS")]
    min_interval_ms: Option<u64>,

    /// Do not follow links deeper than this below the root
    #[arg(long)]
    max_depth: Option<u32>,

    /// Buffered documents before the crawl waits for the output
    #[arg(long)]
    high_water_mark: Option<usize>,

    /// Deliver the most recently fetched document first
    #[arg(long)]
    lifo: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// First link target of each document
    Lines,
    /// Each document as one JSON line
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let root = Location::parse(&cli.root);
    tracing::info!(
        "Crawling {} (concurrency {}, min interval {}ms)",
        root,
        config.crawler.max_concurrent_fetches,
        config.crawler.min_dispatch_interval_ms
    );

    let stdout = BufWriter::new(std::io::stdout().lock());
    let mut sink: Box<dyn Sink> = match cli.format {
        Format::Lines => Box::new(LineSink::new(stdout)),
        Format::Ndjson => Box::new(NdjsonSink::new(stdout)),
    };

    // Ctrl-C stops the crawl; documents already fetched are still written
    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::warn!("Interrupted, stopping crawl"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    let summary = match crawl_until(&config, root, sink.as_mut(), interrupted).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Crawl completed: {} documents, {} failed branches, {} links beyond max depth{}",
        summary.documents,
        summary.failures,
        summary.depth_limited,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    Ok(())
}

/// Builds the effective configuration: file (if any), then CLI overrides
fn load(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_fetches = concurrency;
    }
    if let Some(interval) = cli.min_interval_ms {
        config.crawler.min_dispatch_interval_ms = interval;
    }
    if cli.max_depth.is_some() {
        config.crawler.max_depth = cli.max_depth;
    }
    if let Some(mark) = cli.high_water_mark {
        config.bridge.high_water_mark = mark;
    }
    if cli.lifo {
        config.bridge.order = BridgeOrder::Lifo;
    }

    validate(&config)?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only crawl output.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_walk=info,warn"),
            1 => EnvFilter::new("catalog_walk=debug,info"),
            2 => EnvFilter::new("catalog_walk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
