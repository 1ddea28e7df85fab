//! News Harvester main entry point
//!
//! This is the command-line interface for the News Harvester pipeline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use news_harvester::config::{load_config, load_config_with_hash, parse_daily_at, validate_source, Config};
use news_harvester::extract::ProfileRegistry;
use news_harvester::model::{SourceDescriptor, SourceEntry, SourceKind};
use news_harvester::output::{load_statistics, print_run_summary, print_sources, print_statistics};
use news_harvester::pipeline::{run_daily, Orchestrator};
use news_harvester::storage::{sink_from_config, SourceRegistry, SqliteStorage};
use news_harvester::summary::{CachedSummarizer, HttpSummarizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// News Harvester: a resilient content-acquisition pipeline
///
/// Collects items from API feeds, RSS feeds and scraped listing pages,
/// resolves each item's article text through a headless browser, and
/// stores the enriched records in a searchable database.
#[derive(Parser, Debug)]
#[command(name = "news-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resilient content-acquisition pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "harvester.toml", global = true)]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once over every source
    Run,

    /// Run the pipeline daily at `schedule.daily-at` until interrupted
    Schedule,

    /// Register a new source in the database
    AddSource {
        /// Unique source name
        name: String,

        /// Source type: api, rss or scrape
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        /// Listing, feed or API URL
        #[arg(long)]
        url: String,

        /// Type-specific config as JSON, e.g. '{"strategy":"hacker_news"}'
        #[arg(long, value_name = "JSON")]
        source_config: Option<String>,
    },

    /// List registered sources
    Sources,

    /// Show item and run statistics from the database
    Stats,

    /// Summarize a stored item (cached)
    Summarize {
        /// Source the item belongs to
        source: String,

        /// Item URL
        url: String,
    },

    /// Validate the configuration and show what would run
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run => handle_run(&cli.config).await,
        Command::Schedule => handle_schedule(&cli.config).await,
        Command::AddSource {
            name,
            kind,
            url,
            source_config,
        } => handle_add_source(&cli.config, name, &kind, url, source_config.as_deref()),
        Command::Sources => handle_sources(&cli.config).await,
        Command::Stats => handle_stats(&cli.config),
        Command::Summarize { source, url } => handle_summarize(&cli.config, &source, &url).await,
        Command::CheckConfig => handle_check_config(&cli.config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_harvester=info,warn"),
            1 => EnvFilter::new("news_harvester=debug,info"),
            2 => EnvFilter::new("news_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    load_config(path).with_context(|| format!("Failed to load configuration {}", path.display()))
}

fn open_database(config: &Config) -> anyhow::Result<Arc<SqliteStorage>> {
    let path = Path::new(&config.output.database_path);
    let storage = SqliteStorage::new(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(storage))
}

/// Loads the config, syncs its sources and wires up the orchestrator
fn build_orchestrator(path: &Path) -> anyhow::Result<(Config, Orchestrator)> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, config_hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let storage = open_database(&config)?;
    if !config.sources.is_empty() {
        let synced = storage
            .sync_sources(&config.sources)
            .context("Failed to sync configured sources")?;
        tracing::info!("Synced {} configured sources into the registry", synced);
    }

    let sink = sink_from_config(&config, Arc::clone(&storage))?;
    let orchestrator = Orchestrator::from_config(&config, storage.clone(), sink)?
        .with_run_log(storage, config_hash);
    Ok((config, orchestrator))
}

/// Handles `run`: one pass over every source
async fn handle_run(path: &Path) -> anyhow::Result<()> {
    let (_, orchestrator) = build_orchestrator(path)?;

    match orchestrator.run_all().await {
        Ok(summary) => {
            println!("=== Run Complete ===\n");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles `schedule`: daily runs until Ctrl-C
async fn handle_schedule(path: &Path) -> anyhow::Result<()> {
    let (config, orchestrator) = build_orchestrator(path)?;
    let at = parse_daily_at(&config.schedule.daily_at)?;

    tracing::info!("Scheduling daily runs at {}", config.schedule.daily_at);
    run_daily(&orchestrator, at).await;
    Ok(())
}

/// Handles `add-source`: validates and registers one source
fn handle_add_source(
    path: &Path,
    name: String,
    kind: &str,
    url: String,
    source_config: Option<&str>,
) -> anyhow::Result<()> {
    let config = read_config(path)?;

    let Some(kind) = SourceKind::parse(kind) else {
        bail!("Unknown source type '{}' (expected api, rss or scrape)", kind);
    };
    let raw = match source_config {
        Some(json) => serde_json::from_str(json).context("Source config is not valid JSON")?,
        None => serde_json::Value::Null,
    };

    let source = SourceDescriptor::try_from(SourceEntry {
        name,
        kind,
        url,
        config: raw,
    })?;
    let profiles = ProfileRegistry::with_custom(&config.profiles)?;
    validate_source(&source, &profiles)?;

    let storage = open_database(&config)?;
    storage.add_source(&source)?;

    println!("✓ Added {} source '{}' ({})", source.kind(), source.name, source.url);
    Ok(())
}

/// Handles `sources`: lists the registry
async fn handle_sources(path: &Path) -> anyhow::Result<()> {
    let config = read_config(path)?;
    let storage = open_database(&config)?;

    let sources = storage.list_sources().await?;
    print_sources(&sources);

    let unsynced = config
        .sources
        .iter()
        .filter(|s| !sources.iter().any(|r| r.name == s.name))
        .count();
    if unsynced > 0 {
        println!("\n{} configured sources will be registered on the next run", unsynced);
    }
    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(path: &Path) -> anyhow::Result<()> {
    let config = read_config(path)?;

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = open_database(&config)?;

    // Load statistics
    let stats = load_statistics(&storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles `summarize`: cached summary of one stored item
async fn handle_summarize(path: &Path, source: &str, url: &str) -> anyhow::Result<()> {
    let config = read_config(path)?;
    let Some(summarizer_config) = &config.summarizer else {
        bail!("No [summarizer] section in {}", path.display());
    };

    let storage = open_database(&config)?;
    let Some(item) = storage.get_item(source, url)? else {
        bail!("No stored item {} in source '{}'", url, source);
    };
    if item.content.trim().is_empty() {
        bail!("Item {} has no content to summarize", url);
    }

    let model = HttpSummarizer::from_config(summarizer_config)?;
    let ttl = Duration::from_secs(summarizer_config.cache_ttl_hours * 60 * 60);
    let summarizer = CachedSummarizer::new(Arc::new(model), storage, ttl);

    let summary = summarizer.summarize(&item.content, &item.id).await?;
    println!("{}\n\n{}", item.title, summary);
    Ok(())
}

/// Handles `check-config`: validates config and shows what would run
fn handle_check_config(path: &Path) -> anyhow::Result<()> {
    let config = read_config(path)?;

    println!("=== News Harvester Config Check ===\n");

    println!("Pipeline:");
    println!("  Batch size: {}", config.pipeline.batch_size);
    println!("  Inter-batch delay: {}ms", config.pipeline.inter_batch_delay_ms);
    println!("  API item delay: {}ms", config.pipeline.item_delay_ms);
    println!("  API top-N: {}", config.pipeline.api_top_n);

    println!("\nBrowser:");
    println!("  Backend: {:?}", config.browser.backend);
    println!("  Max attempts: {}", config.browser.max_attempts);
    println!("  Navigation timeout: {}ms", config.browser.navigation_timeout_ms);
    println!("  Blocked resources: {:?}", config.browser.blocked_resources);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Daily run at: {}", config.schedule.daily_at);
    if let Some(index) = &config.index {
        println!("  Index: {} (key from ${})", index.endpoint, index.api_key_env);
    }
    if let Some(summarizer) = &config.summarizer {
        println!("  Summarizer: {} model {}", summarizer.endpoint, summarizer.model);
    }

    let profiles = ProfileRegistry::with_custom(&config.profiles)?;
    println!("\nExtraction Profiles: {}", profiles.names().join(", "));

    println!();
    print_sources(&config.sources);

    println!("\n✓ Configuration is valid");
    Ok(())
}
