//! catalog-crawler main entry point
//!
//! This is the command-line interface for the adaptive catalog crawler.

use catalog_crawler::config::{load_config_with_hash, Config, CrawlMode};
use catalog_crawler::crawler::{crawl, CrawlOptions};
use catalog_crawler::extract::{classify_and_extract, ExtractContext};
use catalog_crawler::output::{
    export_json, generate_markdown_summary, generate_summary, load_statistics, print_statistics,
};
use catalog_crawler::session::{FixtureSite, HttpPageSession, PageSession};
use catalog_crawler::storage::open_storage;
use catalog_crawler::PagePayload;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// catalog-crawler: an adaptive product catalog extractor
///
/// Walks the category menu of a catalog site, classifies every page by its
/// layout and extracts products into a hierarchical dataset. Interrupted runs
/// resume from their last checkpoint.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version = "1.0.0")]
#[command(about = "An adaptive product catalog extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Crawl top-level categories in parallel workers
    #[arg(long)]
    parallel: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary", "probe", "probe_file"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary", "probe", "probe_file"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "probe", "probe_file"])]
    export_summary: bool,

    /// Load one URL, classify it and print what would be extracted
    #[arg(long, value_name = "URL", conflicts_with = "probe_file")]
    probe: Option<String>,

    /// Classify a saved HTML file and print what would be extracted
    #[arg(long, value_name = "PATH", conflicts_with = "probe")]
    probe_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.parallel {
        config.crawler.mode = CrawlMode::Parallel;
    }
    if cli.resume {
        tracing::debug!("--resume given; continuing the latest interrupted run if there is one");
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else if let Some(url) = &cli.probe {
        handle_probe(&config, url).await?;
    } else if let Some(path) = &cli.probe_file {
        handle_probe_file(&config, path).await?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== catalog-crawler Dry Run ===\n");

    println!("Site:");
    println!("  Start URL: {}", config.site.start_url);
    println!("  Base origin: {}", config.site.base_origin);
    println!("  Catalog path: {}", config.site.catalog_path);

    let crawler = &config.crawler;
    println!("\nCrawler Configuration:");
    println!("  Mode: {:?}", crawler.mode);
    println!("  Pool size: {}", crawler.pool_size);
    println!("  Page load attempts: {}", crawler.page_load_attempts);
    println!("  Extraction attempts: {}", crawler.extract_attempts);
    println!("  Restart every: {} categories", crawler.restart_every);
    println!("  Checkpoint every: {} nodes", crawler.checkpoint_every);
    println!("  Min content length: {} bytes", crawler.min_content_length);
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Respect robots.txt: {}", crawler.respect_robots);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtraction:");
    println!("  Default headers: {}", config.extraction.default_headers.join(", "));
    println!(
        "  Block fallback headers: {}",
        config.extraction.block_fallback_headers.join(", ")
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  JSON: {}", config.output.json_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: writes markdown and JSON from the last checkpoint
fn handle_export_summary(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Exporting Crawl Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let store = open_storage(Path::new(&config.output.database_path))?;

    tracing::info!("Loading crawl data from database...");
    let summary = generate_summary(&store)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;
    export_json(&summary.categories, Path::new(&config.output.json_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);
    println!("✓ Dataset exported to: {}", config.output.json_path);

    Ok(())
}

/// Handles --probe: one live page through the classifier
async fn handle_probe(config: &Config, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = ExtractContext::from_config(config)?;
    let mut session = HttpPageSession::new(config.user_agent.clone(), config.crawler.respect_robots)?;
    session.navigate(url).await?;

    let (kind, payload) = classify_and_extract(&mut session, &ctx).await;
    print_probe(url, &session.title(), kind.as_str(), &payload)?;

    session.close().await?;
    Ok(())
}

/// Handles --probe-file: a saved page through the classifier
///
/// The file is served as if it lived at the configured start URL.
async fn handle_probe_file(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = ExtractContext::from_config(config)?;
    let source = std::fs::read_to_string(path)?;
    let url = config.site.start_url.as_str();

    let site = FixtureSite::new().with_page(url, &source);
    let mut session = site.session();
    session.navigate(url).await?;

    let (kind, payload) = classify_and_extract(&mut session, &ctx).await;
    print_probe(&path.display().to_string(), &session.title(), kind.as_str(), &payload)?;

    Ok(())
}

fn print_probe(
    source: &str,
    title: &str,
    kind: &str,
    payload: &PagePayload,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Probe: {} ===\n", source);
    println!("Title: {}", title);
    println!("Page kind: {}", kind);
    println!("Products: {}\n", payload.product_count());
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }
    tracing::info!(
        "Start URL: {}, mode: {:?}",
        config.site.start_url,
        config.crawler.mode
    );

    let json_path = PathBuf::from(&config.output.json_path);
    let summary_path = PathBuf::from(&config.output.summary_path);
    let database_path = PathBuf::from(&config.output.database_path);

    let outcome = match crawl(config, config_hash, CrawlOptions { fresh }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if !outcome.failed_categories.is_empty() {
        tracing::warn!(
            "Categories with errors: {}",
            outcome.failed_categories.join(", ")
        );
    }

    export_json(&outcome.categories, &json_path)?;
    tracing::info!("Dataset written to {}", json_path.display());

    let store = open_storage(&database_path)?;
    let summary = generate_summary(&store)?;
    generate_markdown_summary(&summary, &summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());

    let stats = outcome.collector.stats();
    tracing::info!(
        "Crawl completed successfully: {} products in {} categories",
        stats.total_products,
        stats.categories
    );
    Ok(())
}
