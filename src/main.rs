//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest product crawler.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, validate, Config};
use catalog_harvest::crawler::{Coordinator, CrawlEvent};
use catalog_harvest::output::{print_report, ResultStore};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a paced product catalog crawler
///
/// Catalog-Harvest reads the category sidebar of a shop, walks every
/// category listing page by page, visits each product for its image and
/// short description, and writes one JSON file per category plus a combined
/// all_products.json.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paced product catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Directory for result files (overrides [output] directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            Config::default()
        }
    };

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
        validate(&config).context("Invalid output directory")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Root URL: {}", config.site.root_url);

    println!("\nCrawler Configuration:");
    println!("  Page delay: {}ms", config.crawler.page_delay);
    println!(
        "  Max pages per category: {}",
        config.crawler.max_pages_per_category
    );
    println!("  Enrich concurrency: {}", config.crawler.enrich_concurrency);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request interval: {}ms", config.crawler.request_interval);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout, config.crawler.connect_timeout
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    println!("\nSelectors:");
    println!("  Category widget: {}", config.selectors.category_widget);
    println!("  Category item: {}", config.selectors.category_item);
    println!("  Product block: {}", config.selectors.product_block);
    println!("  Product link: {}", config.selectors.product_link);
    println!("  Next page: {}", config.selectors.next_page);
    println!("  Gallery image: {}", config.selectors.gallery_image);
    println!("  Fallback image: {}", config.selectors.fallback_image);
    println!(
        "  Short description: {}",
        config.selectors.short_description
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    let store = ResultStore::new(&config.output.directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.directory
        )
    })?;

    let cancel = CancellationToken::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let mut coordinator = Coordinator::new(config)?
        .with_store(store)
        .with_events(events_tx)
        .with_cancellation(cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing the current product");
                cancel.cancel();
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if !quiet {
                print_event(&event);
            }
        }
    });

    let outcome = coordinator.run().await;
    // The coordinator owns the sender; dropping it ends the printer
    drop(coordinator);
    let _ = printer.await;

    let outcome = outcome.context("Crawl failed")?;
    if !quiet {
        println!();
        print_report(&outcome.report, outcome.result.total_products);
    }

    Ok(())
}

/// Prints one progress line per event
fn print_event(event: &CrawlEvent) {
    match event {
        CrawlEvent::DiscoveryFinished { category_count } => {
            println!("Found {} categories", category_count);
        }
        CrawlEvent::CategoryStarted {
            category_index,
            category_count,
            category_name,
        } => {
            println!(
                "[{}/{}] Crawling {}...",
                category_index, category_count, category_name
            );
        }
        CrawlEvent::PageSkipped { url, reason, .. } => {
            println!("    skipped page {}: {}", url, reason);
        }
        CrawlEvent::CategoryFinished {
            products_in_category,
            products_so_far,
            saved_to,
            ..
        } => {
            match saved_to {
                Some(path) => println!(
                    "    {} products, saved to {} ({} so far)",
                    products_in_category,
                    path.display(),
                    products_so_far
                ),
                None => println!(
                    "    {} products ({} so far)",
                    products_in_category, products_so_far
                ),
            }
        }
        CrawlEvent::Finished { total_products } => {
            println!("Done: {} products", total_products);
        }
    }
}
