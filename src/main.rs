//! Shelf-Scout main entry point
//!
//! This is the command-line interface for the Shelf-Scout product crawler.

use anyhow::Context;
use clap::Parser;
use shelf_scout::config::{config_fingerprint, load_config, validate, Config};
use shelf_scout::output::{log_products, print_summary, write_report, JsonOutput};
use shelf_scout::{CrawlJob, CrawlerManager};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Crawled when no domains are given on the command line
const DEFAULT_DOMAINS: &[&str] = &["amazon.com", "flipkart.com", "snapdeal.com"];

/// Shelf-Scout: discovers product page URLs on e-commerce sites
///
/// Each domain is crawled breadth-first from its root up to a maximum link
/// depth. Pages whose URL looks like a product-detail page are collected and
/// written to a JSON document keyed by domain.
#[derive(Parser, Debug)]
#[command(name = "shelf-scout")]
#[command(version)]
#[command(about = "Discovers product page URLs on e-commerce sites", long_about = None)]
struct Cli {
    /// Domains to crawl, as bare domains or full start URLs
    #[arg(value_name = "DOMAIN")]
    domains: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the product URL document
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write a detailed per-domain report
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Override the maximum link depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the global bound on concurrent fetches
    #[arg(long)]
    concurrency: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let domains = if cli.domains.is_empty() {
        tracing::info!("No domains given, using the default list");
        DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect()
    } else {
        cli.domains.clone()
    };

    if cli.dry_run {
        handle_dry_run(&config, &domains)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(&cli, config, domains).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_scout=info,warn"),
            1 => EnvFilter::new("shelf_scout=debug,info"),
            2 => EnvFilter::new("shelf_scout=trace,debug"),
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

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_fetches = concurrency;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, domains: &[String]) -> anyhow::Result<()> {
    println!("=== Shelf-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Per-page timeout: {}ms", config.crawler.per_page_timeout_ms);
    println!(
        "  Per-domain timeout: {}ms",
        config.crawler.per_domain_timeout_ms
    );
    println!("  Fetch retries: {}", config.crawler.fetch_retries);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nProduct Matching:");
    for marker in &config.products.markers {
        println!("  marker:  {}", marker);
    }
    for pattern in &config.products.patterns {
        println!("  pattern: {}", pattern);
    }

    println!(
        "\nScope: {}",
        if config.scope.include_subdomains {
            "start host and its subdomains"
        } else {
            "start host only"
        }
    );

    println!("\nOutput:");
    println!("  Products: {}", config.output.json_path);
    if let Some(report_path) = &config.output.report_path {
        println!("  Report: {}", report_path);
    }

    println!("\nDomains ({}):", domains.len());
    for domain in domains {
        match CrawlJob::from_domain(domain, config.crawler.max_depth, &config.scope.default_scheme)
        {
            Ok(job) => println!("  - {} -> {}", domain, job.start_url()),
            Err(e) => println!("  - {} (invalid: {})", domain, e),
        }
    }

    let fingerprint = config_fingerprint(config)?;
    println!("\n✓ Configuration is valid (fingerprint {})", fingerprint);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config, domains: Vec<String>) -> anyhow::Result<ExitCode> {
    let json_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.json_path));
    let report_path = cli
        .report
        .clone()
        .or_else(|| config.output.report_path.as_ref().map(PathBuf::from));

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let manager = CrawlerManager::new(config)
        .context("failed to set up crawler")?
        .with_progress(sender);

    let mut output = JsonOutput::create(&json_path, &domains)
        .with_context(|| format!("failed to create {}", json_path.display()))?;

    let cancel = manager.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping all crawls");
            cancel.cancel();
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(result) = receiver.recv().await {
            if let Err(e) = output.record(&result) {
                tracing::error!(
                    "Failed to write partial results to {}: {}",
                    output.path().display(),
                    e
                );
            }
        }
        output
    });

    let report = manager.run(&domains).await.context("crawl failed")?;
    drop(manager);

    let output = writer.await.context("result writer stopped")?;
    output
        .finish(&report)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    tracing::info!("Product URLs written to {}", json_path.display());

    if let Some(report_path) = report_path {
        write_report(&report_path, &report)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        tracing::info!("Detailed report written to {}", report_path.display());
    }

    log_products(&report);
    print_summary(&report);

    if report.any_failed() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
