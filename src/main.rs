//! Product-Trawl main entry point
//!
//! This is the command-line interface for the Product-Trawl crawler.

use anyhow::{bail, Context};
use clap::Parser;
use product_trawl::config::{load_config_with_hash, Config, RendererKind};
use product_trawl::crawler::run_all;
use product_trawl::output::{print_statistics, write_results, RunStatistics};
use product_trawl::renderer::{HttpRendererFactory, DEFAULT_USER_AGENT};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Product-Trawl: a product-page discovery crawler
///
/// Product-Trawl walks e-commerce domains breadth-first, scrolling through
/// lazy-loaded listings and pressing "load more" buttons, and collects every
/// URL that looks like a product page.
#[derive(Parser, Debug)]
#[command(name = "product-trawl")]
#[command(version)]
#[command(about = "A product-page discovery crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the renderer kind from the configuration
    #[arg(long, value_enum)]
    renderer: Option<RendererKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(kind) = cli.renderer {
        config.renderer.kind = kind;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("product_trawl=info,warn"),
            1 => EnvFilter::new("product_trawl=debug,info"),
            2 => EnvFilter::new("product_trawl=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let settings = config.crawl_settings()?;

    println!("=== Product-Trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency limit: {}", settings.concurrency_limit);
    println!("  Max reveal attempts: {}", settings.max_reveal_attempts);
    println!("  Reveal settle delay: {:?}", settings.reveal_settle_delay);
    println!("  Click settle delay: {:?}", settings.click_settle_delay);
    println!("  Navigation timeout: {:?}", settings.navigation_timeout);
    println!("  Product patterns: {}", settings.classifier.patterns().len());

    println!("\nRenderer:");
    println!("  Kind: {}", config.renderer.kind);
    println!("  Headless: {}", config.renderer.headless);
    println!(
        "  User agent: {}",
        config.renderer.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    );

    println!("\nOutput:");
    println!("  Products: {}", config.output.product_path().display());
    println!("  Failed URLs: {}", config.output.failed_urls_path().display());

    let tasks = config.domain_tasks();
    println!("\nDomains ({}):", tasks.len());
    for task in &tasks {
        match &task.reveal_selector {
            Some(selector) => println!(
                "  - {} (load more: '{}', up to {} attempts)",
                task.root_url, selector, task.max_reveal_attempts
            ),
            None => println!("  - {}", task.root_url),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling {} domains", tasks.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let settings = config.crawl_settings()?;
    let tasks = config.domain_tasks();
    let user_agent = config
        .renderer
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    tracing::info!(
        "Crawling {} domains with the {} renderer",
        tasks.len(),
        config.renderer.kind
    );

    let run = match config.renderer.kind {
        RendererKind::Http => {
            let factory = HttpRendererFactory::new(&user_agent)
                .context("Failed to build HTTP client")?;
            run_all(factory, tasks, settings).await
        }
        RendererKind::Chromium => {
            #[cfg(feature = "chromium")]
            {
                let factory = product_trawl::renderer::ChromiumRendererFactory::new(
                    config.renderer.headless,
                    config.renderer.user_agent.clone(),
                );
                run_all(factory, tasks, settings).await
            }
            #[cfg(not(feature = "chromium"))]
            {
                bail!("This build does not include the chromium renderer; use --renderer http");
            }
        }
    };

    let files = write_results(&run, &config.output).context("Failed to write results")?;
    println!("Product URLs saved to {}", files.products.display());
    println!("Failed URLs saved to {}\n", files.failed_urls.display());

    let stats = RunStatistics::from_run(&run);
    print_statistics(&stats);

    if !run.is_empty() && stats.failed_domains == run.len() {
        bail!("Every domain failed");
    }

    Ok(())
}
