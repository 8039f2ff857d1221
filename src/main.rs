//! Lead-Crawler main entry point
//!
//! Command-line interface for crawling company sites, extracting profiles
//! and products, and embedding the results.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lead_crawler::chunking::Chunker;
use lead_crawler::config::{load_config_with_hash, Config};
use lead_crawler::crawler::{crawl_domains, http_crawler};
use lead_crawler::extract::{Extractor, OpenAiClient, RetryPolicy};
use lead_crawler::output::{print_crawl_summary, print_embed_stats, print_extraction, print_status};
use lead_crawler::rag::Embedder;
use lead_crawler::storage::{open_entity_store, open_vector_store, EntityStore, StoreSet};
use lead_crawler::url::{host_of, seed_url};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lead-Crawler: resumable company-site crawler and extractor
#[derive(Parser, Debug)]
#[command(name = "lead-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Crawls company websites and extracts lead data", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "PATH", default_value = "lead-crawler.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one or more domains
    Crawl {
        /// Domains or seed URLs
        #[arg(required = true)]
        domains: Vec<String>,

        /// Reset stored state and crawl again, even if complete
        #[arg(long)]
        force: bool,
    },

    /// Show crawl progress of domains
    Status {
        #[arg(required = true)]
        domains: Vec<String>,
    },

    /// Extract the company profile and products of a crawled domain
    Extract {
        domain: String,

        /// Product industry filter (defaults to the configured one)
        #[arg(long)]
        industry: Option<String>,
    },

    /// Embed pages, products and profile of a domain
    Embed {
        domain: String,

        /// Re-embed records whose content is unchanged
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", hash);

    match cli.command {
        Command::Crawl { domains, force } => handle_crawl(config, &domains, force).await,
        Command::Status { domains } => handle_status(&config, &domains).await,
        Command::Extract { domain, industry } => handle_extract(&config, &domain, industry).await,
        Command::Embed { domain, force } => handle_embed(&config, &domain, force).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lead_crawler=info,warn"),
            1 => EnvFilter::new("lead_crawler=debug,info"),
            2 => EnvFilter::new("lead_crawler=trace,debug"),
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

async fn handle_crawl(mut config: Config, domains: &[String], force: bool) -> anyhow::Result<()> {
    let stores = StoreSet::open(&config.storage)?;

    if force {
        config.crawler.skip_crawled = false;
        for domain in domains {
            let host = host_of(&seed_url(domain));
            stores
                .reset(&host)
                .await
                .with_context(|| format!("Failed to reset {}", host))?;
        }
    }

    let crawler = http_crawler(&config, stores).context("Failed to build HTTP client")?;
    let summary = crawl_domains(&crawler, domains).await;
    print_crawl_summary(&summary);

    if summary.failed_domains > 0 && summary.crawled_domains == 0 && summary.skipped_domains == 0 {
        anyhow::bail!("all {} domains failed", summary.failed_domains);
    }
    Ok(())
}

async fn handle_status(config: &Config, domains: &[String]) -> anyhow::Result<()> {
    let stores = StoreSet::open(&config.storage)?;
    for domain in domains {
        let host = host_of(&seed_url(domain));
        let status = stores
            .status(&host)
            .await
            .with_context(|| format!("Failed to read status of {}", host))?;
        print_status(&host, &status);
    }
    Ok(())
}

async fn handle_extract(config: &Config, domain: &str, industry: Option<String>) -> anyhow::Result<()> {
    let stores = StoreSet::open(&config.storage)?;
    let entities = open_entity_store(&config.storage)?;
    let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let extractor = Extractor::new(llm, stores, config.extraction.clone(), &config.storage);
    let industry = industry.unwrap_or_else(|| config.extraction.industry_filter.clone());

    let profile = extractor.extract_profile(domain).await?;
    if let Some(profile) = &profile {
        entities.save_profile(profile).await?;
    }

    let catalog = extractor.extract_products(domain, &industry).await?;
    entities.save_products(&catalog.domain, &catalog.products).await?;

    print_extraction(&catalog.domain, profile.as_ref(), &catalog);
    Ok(())
}

async fn handle_embed(config: &Config, domain: &str, force: bool) -> anyhow::Result<()> {
    let stores = StoreSet::open(&config.storage)?;
    let database = open_vector_store(&config.storage)?;
    let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
    let chunker = Chunker::cl100k(config.chunking)?;

    let embedder = Embedder::new(llm, stores, database.clone(), database, chunker)
        .with_batch_size(config.embedding.batch_size)
        .with_page_limit(config.storage.page_limit)
        .with_retry(RetryPolicy::new(config.extraction.max_retries));

    let stats = embedder.embed_domain(domain, force).await?;
    print_embed_stats(&stats);
    Ok(())
}
