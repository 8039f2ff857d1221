//! Crawler module for web page fetching and domain crawls
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and HTML rendering
//! - The per-domain batch engine with crash-safe checkpoints
//! - The multi-domain worker pool

mod engine;
mod fetcher;
mod parser;
mod scheduler;

pub use engine::{CrawlOptions, DomainCrawler, DomainResult};
pub use fetcher::{build_http_client, fetch_page, FetchError, HttpRenderer, PageRenderer};
pub use parser::{render_html, RenderConfig, RenderedPage};
pub use scheduler::{crawl_domains, CrawlSummary};

use crate::config::Config;
use crate::storage::StoreSet;
use std::sync::Arc;

/// Builds a crawler over plain HTTP from the loaded configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `stores` - Opened state stores
///
/// # Returns
///
/// * `Ok(DomainCrawler)` - Ready to crawl
/// * `Err(reqwest::Error)` - The HTTP client could not be built
pub fn http_crawler(config: &Config, stores: StoreSet) -> Result<DomainCrawler, reqwest::Error> {
    let client = build_http_client(&config.user_agent, config.crawler.request_timeout_secs)?;
    let renderer = Arc::new(HttpRenderer::new(client.clone()));
    Ok(DomainCrawler::new(
        stores,
        renderer,
        client,
        CrawlOptions::from_config(config),
    ))
}
