//! Multi-pass LLM extraction over stored pages
//!
//! This module handles:
//! - Selecting and ordering stored pages within a character budget
//! - Packing pages into extraction chunks, one chunk per page at most
//! - Fanning chunks out to the provider with bounded, staggered concurrency
//! - Merging partial profiles and deduplicating product lists

mod batcher;
mod fields;
mod llm;
mod products;
mod profile;
mod prompts;
mod retry;

pub use batcher::{run_batch, BatchOutcome, BatchSettings, ChunkFailure};
pub use llm::{LlmError, LlmProvider, OpenAiClient};
pub use products::{merge_products, parse_products_response, Product, ProductKey};
pub use profile::{merge_profiles, CompanyProfile, MainContacts, ProfileFragment, SocialMedia};
pub use prompts::{products_prompt, profile_prompt};
pub use retry::{parse_wait, with_backoff, RetryPolicy};

use crate::config::{ExtractionConfig, StorageConfig};
use crate::state::CrawledPage;
use crate::storage::{StorageError, StoreSet};
use crate::url::host_of;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// URL fragments of pages that usually describe the company
pub const PROFILE_KEYWORDS: &[&str] = &["/about", "/contact", "/team", "/company", "/who-we-are"];

/// URL fragments of catalog pages
pub const PRODUCT_KEYWORDS: &[&str] = &["/product", "/shop", "/collection", "/catalog", "/store"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Cannot read stored pages: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// Products merged from one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    pub domain: String,
    pub products: Vec<Product>,
    pub crawled_pages: usize,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
}

/// Keeps pages in order until the character budget would be exceeded
pub fn select_pages(pages: Vec<CrawledPage>, char_limit: usize) -> Vec<CrawledPage> {
    let mut total = 0;
    let mut selected = Vec::new();
    for page in pages {
        let len = page.content.chars().count();
        if total + len > char_limit {
            break;
        }
        total += len;
        selected.push(page);
    }
    selected
}

/// Moves pages whose URL matches a keyword (or the seed page, when asked)
/// ahead of the rest, keeping relative order in both groups
pub fn prioritize<'a>(pages: &'a [CrawledPage], keywords: &[&str], include_seed: bool) -> Vec<&'a CrawledPage> {
    let (mut first, rest): (Vec<_>, Vec<_>) = pages.iter().partition(|page| {
        let url = page.url.to_lowercase();
        keywords.iter().any(|kw| url.contains(kw)) || (include_seed && page.depth == 0)
    });
    first.extend(rest);
    first
}

/// Renders one page the way the model sees it
pub fn page_block(page: &CrawledPage) -> String {
    let title = if page.title.is_empty() { "Page" } else { page.title.as_str() };
    format!("# {}\nURL: {}\n\n{}\n\n---\n\n", title, page.url, page.content)
}

/// Packs pages into chunks of at most `chars_per_chunk` characters
///
/// Every page lands in exactly one chunk. A page larger than the limit
/// forms a chunk of its own.
pub fn pack_pages(pages: &[&CrawledPage], chars_per_chunk: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for page in pages {
        let block = page_block(page);
        let block_chars = block.chars().count();
        if current_chars + block_chars > chars_per_chunk && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push_str(&block);
        current_chars += block_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Runs profile and product extraction for stored domains
#[derive(Clone)]
pub struct Extractor {
    llm: Arc<dyn LlmProvider>,
    stores: StoreSet,
    config: ExtractionConfig,
    page_limit: usize,
    settings: BatchSettings,
}

impl Extractor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        stores: StoreSet,
        config: ExtractionConfig,
        storage: &StorageConfig,
    ) -> Self {
        let settings = BatchSettings::from_config(&config);
        Self {
            llm,
            stores,
            config,
            page_limit: storage.page_limit,
            settings,
        }
    }

    /// Overrides concurrency, stagger and retry settings
    pub fn with_settings(mut self, settings: BatchSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn load_pages(&self, domain: &str) -> Result<(String, Vec<CrawledPage>), ExtractError> {
        let host = host_of(domain);
        if host.is_empty() {
            return Err(ExtractError::InvalidDomain(domain.to_string()));
        }
        let pages = self.stores.get_pages(&host, self.page_limit).await?;
        Ok((host, select_pages(pages, self.config.char_limit)))
    }

    /// Extracts and merges the company profile of a crawled domain
    ///
    /// Returns `None` when the domain has no stored pages. Failed chunks are
    /// counted in `chunks_failed` and left out of the merge.
    pub async fn extract_profile(&self, domain: &str) -> Result<Option<CompanyProfile>, ExtractError> {
        let (host, pages) = self.load_pages(domain).await?;
        if pages.is_empty() {
            return Ok(None);
        }

        let ordered = prioritize(&pages, PROFILE_KEYWORDS, true);
        let chunks = pack_pages(&ordered, self.config.chars_per_chunk);
        info!(domain = %host, pages = pages.len(), chunks = chunks.len(), "Extracting company profile");

        let outcome = run_batch(chunks.len(), &self.settings, &host, |index| {
            let prompt = profile_prompt(&host, &chunks[index]);
            let llm = self.llm.clone();
            async move {
                let value = llm.complete_json(&prompt).await?;
                serde_json::from_value::<ProfileFragment>(value)
                    .map_err(|e| LlmError::MalformedResponse(e.to_string()))
            }
        })
        .await;

        let mut profile = merge_profiles(&host, &outcome.results);
        profile.crawled_pages = pages.len();
        profile.chunks_processed = chunks.len();
        profile.chunks_failed = outcome.failures.len();

        info!(
            domain = %host,
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            emails = profile.main_contacts.email.len(),
            "Company profile merged"
        );
        Ok(Some(profile))
    }

    /// Extracts the product catalog of a crawled domain for one industry
    pub async fn extract_products(&self, domain: &str, industry: &str) -> Result<ProductCatalog, ExtractError> {
        let (host, pages) = self.load_pages(domain).await?;
        let mut catalog = ProductCatalog {
            domain: host.clone(),
            crawled_pages: pages.len(),
            ..ProductCatalog::default()
        };
        if pages.is_empty() {
            return Ok(catalog);
        }

        let ordered = prioritize(&pages, PRODUCT_KEYWORDS, false);
        let chunks = pack_pages(&ordered, self.config.chars_per_chunk);
        info!(domain = %host, industry = %industry, chunks = chunks.len(), "Extracting products");

        let outcome = run_batch(chunks.len(), &self.settings, &host, |index| {
            let prompt = products_prompt(industry, &chunks[index]);
            let llm = self.llm.clone();
            async move { llm.complete_json(&prompt).await.map(parse_products_response) }
        })
        .await;

        catalog.products = merge_products(&host, &outcome.results);
        catalog.chunks_processed = chunks.len();
        catalog.chunks_failed = outcome.failures.len();

        info!(
            domain = %host,
            products = catalog.products.len(),
            failed = catalog.chunks_failed,
            "Products merged"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn page(url: &str, depth: u32, content: &str) -> CrawledPage {
        CrawledPage {
            url: url.to_string(),
            domain: "x.com".to_string(),
            title: "T".to_string(),
            content: content.to_string(),
            content_hash: crate::state::content_hash(content),
            depth,
            fetched_at: Utc::now(),
            outbound_links: vec![],
        }
    }

    #[test]
    fn test_select_pages_stops_at_budget() {
        let pages = vec![
            page("https://x.com/a", 1, &"a".repeat(40)),
            page("https://x.com/b", 1, &"b".repeat(40)),
            page("https://x.com/c", 1, &"c".repeat(20)),
        ];
        let selected = select_pages(pages, 90);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_prioritize_profile_pages() {
        let pages = vec![
            page("https://x.com/blog/1", 1, "b"),
            page("https://x.com/About-Us", 1, "a"),
            page("https://x.com", 0, "home"),
            page("https://x.com/contact", 2, "c"),
        ];
        let order: Vec<&str> = prioritize(&pages, PROFILE_KEYWORDS, true)
            .iter()
            .map(|p| p.url.as_str())
            .collect();
        assert_eq!(
            order,
            vec!["https://x.com/About-Us", "https://x.com", "https://x.com/contact", "https://x.com/blog/1"]
        );
    }

    #[test]
    fn test_page_block_format() {
        let block = page_block(&page("https://x.com/a", 1, "Body"));
        assert_eq!(block, "# T\nURL: https://x.com/a\n\nBody\n\n---\n\n");
    }

    #[test]
    fn test_pack_pages_never_splits_a_page() {
        let small = page("https://x.com/a", 1, "short");
        let large = page("https://x.com/b", 1, &"x".repeat(200));
        let other = page("https://x.com/c", 1, "tail");
        let chunks = pack_pages(&[&small, &large, &other], 100);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].contains(&"x".repeat(200)));
        assert_eq!(chunks.iter().filter(|c| c.contains("URL: https://x.com/a")).count(), 1);
    }

    #[test]
    fn test_pack_pages_combines_small_pages() {
        let a = page("https://x.com/a", 1, "one");
        let b = page("https://x.com/b", 1, "two");
        let chunks = pack_pages(&[&a, &b], 1000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("# T\nURL: https://x.com/a"));
    }
}
