//! Storage traits and error types
//!
//! Every backend speaks one non-blocking interface. The crawl engine only
//! needs `StateStore`; extraction and embedding persist through
//! `EntityStore` and `VectorStore`.

use crate::extract::{CompanyProfile, Product};
use crate::rag::EmbeddingRecord;
use crate::state::{CrawledPage, DomainCrawlState};
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Crawl progress of a domain as reported by `status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainStatus {
    pub fully_crawled: bool,
    pub pages: u32,
    pub visited_urls: usize,
    /// Has stored data but was never marked complete
    pub in_progress: bool,
}

impl DomainStatus {
    pub fn new(fully_crawled: bool, pages: u32, visited_urls: usize) -> Self {
        Self {
            fully_crawled,
            pages,
            visited_urls,
            in_progress: !fully_crawled && (pages > 0 || visited_urls > 0),
        }
    }
}

/// Durable per-domain crawl state and page archive
///
/// Writes are scoped to a single domain key, so concurrent crawls of
/// different domains never contend on the same record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Loads the persisted visited/hash sets; empty state if none exist
    async fn load(&self, domain: &str) -> StorageResult<DomainCrawlState>;

    /// Persists the working sets after a batch
    ///
    /// A domain already marked complete is left untouched.
    async fn checkpoint(
        &self,
        domain: &str,
        visited: &[String],
        hashes: &[String],
        complete: bool,
        pages_crawled: u32,
    ) -> StorageResult<()>;

    /// Flips the completion flag; the only way a domain becomes complete
    async fn mark_complete(
        &self,
        domain: &str,
        visited_count: usize,
        hash_count: usize,
    ) -> StorageResult<()>;

    /// Stores a page; a second page with the same hash is ignored
    async fn save_page(&self, page: &CrawledPage) -> StorageResult<()>;

    /// Returns up to `limit` stored pages, shallowest first
    async fn get_pages(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawledPage>>;

    async fn status(&self, domain: &str) -> StorageResult<DomainStatus>;

    /// Deletes state and pages so the domain can be crawled again
    async fn reset(&self, domain: &str) -> StorageResult<()>;
}

/// Persistence for merged extraction results
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn save_profile(&self, profile: &CompanyProfile) -> StorageResult<()>;

    async fn get_profile(&self, domain: &str) -> StorageResult<Option<CompanyProfile>>;

    /// Replaces the product catalog of a domain
    async fn save_products(&self, domain: &str, products: &[Product]) -> StorageResult<()>;

    async fn get_products(&self, domain: &str) -> StorageResult<Vec<Product>>;
}

/// Persistence for embedding records keyed by chunk id
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Content hashes already embedded for a domain collection
    async fn existing_hashes(&self, domain: &str, collection: &str)
        -> StorageResult<HashSet<String>>;

    /// Inserts or replaces records by `chunk_id`
    async fn upsert(&self, records: &[EmbeddingRecord]) -> StorageResult<()>;

    async fn count(&self, domain: &str, collection: &str) -> StorageResult<usize>;
}
