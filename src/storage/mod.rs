//! Storage module for persisting crawl data
//!
//! This module handles every durable write the pipeline makes:
//! - SQLite primary store (crawl state, pages, profiles, products, embeddings)
//! - Local-file fallback store (state sets and a gzip page archive)
//! - Per-domain fallback composition with explicit `StorageOutcome`s

mod file;
mod schema;
mod sqlite;
mod traits;

pub use file::FileStore;
pub use sqlite::SqliteStore;
pub use traits::{
    DomainStatus, EntityStore, StateStore, StorageError, StorageResult, VectorStore,
};

use crate::config::StorageConfig;
use crate::state::{CrawledPage, DomainCrawlState};
use crate::LeadError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a write actually landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOutcome {
    /// Persisted in the primary store
    Primary,
    /// Primary unavailable or failed, persisted only in the fallback
    Fallback,
    /// No store accepted the write
    Lost,
}

impl StorageOutcome {
    pub fn is_durable(&self) -> bool {
        !matches!(self, Self::Lost)
    }
}

/// Primary plus fallback state stores shared by all domain crawls
#[derive(Clone)]
pub struct StoreSet {
    primary: Option<Arc<dyn StateStore>>,
    fallback: Arc<dyn StateStore>,
}

impl StoreSet {
    pub fn new(primary: Option<Arc<dyn StateStore>>, fallback: Arc<dyn StateStore>) -> Self {
        Self { primary, fallback }
    }

    /// Opens the configured stores
    ///
    /// A primary database that cannot be opened is logged and skipped; the
    /// fallback directory must be usable.
    pub fn open(config: &StorageConfig) -> Result<Self, LeadError> {
        let primary: Option<Arc<dyn StateStore>> = if config.database_path.is_empty() {
            None
        } else {
            match SqliteStore::new(Path::new(&config.database_path)) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    warn!(path = %config.database_path, error = %e, "Primary store unavailable, using file store only");
                    None
                }
            }
        };

        let fallback = FileStore::new(&config.fallback_dir)?;
        Ok(Self::new(primary, Arc::new(fallback)))
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Starts the persistence session for one domain crawl
    pub fn for_domain(&self, domain: &str) -> DomainPersistence {
        DomainPersistence {
            domain: domain.to_string(),
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
        }
    }

    /// Reports crawl status, preferring the primary store
    pub async fn status(&self, domain: &str) -> StorageResult<DomainStatus> {
        if let Some(primary) = &self.primary {
            match primary.status(domain).await {
                Ok(status) => return Ok(status),
                Err(e) => warn!(domain = %domain, error = %e, "Primary status failed, reading fallback"),
            }
        }
        self.fallback.status(domain).await
    }

    /// Reads stored pages from both stores, one per content hash
    ///
    /// The fallback can hold pages the primary missed while it was disabled.
    /// Pages come back ordered by depth, capped at `limit`.
    pub async fn get_pages(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        let mut primary_pages = None;
        if let Some(primary) = &self.primary {
            match primary.get_pages(domain, limit).await {
                Ok(pages) => primary_pages = Some(pages),
                Err(e) => warn!(domain = %domain, error = %e, "Primary page read failed, reading fallback"),
            }
        }

        let mut pages = match (primary_pages, self.fallback.get_pages(domain, limit).await) {
            (None, Err(e)) => return Err(e),
            (Some(pages), Err(e)) => {
                warn!(domain = %domain, error = %e, "Fallback page read failed, using primary only");
                pages
            }
            (primary, Ok(archived)) => {
                let mut pages = primary.unwrap_or_default();
                let mut seen: HashSet<String> = pages.iter().map(|p| p.content_hash.clone()).collect();
                pages.extend(archived.into_iter().filter(|p| seen.insert(p.content_hash.clone())));
                pages
            }
        };

        pages.sort_by_key(|p| p.depth);
        pages.truncate(limit);
        Ok(pages)
    }

    /// Clears a domain in every store
    pub async fn reset(&self, domain: &str) -> StorageResult<()> {
        if let Some(primary) = &self.primary {
            primary.reset(domain).await?;
        }
        self.fallback.reset(domain).await?;
        info!(domain = %domain, "Crawl state reset");
        Ok(())
    }
}

/// Opens the store that keeps profiles and products
///
/// Uses the SQLite database when one is configured and opens, otherwise the
/// fallback directory.
pub fn open_entity_store(config: &StorageConfig) -> Result<Arc<dyn EntityStore>, LeadError> {
    if !config.database_path.is_empty() {
        match SqliteStore::new(Path::new(&config.database_path)) {
            Ok(store) => return Ok(Arc::new(store)),
            Err(e) => warn!(path = %config.database_path, error = %e, "Primary store unavailable, saving entities to files"),
        }
    }
    Ok(Arc::new(FileStore::new(&config.fallback_dir)?))
}

/// Opens the SQLite database holding embeddings
pub fn open_vector_store(config: &StorageConfig) -> Result<Arc<SqliteStore>, LeadError> {
    if config.database_path.is_empty() {
        return Err(crate::ConfigError::Validation(
            "embedding requires storage.database-path".to_string(),
        )
        .into());
    }
    Ok(Arc::new(SqliteStore::new(Path::new(&config.database_path))?))
}

/// Persistence for a single domain crawl
///
/// Tracks whether the primary is still trusted for this crawl. A failed
/// state write disables the primary until the crawl ends; a failed page
/// write only degrades that page.
pub struct DomainPersistence {
    domain: String,
    primary: Option<Arc<dyn StateStore>>,
    fallback: Arc<dyn StateStore>,
}

impl DomainPersistence {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns true while the primary store is in use
    pub fn primary_active(&self) -> bool {
        self.primary.is_some()
    }

    fn disable_primary(&mut self, operation: &str, error: &StorageError) {
        if let Some(primary) = self.primary.take() {
            warn!(
                domain = %self.domain,
                store = primary.name(),
                operation = operation,
                error = %error,
                "Primary store failed, continuing with fallback"
            );
        }
    }

    /// Loads prior state as the union of every store that answers
    ///
    /// A primary disabled during an earlier run falls behind the fallback,
    /// so neither copy alone is trusted for the visited set.
    ///
    /// # Errors
    ///
    /// `LeadError::NoStateStore` when neither store can be read.
    pub async fn load(&mut self) -> Result<DomainCrawlState, LeadError> {
        let mut loaded = None;
        if let Some(primary) = self.primary.clone() {
            match primary.load(&self.domain).await {
                Ok(state) => loaded = Some(state),
                Err(e) => self.disable_primary("load", &e),
            }
        }

        match (loaded, self.fallback.load(&self.domain).await) {
            (Some(mut state), Ok(fallback)) => {
                state.absorb(fallback);
                Ok(state)
            }
            (None, Ok(fallback)) => Ok(fallback),
            (Some(state), Err(e)) => {
                warn!(domain = %self.domain, error = %e, "Fallback state unreadable, using primary only");
                Ok(state)
            }
            (None, Err(e)) => Err(LeadError::NoStateStore {
                domain: self.domain.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Writes the working sets to every healthy store
    pub async fn checkpoint(&mut self, state: &DomainCrawlState) -> StorageOutcome {
        let visited = state.sorted_visited();
        let hashes = state.sorted_hashes();
        let pages = state.pages_crawled();

        let mut outcome = StorageOutcome::Lost;
        if let Some(primary) = self.primary.clone() {
            match primary
                .checkpoint(&self.domain, &visited, &hashes, false, pages)
                .await
            {
                Ok(()) => outcome = StorageOutcome::Primary,
                Err(e) => self.disable_primary("checkpoint", &e),
            }
        }

        match self
            .fallback
            .checkpoint(&self.domain, &visited, &hashes, false, pages)
            .await
        {
            Ok(()) if outcome == StorageOutcome::Lost => StorageOutcome::Fallback,
            Ok(()) => outcome,
            Err(e) => {
                warn!(domain = %self.domain, error = %e, "Fallback checkpoint failed");
                outcome
            }
        }
    }

    /// Stores a new page; the fallback archive always receives a copy
    pub async fn save_page(&mut self, page: &CrawledPage) -> StorageOutcome {
        let mut outcome = StorageOutcome::Lost;
        if let Some(primary) = &self.primary {
            match primary.save_page(page).await {
                Ok(()) => outcome = StorageOutcome::Primary,
                Err(e) => warn!(
                    domain = %self.domain,
                    url = %page.url,
                    error = %e,
                    "Page save failed on primary, keeping local copy only"
                ),
            }
        }

        match self.fallback.save_page(page).await {
            Ok(()) if outcome == StorageOutcome::Lost => StorageOutcome::Fallback,
            Ok(()) => outcome,
            Err(e) => {
                warn!(domain = %self.domain, url = %page.url, error = %e, "Fallback page save failed");
                outcome
            }
        }
    }

    /// Records completion in every healthy store
    pub async fn mark_complete(&mut self, state: &DomainCrawlState) -> StorageOutcome {
        let visited = state.urls_visited();
        let hashes = state.content_hashes.len();

        let mut outcome = StorageOutcome::Lost;
        if let Some(primary) = self.primary.clone() {
            match primary.mark_complete(&self.domain, visited, hashes).await {
                Ok(()) => outcome = StorageOutcome::Primary,
                Err(e) => self.disable_primary("mark_complete", &e),
            }
        }

        match self.fallback.mark_complete(&self.domain, visited, hashes).await {
            Ok(()) if outcome == StorageOutcome::Lost => StorageOutcome::Fallback,
            Ok(()) => outcome,
            Err(e) => {
                warn!(domain = %self.domain, error = %e, "Fallback completion marker failed");
                outcome
            }
        }
    }
}
