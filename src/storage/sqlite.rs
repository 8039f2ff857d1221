//! SQLite storage implementation
//!
//! The primary durable store. One connection is shared behind a mutex and
//! every statement touches a single domain's rows.

use crate::extract::{CompanyProfile, Product};
use crate::rag::EmbeddingRecord;
use crate::state::{CrawledPage, DomainCrawlState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    DomainStatus, EntityStore, StateStore, StorageError, StorageResult, VectorStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or apply the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn decode_list(raw: &str) -> StorageResult<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl StateStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, domain: &str) -> StorageResult<DomainCrawlState> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT visited, content_hashes, is_complete FROM crawl_state WHERE domain = ?1",
                params![domain],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((visited, hashes, is_complete)) => {
                let mut state =
                    DomainCrawlState::from_parts(domain, decode_list(&visited)?, decode_list(&hashes)?);
                state.is_complete = is_complete;
                Ok(state)
            }
            None => Ok(DomainCrawlState::new(domain)),
        }
    }

    async fn checkpoint(
        &self,
        domain: &str,
        visited: &[String],
        hashes: &[String],
        complete: bool,
        pages_crawled: u32,
    ) -> StorageResult<()> {
        let visited_json = serde_json::to_string(visited)?;
        let hashes_json = serde_json::to_string(hashes)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO crawl_state (domain, visited, content_hashes, pages_crawled, is_complete, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(domain) DO UPDATE SET
                visited = excluded.visited,
                content_hashes = excluded.content_hashes,
                pages_crawled = excluded.pages_crawled,
                is_complete = excluded.is_complete,
                updated_at = excluded.updated_at
             WHERE crawl_state.is_complete = 0",
            params![domain, visited_json, hashes_json, pages_crawled, complete, now],
        )?;
        Ok(())
    }

    async fn mark_complete(
        &self,
        domain: &str,
        visited_count: usize,
        hash_count: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE crawl_state
             SET is_complete = 1, pages_crawled = ?2, completed_at = ?3, updated_at = ?3
             WHERE domain = ?1",
            params![domain, hash_count as i64, now],
        )?;

        if updated == 0 {
            conn.execute(
                "INSERT INTO crawl_state (domain, pages_crawled, is_complete, updated_at, completed_at)
                 VALUES (?1, ?2, 1, ?3, ?3)",
                params![domain, hash_count as i64, now],
            )?;
        }

        tracing::debug!(domain = %domain, visited = visited_count, pages = hash_count, "Marked complete in sqlite");
        Ok(())
    }

    async fn save_page(&self, page: &CrawledPage) -> StorageResult<()> {
        let links = serde_json::to_string(&page.outbound_links)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO crawled_pages
                (domain, content_hash, url, title, content, depth, fetched_at, outbound_links)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                page.domain,
                page.content_hash,
                page.url,
                page.title,
                page.content,
                page.depth,
                page.fetched_at.to_rfc3339(),
                links
            ],
        )?;
        Ok(())
    }

    async fn get_pages(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, content, content_hash, depth, fetched_at, outbound_links
             FROM crawled_pages WHERE domain = ?1
             ORDER BY depth ASC, fetched_at ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![domain, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut pages = Vec::new();
        for row in rows {
            let (url, title, content, content_hash, depth, fetched_at, links) = row?;
            pages.push(CrawledPage {
                url,
                domain: domain.to_string(),
                title,
                content,
                content_hash,
                depth,
                fetched_at: parse_timestamp(&fetched_at),
                outbound_links: decode_list(&links)?,
            });
        }

        Ok(pages)
    }

    async fn status(&self, domain: &str) -> StorageResult<DomainStatus> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT visited, pages_crawled, is_complete FROM crawl_state WHERE domain = ?1",
                params![domain],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((visited, pages, complete)) => {
                let visited_urls = decode_list(&visited)?.len();
                Ok(DomainStatus::new(complete, pages, visited_urls))
            }
            None => Ok(DomainStatus::default()),
        }
    }

    async fn reset(&self, domain: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM crawl_state WHERE domain = ?1", params![domain])?;
        conn.execute("DELETE FROM crawled_pages WHERE domain = ?1", params![domain])?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn save_profile(&self, profile: &CompanyProfile) -> StorageResult<()> {
        let data = serde_json::to_string(profile)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO company_profiles (domain, profile, extracted_at) VALUES (?1, ?2, ?3)",
            params![profile.domain, data, profile.extracted_at.to_rfc3339()],
        )?;
        Ok(())
    }

    async fn get_profile(&self, domain: &str) -> StorageResult<Option<CompanyProfile>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT profile FROM company_profiles WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_products(&self, domain: &str, products: &[Product]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM products WHERE domain = ?1", params![domain])?;

        for (position, product) in products.iter().enumerate() {
            let product_id = product
                .product_id
                .clone()
                .unwrap_or_else(|| format!("{}_product_{}", domain, position + 1));
            tx.execute(
                "INSERT OR REPLACE INTO products (product_id, domain, position, data) VALUES (?1, ?2, ?3, ?4)",
                params![product_id, domain, position as i64, serde_json::to_string(product)?],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_products(&self, domain: &str) -> StorageResult<Vec<Product>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT data FROM products WHERE domain = ?1 ORDER BY position ASC")?;
        let rows = stmt.query_map(params![domain], |row| row.get::<_, String>(0))?;

        let mut products = Vec::new();
        for row in rows {
            products.push(serde_json::from_str(&row?)?);
        }
        Ok(products)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn existing_hashes(
        &self,
        domain: &str,
        collection: &str,
    ) -> StorageResult<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT content_hash FROM embeddings WHERE domain = ?1 AND collection = ?2",
        )?;
        let rows = stmt.query_map(params![domain, collection], |row| row.get::<_, String>(0))?;

        let mut hashes = HashSet::new();
        for row in rows {
            hashes.insert(row?);
        }
        Ok(hashes)
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO embeddings
                    (chunk_id, domain, collection, content, content_hash, embedding, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.chunk_id,
                    record.domain,
                    record.collection,
                    record.content,
                    record.content_hash,
                    serde_json::to_string(&record.embedding)?,
                    record.metadata.to_string(),
                    now
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn count(&self, domain: &str, collection: &str) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE domain = ?1 AND collection = ?2",
            params![domain, collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
