//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Lead-Crawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Per-domain crawl frontier state
CREATE TABLE IF NOT EXISTS crawl_state (
    domain TEXT PRIMARY KEY,
    visited TEXT NOT NULL DEFAULT '[]',
    content_hashes TEXT NOT NULL DEFAULT '[]',
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    is_complete INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);

-- One row per unique page content per domain
CREATE TABLE IF NOT EXISTS crawled_pages (
    domain TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL,
    depth INTEGER NOT NULL,
    fetched_at TEXT NOT NULL,
    outbound_links TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (domain, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_depth ON crawled_pages(domain, depth);

-- Merged company profiles
CREATE TABLE IF NOT EXISTS company_profiles (
    domain TEXT PRIMARY KEY,
    profile TEXT NOT NULL,
    extracted_at TEXT NOT NULL
);

-- Merged product catalogs
CREATE TABLE IF NOT EXISTS products (
    product_id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    position INTEGER NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_domain ON products(domain);

-- Embedding vectors keyed by chunk id
CREATE TABLE IF NOT EXISTS embeddings (
    chunk_id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    collection TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    embedding TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_collection ON embeddings(domain, collection);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
