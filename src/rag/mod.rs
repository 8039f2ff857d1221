//! Embedding of crawled pages, products and company profiles
//!
//! Records live in three collections (`raw_pages`, `products`,
//! `companies`) keyed by `chunk_id`. Each record carries the SHA-256 of its
//! content so unchanged text is never embedded twice.

mod embedder;
mod records;

pub use embedder::{EmbedStats, Embedder};
pub use records::{
    company_record, company_text, page_records, product_records, product_text, EmbeddingRecord,
    COMPANIES, PRODUCTS, RAW_PAGES,
};
