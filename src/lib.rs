//! Lead-Crawler: resumable company-site crawler and extraction engine
//!
//! This crate crawls company websites with crash-safe incremental state,
//! deduplicates pages by content hash, splits page text into token-bounded
//! chunks and fans those chunks out to an LLM for structured extraction.

pub mod chunking;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod rag;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lead-Crawler operations
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("LLM error: {0}")]
    Llm(#[from] extract::LlmError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("No state store could be initialized for {domain}: {message}")]
    NoStateStore { domain: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

/// Result type alias for Lead-Crawler operations
pub type Result<T> = std::result::Result<T, LeadError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_domains, CrawlOptions, CrawlSummary, DomainCrawler};
pub use state::{CrawlPhase, CrawledPage, DomainCrawlState};
pub use crate::url::{canonicalize, host_of, should_skip};
