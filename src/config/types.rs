use serde::Deserialize;

/// Main configuration structure for Lead-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of URLs visited per domain
    pub max_pages: u32,

    /// Maximum link depth followed from the seed URL
    pub max_depth: u32,

    /// Number of pages fetched in parallel within one domain
    pub concurrency: u32,

    /// Number of domains crawled at the same time
    pub max_parallel_domains: u32,

    /// Run the batch loop a second time when the first pass stored nothing
    pub retry_on_zero: bool,

    /// Skip domains whose crawl state is already complete
    pub skip_crawled: bool,

    /// Lower bound of the randomized pause between batches (milliseconds)
    pub politeness_delay_min_ms: u64,

    /// Upper bound of the randomized pause between batches (milliseconds)
    pub politeness_delay_max_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 2000,
            max_depth: 3,
            concurrency: 5,
            max_parallel_domains: 3,
            retry_on_zero: true,
            skip_crawled: true,
            politeness_delay_min_ms: 200,
            politeness_delay_max_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt agent token
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database (primary store). Empty disables it.
    #[serde(default)]
    pub database_path: String,

    /// Directory for the local-file fallback store
    pub fallback_dir: String,

    /// Maximum number of stored pages read back per domain
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_page_limit() -> usize {
    1000
}

/// Chunker parameters, expressed in tokens
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ChunkingConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub min_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: 800,
            overlap_tokens: 150,
            min_tokens: 100,
        }
    }
}

/// Extraction batcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// Maximum number of LLM calls in flight
    pub max_concurrent: usize,

    /// Stagger between request starts (milliseconds)
    pub request_delay_ms: u64,

    /// Maximum attempts on rate-limit responses
    pub max_retries: u32,

    /// Maximum characters per extraction chunk
    pub chars_per_chunk: usize,

    /// Maximum characters of page content loaded per domain
    pub char_limit: usize,

    /// Default industry filter for product extraction
    pub industry_filter: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            request_delay_ms: 1000,
            max_retries: 10,
            chars_per_chunk: 25_000,
            char_limit: 500_000,
            industry_filter: "goalkeeper gloves".to_string(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub api_base: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Chat model used for extraction
    pub chat_model: String,

    /// Embedding model
    pub embedding_model: String,

    /// Provider-level timeout per call (seconds)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Embedding job configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EmbeddingConfig {
    /// Number of texts sent per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}
