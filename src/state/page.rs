use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Computes the content fingerprint used as the dedup key
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// A rendered page as returned by the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Canonical URL the page was fetched from
    pub url: String,
    pub title: String,
    /// Rendered, trimmed text content (never empty)
    pub content: String,
    pub content_hash: String,
    pub depth: u32,
    /// Absolute same-host links found on the page
    pub links: Vec<String>,
}

impl FetchedPage {
    /// Builds a page from rendered text, computing its fingerprint
    ///
    /// Returns `None` when the text is empty after trimming.
    pub fn from_render(
        url: impl Into<String>,
        title: impl Into<String>,
        text: &str,
        depth: u32,
        links: Vec<String>,
    ) -> Option<Self> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }

        Some(Self {
            url: url.into(),
            title: title.into(),
            content: content.to_string(),
            content_hash: content_hash(content),
            depth,
            links,
        })
    }

    /// Turns the fetched page into the immutable stored record
    pub fn into_crawled(self, domain: &str) -> CrawledPage {
        CrawledPage {
            url: self.url,
            domain: domain.to_string(),
            title: self.title,
            content: self.content,
            content_hash: self.content_hash,
            depth: self.depth,
            fetched_at: Utc::now(),
            outbound_links: self.links,
        }
    }
}

/// A stored page, one per unique content hash per domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub depth: u32,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub outbound_links: Vec<String>,
}
