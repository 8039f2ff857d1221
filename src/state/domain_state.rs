use std::collections::HashSet;

/// A URL waiting in the frontier together with its link depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Dedup state of one domain crawl
///
/// The engine owns the working copy and the state store holds the durable
/// one. `content_hashes` is the dedup key space: one stored page per hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCrawlState {
    /// Normalized host this state belongs to
    pub domain: String,

    /// Canonical URLs that have been pulled for fetching
    pub visited: HashSet<String>,

    /// SHA-256 hex digests of every stored page
    pub content_hashes: HashSet<String>,

    /// Whether the crawl finished and was marked complete
    pub is_complete: bool,
}

impl DomainCrawlState {
    /// Creates an empty state for a host
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Rebuilds a state from persisted sets
    pub fn from_parts<V, H>(domain: impl Into<String>, visited: V, hashes: H) -> Self
    where
        V: IntoIterator<Item = String>,
        H: IntoIterator<Item = String>,
    {
        Self {
            domain: domain.into(),
            visited: visited.into_iter().collect(),
            content_hashes: hashes.into_iter().collect(),
            is_complete: false,
        }
    }

    /// Number of unique pages stored for this domain
    pub fn pages_crawled(&self) -> u32 {
        self.content_hashes.len() as u32
    }

    pub fn urls_visited(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Marks a canonical URL as spent; returns false if it already was
    pub fn mark_visited(&mut self, url: impl Into<String>) -> bool {
        self.visited.insert(url.into())
    }

    /// Records a content hash; returns true when the hash is new
    pub fn record_hash(&mut self, hash: impl Into<String>) -> bool {
        self.content_hashes.insert(hash.into())
    }

    /// Folds another store's copy of the same domain into this one
    ///
    /// Either copy marking the domain complete makes the union complete.
    pub fn absorb(&mut self, other: DomainCrawlState) {
        self.visited.extend(other.visited);
        self.content_hashes.extend(other.content_hashes);
        self.is_complete |= other.is_complete;
    }

    /// Visited URLs in a stable order for persistence
    pub fn sorted_visited(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Content hashes in a stable order for persistence
    pub fn sorted_hashes(&self) -> Vec<String> {
        let mut hashes: Vec<String> = self.content_hashes.iter().cloned().collect();
        hashes.sort();
        hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_unions_sets_and_completion() {
        let mut stale = DomainCrawlState::from_parts("x.com", vec!["https://x.com".to_string()], vec!["h1".to_string()]);
        let mut ahead = DomainCrawlState::from_parts(
            "x.com",
            vec!["https://x.com".to_string(), "https://x.com/a".to_string()],
            vec!["h1".to_string(), "h2".to_string()],
        );
        ahead.is_complete = true;

        stale.absorb(ahead);
        assert_eq!(stale.urls_visited(), 2);
        assert_eq!(stale.pages_crawled(), 2);
        assert!(stale.is_complete);
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = DomainCrawlState::new("example.com");
        assert_eq!(state.domain, "example.com");
        assert_eq!(state.pages_crawled(), 0);
        assert_eq!(state.urls_visited(), 0);
        assert!(!state.is_complete);
    }

    #[test]
    fn test_mark_visited_once() {
        let mut state = DomainCrawlState::new("example.com");
        assert!(state.mark_visited("https://example.com"));
        assert!(!state.mark_visited("https://example.com"));
        assert!(state.is_visited("https://example.com"));
        assert_eq!(state.urls_visited(), 1);
    }

    #[test]
    fn test_record_hash_counts_unique_pages() {
        let mut state = DomainCrawlState::new("example.com");
        assert!(state.record_hash("abc"));
        assert!(!state.record_hash("abc"));
        assert!(state.record_hash("def"));
        assert_eq!(state.pages_crawled(), 2);
    }

    #[test]
    fn test_from_parts_and_sorted_output() {
        let state = DomainCrawlState::from_parts(
            "example.com",
            vec!["https://example.com/b".to_string(), "https://example.com/a".to_string()],
            vec!["h2".to_string(), "h1".to_string()],
        );
        assert_eq!(
            state.sorted_visited(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(state.sorted_hashes(), vec!["h1", "h2"]);
    }
}
