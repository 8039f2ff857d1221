//! Domain crawl engine
//!
//! Drives the frontier of a single host:
//! - Loads prior visited/hash sets before seeding the frontier
//! - Pulls batches of unvisited, allowed URLs and fetches them concurrently
//! - Stores one page per new content hash and expands same-host links
//! - Checkpoints after every batch and marks the domain complete at the end

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{fetch_page, PageRenderer};
use crate::robots::{load_gate, PolitenessGate};
use crate::state::{CrawlPhase, DomainCrawlState, FetchedPage, FrontierEntry};
use crate::storage::{DomainPersistence, StorageOutcome, StoreSet};
use crate::url::{canonicalize, host_of, seed_url, should_skip};
use crate::Result;
use futures::future::join_all;
use rand::Rng;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for domain crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Cap on visited URLs per domain
    pub max_pages: u32,

    /// Links are followed from pages shallower than this
    pub max_depth: u32,

    /// Pages fetched concurrently within one batch
    pub concurrency: usize,

    /// Domains crawled concurrently by the scheduler
    pub max_parallel_domains: usize,

    /// Skip domains already marked complete
    pub skip_crawled: bool,

    /// Run a second pass when the first one stored nothing new
    pub retry_on_zero: bool,

    /// Lower bound of the randomized pause between batches
    pub delay_min: Duration,

    /// Upper bound of the randomized pause between batches
    pub delay_max: Duration,

    /// Agent token matched against robots.txt groups
    pub robots_agent: String,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::new(&CrawlerConfig::default(), "*")
    }
}

impl CrawlOptions {
    /// Builds crawl options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let agent = config.user_agent.crawler_name.trim();
        Self::new(&config.crawler, if agent.is_empty() { "*" } else { agent })
    }

    pub fn new(crawler: &CrawlerConfig, robots_agent: &str) -> Self {
        Self {
            max_pages: crawler.max_pages,
            max_depth: crawler.max_depth,
            concurrency: crawler.concurrency.max(1) as usize,
            max_parallel_domains: crawler.max_parallel_domains.max(1) as usize,
            skip_crawled: crawler.skip_crawled,
            retry_on_zero: crawler.retry_on_zero,
            delay_min: Duration::from_millis(crawler.politeness_delay_min_ms),
            delay_max: Duration::from_millis(crawler.politeness_delay_max_ms),
            robots_agent: robots_agent.to_string(),
        }
    }

    /// Picks the pause before the next batch
    fn politeness_delay(&self) -> Duration {
        if self.delay_max <= self.delay_min {
            return self.delay_min;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(self.delay_min..=self.delay_max)
    }
}

/// Outcome of one domain crawl as reported to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainResult {
    pub domain: String,

    /// Unique pages stored for the domain, including earlier runs
    pub pages_crawled: u32,

    pub urls_visited: usize,

    /// Pages stored by this run
    pub new_pages: u32,

    pub success: bool,

    pub error: Option<String>,
}

impl DomainResult {
    /// A failed crawl that never produced state
    pub fn failed(domain: impl Into<String>, error: impl ToString) -> Self {
        Self {
            domain: domain.into(),
            pages_crawled: 0,
            urls_visited: 0,
            new_pages: 0,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Counters for one pass of the batch loop
#[derive(Debug, Default, Clone, Copy)]
struct PassStats {
    batches: usize,
    fetched: usize,
    new_pages: u32,
}

/// Crawls one domain at a time against a shared set of stores
#[derive(Clone)]
pub struct DomainCrawler {
    stores: StoreSet,
    renderer: Arc<dyn PageRenderer>,
    client: Client,
    options: CrawlOptions,
}

impl DomainCrawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `stores` - Primary and fallback state stores
    /// * `renderer` - Fetches and renders pages
    /// * `client` - HTTP client used for robots.txt
    /// * `options` - Crawl limits and politeness settings
    pub fn new(
        stores: StoreSet,
        renderer: Arc<dyn PageRenderer>,
        client: Client,
        options: CrawlOptions,
    ) -> Self {
        Self {
            stores,
            renderer,
            client,
            options,
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    /// Crawls a domain or seed URL until the frontier is exhausted or the
    /// page cap is reached
    ///
    /// # Errors
    ///
    /// Only fails when no state store can be read for the domain. Fetch
    /// failures and store degradation are absorbed.
    pub async fn crawl(&self, domain_or_url: &str) -> Result<DomainResult> {
        let base_url = seed_url(domain_or_url);
        let host = host_of(&base_url);
        let mut phase = CrawlPhase::Init;

        advance(&mut phase, CrawlPhase::LoadingState, &host);
        let mut persistence = self.stores.for_domain(&host);
        let mut state = persistence.load().await?;

        if state.is_complete {
            info!(domain = %host, pages = state.pages_crawled(), "Domain already complete, nothing to crawl");
            return Ok(result_for(&state, 0));
        }

        let mut frontier = VecDeque::new();
        let seed = canonicalize(&base_url);
        if !state.is_visited(&seed) {
            frontier.push_back(FrontierEntry::new(seed, 0));
        } else {
            self.restore_frontier(&state, &mut frontier).await;
        }

        let gate = load_gate(&self.client, &base_url, &self.options.robots_agent).await;
        if gate.is_permissive() {
            debug!(domain = %host, "No robots.txt restrictions");
        }

        advance(&mut phase, CrawlPhase::Crawling, &host);
        info!(
            domain = %host,
            visited = state.urls_visited(),
            pages = state.pages_crawled(),
            "Starting domain crawl"
        );

        let attempts = if self.options.retry_on_zero { 2 } else { 1 };
        let mut new_pages = 0;
        for attempt in 1..=attempts {
            let stats = self
                .run_pass(&mut state, &mut frontier, &gate, &mut persistence)
                .await;
            new_pages += stats.new_pages;

            debug!(
                domain = %host,
                attempt = attempt,
                batches = stats.batches,
                fetched = stats.fetched,
                new_pages = stats.new_pages,
                "Crawl pass finished"
            );

            if stats.new_pages > 0 || frontier.is_empty() {
                break;
            }
            // A pass only stops early at the page cap; another one would fetch nothing
            if state.urls_visited() >= self.options.max_pages as usize {
                warn!(
                    domain = %host,
                    visited = state.urls_visited(),
                    remaining = frontier.len(),
                    "No new pages found and page cap reached, skipping retry pass"
                );
                break;
            }
            if attempt < attempts {
                warn!(domain = %host, "No new pages found, retrying remaining frontier");
            }
        }

        // Final checkpoint, then completion
        persistence.checkpoint(&state).await;
        let outcome = persistence.mark_complete(&state).await;
        if outcome == StorageOutcome::Lost {
            warn!(domain = %host, "Completion could not be recorded in any store");
        }
        state.is_complete = true;
        advance(&mut phase, CrawlPhase::Complete, &host);

        info!(
            domain = %host,
            pages = state.pages_crawled(),
            new_pages = new_pages,
            visited = state.urls_visited(),
            "Domain crawl complete"
        );

        Ok(result_for(&state, new_pages))
    }

    /// Re-queues unvisited links of already stored pages
    ///
    /// An interrupted crawl loses its in-memory frontier; the outbound links
    /// kept with each stored page are enough to pick up where it stopped.
    async fn restore_frontier(&self, state: &DomainCrawlState, frontier: &mut VecDeque<FrontierEntry>) {
        let limit = self.options.max_pages as usize;
        let pages = match self.stores.get_pages(&state.domain, limit).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(domain = %state.domain, error = %e, "Cannot read stored pages, frontier not restored");
                return;
            }
        };

        let mut queued = std::collections::HashSet::new();
        for page in pages.iter().filter(|p| p.depth < self.options.max_depth) {
            for link in &page.outbound_links {
                let next = canonicalize(link);
                if host_of(&next) == state.domain && !state.is_visited(&next) && queued.insert(next.clone()) {
                    frontier.push_back(FrontierEntry::new(next, page.depth + 1));
                }
            }
        }

        if !frontier.is_empty() {
            info!(domain = %state.domain, restored = frontier.len(), "Resuming interrupted crawl");
        }
    }

    /// Runs the batch loop until the frontier drains or the cap is hit
    async fn run_pass(
        &self,
        state: &mut DomainCrawlState,
        frontier: &mut VecDeque<FrontierEntry>,
        gate: &PolitenessGate,
        persistence: &mut DomainPersistence,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let max_pages = self.options.max_pages as usize;

        while !frontier.is_empty() && state.urls_visited() < max_pages {
            let batch = self.pull_batch(state, frontier, gate);
            if batch.is_empty() {
                continue;
            }
            stats.batches += 1;

            let fetches = batch
                .iter()
                .map(|entry| fetch_page(self.renderer.as_ref(), &entry.url, entry.depth));
            let pages = join_all(fetches).await;

            for page in pages.into_iter().flatten() {
                stats.fetched += 1;
                if self.absorb_page(state, frontier, persistence, page).await {
                    stats.new_pages += 1;
                }
            }

            let outcome = persistence.checkpoint(state).await;
            debug!(
                domain = %state.domain,
                batch = stats.batches,
                size = batch.len(),
                visited = state.urls_visited(),
                pages = state.pages_crawled(),
                outcome = ?outcome,
                "Batch checkpointed"
            );

            if !frontier.is_empty() && state.urls_visited() < max_pages {
                tokio::time::sleep(self.options.politeness_delay()).await;
            }
        }

        stats
    }

    /// Takes up to `concurrency` fetchable URLs off the frontier
    ///
    /// Every pulled URL is marked visited before it is fetched so a
    /// permanently failing URL is attempted once.
    fn pull_batch(
        &self,
        state: &mut DomainCrawlState,
        frontier: &mut VecDeque<FrontierEntry>,
        gate: &PolitenessGate,
    ) -> Vec<FrontierEntry> {
        let max_pages = self.options.max_pages as usize;
        let mut batch = Vec::with_capacity(self.options.concurrency);

        while batch.len() < self.options.concurrency && state.urls_visited() < max_pages {
            let Some(entry) = frontier.pop_front() else {
                break;
            };
            let url = canonicalize(&entry.url);
            if state.is_visited(&url) || should_skip(&url) {
                continue;
            }
            if !gate.can_fetch(&url) {
                debug!(url = %url, "Disallowed by robots.txt");
                continue;
            }

            state.mark_visited(url.clone());
            batch.push(FrontierEntry::new(url, entry.depth));
        }

        batch
    }

    /// Records a fetched page and expands its links
    ///
    /// Returns true when the page had unseen content and was stored.
    async fn absorb_page(
        &self,
        state: &mut DomainCrawlState,
        frontier: &mut VecDeque<FrontierEntry>,
        persistence: &mut DomainPersistence,
        page: FetchedPage,
    ) -> bool {
        let depth = page.depth;
        let links = page.links.clone();

        let is_new = state.record_hash(page.content_hash.clone());
        if is_new {
            let stored = page.into_crawled(&state.domain);
            if persistence.save_page(&stored).await == StorageOutcome::Lost {
                warn!(domain = %state.domain, url = %stored.url, "Page could not be stored");
            }
        } else {
            debug!(url = %page.url, "Duplicate content, not stored");
        }

        if depth < self.options.max_depth {
            for link in links {
                let next = canonicalize(&link);
                if host_of(&next) != state.domain || state.is_visited(&next) || should_skip(&next) {
                    continue;
                }
                frontier.push_back(FrontierEntry::new(next, depth + 1));
            }
        }

        is_new
    }
}

fn advance(phase: &mut CrawlPhase, next: CrawlPhase, domain: &str) {
    if phase.can_advance_to(next) {
        debug!(domain = %domain, from = %phase, to = %next, "Crawl phase change");
        *phase = next;
    }
}

fn result_for(state: &DomainCrawlState, new_pages: u32) -> DomainResult {
    DomainResult {
        domain: state.domain.clone(),
        pages_crawled: state.pages_crawled(),
        urls_visited: state.urls_visited(),
        new_pages,
        success: true,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use crate::crawler::parser::{RenderConfig, RenderedPage};
    use crate::storage::{FileStore, StateStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages and records every URL it was asked for
    struct FakeSite {
        pages: HashMap<String, RenderedPage>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, url: &str, text: &str, links: &[&str]) -> Self {
            self.pages.insert(
                url.to_string(),
                RenderedPage {
                    title: url.to_string(),
                    text: text.to_string(),
                    links: links.iter().map(|l| l.to_string()).collect(),
                },
            );
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeSite {
        async fn render(&self, url: &str, _config: &RenderConfig) -> std::result::Result<RenderedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn options(max_pages: u32, max_depth: u32) -> CrawlOptions {
        CrawlOptions {
            max_pages,
            max_depth,
            concurrency: 2,
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            ..CrawlOptions::default()
        }
    }

    /// Crawler whose robots.txt requests fail fast (allow all)
    fn crawler(dir: &std::path::Path, site: Arc<FakeSite>, options: CrawlOptions) -> (DomainCrawler, Arc<FileStore>) {
        let store = Arc::new(FileStore::new(dir).unwrap());
        let stores = StoreSet::new(None, store.clone());
        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        (DomainCrawler::new(stores, site, client, options), store)
    }

    #[test]
    fn test_options_from_config() {
        let options = CrawlOptions::default();
        assert_eq!(options.max_pages, 2000);
        assert_eq!(options.max_depth, 3);
        assert_eq!(options.concurrency, 5);
        assert_eq!(options.delay_min, Duration::from_millis(200));
        assert_eq!(options.delay_max, Duration::from_millis(500));
    }

    #[test]
    fn test_politeness_delay_in_range() {
        let options = CrawlOptions::default();
        for _ in 0..20 {
            let delay = options.politeness_delay();
            assert!(delay >= options.delay_min && delay <= options.delay_max);
        }
    }

    #[tokio::test]
    async fn test_links_followed_up_to_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(
            FakeSite::new()
                .page("http://127.0.0.1:1", "Home", &["http://127.0.0.1:1/a"])
                .page("http://127.0.0.1:1/a", "Page A", &["http://127.0.0.1:1/b"])
                .page("http://127.0.0.1:1/b", "Page B", &[]),
        );
        let (crawler, store) = crawler(dir.path(), site.clone(), options(100, 1));

        let result = crawler.crawl("http://127.0.0.1:1/").await.unwrap();

        assert!(result.success);
        assert_eq!(result.pages_crawled, 2);
        assert_eq!(result.urls_visited, 2);
        assert!(!site.requests().contains(&"http://127.0.0.1:1/b".to_string()));
        assert!(store.status("127.0.0.1:1").await.unwrap().fully_crawled);
    }

    #[tokio::test]
    async fn test_failed_urls_are_attempted_once() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(FakeSite::new().page(
            "http://127.0.0.1:1",
            "Home",
            &["http://127.0.0.1:1/dead", "http://127.0.0.1:1/dead/"],
        ));
        let (crawler, _store) = crawler(dir.path(), site.clone(), options(100, 3));

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        let dead = site
            .requests()
            .iter()
            .filter(|u| u.ends_with("/dead"))
            .count();
        assert_eq!(dead, 1);
        assert_eq!(result.pages_crawled, 1);
        assert_eq!(result.urls_visited, 2);
    }

    #[tokio::test]
    async fn test_page_cap_bounds_fetch_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let links: Vec<String> = (0..10).map(|i| format!("http://127.0.0.1:1/p{i}")).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let site = Arc::new(FakeSite::new().page("http://127.0.0.1:1", "Home", &link_refs));
        let mut opts = options(4, 3);
        opts.retry_on_zero = true;
        let (crawler, _store) = crawler(dir.path(), site.clone(), opts);

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(result.urls_visited, 4);
        assert_eq!(site.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_denied_extensions_never_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(FakeSite::new().page(
            "http://127.0.0.1:1",
            "Home",
            &["http://127.0.0.1:1/catalog.pdf", "http://127.0.0.1:1/logo.png"],
        ));
        let (crawler, _store) = crawler(dir.path(), site.clone(), options(100, 3));

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(site.requests(), vec!["http://127.0.0.1:1"]);
        assert_eq!(result.urls_visited, 1);
    }

    #[tokio::test]
    async fn test_completed_domain_is_not_recrawled() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(FakeSite::new().page("http://127.0.0.1:1", "Home", &[]));
        let (crawler, _store) = crawler(dir.path(), site.clone(), options(100, 3));

        crawler.crawl("http://127.0.0.1:1").await.unwrap();
        let second = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(site.requests().len(), 1);
        assert_eq!(second.new_pages, 0);
        assert_eq!(second.pages_crawled, 1);
    }

    #[tokio::test]
    async fn test_interrupted_crawl_resumes_from_stored_links() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(
            FakeSite::new()
                .page("http://127.0.0.1:1", "Home", &["http://127.0.0.1:1/a", "http://127.0.0.1:1/b"])
                .page("http://127.0.0.1:1/a", "Page A", &[])
                .page("http://127.0.0.1:1/b", "Page B", &[]),
        );
        let (crawler, store) = crawler(dir.path(), site.clone(), options(100, 3));

        // Simulate a crash after the seed batch was checkpointed
        let home = FetchedPage::from_render(
            "http://127.0.0.1:1",
            "Home",
            "Home",
            0,
            vec!["http://127.0.0.1:1/a".to_string(), "http://127.0.0.1:1/b".to_string()],
        )
        .unwrap();
        let hash = home.content_hash.clone();
        store.save_page(&home.into_crawled("127.0.0.1:1")).await.unwrap();
        store
            .checkpoint(
                "127.0.0.1:1",
                &["http://127.0.0.1:1".to_string(), "http://127.0.0.1:1/a".to_string()],
                &[hash],
                false,
                1,
            )
            .await
            .unwrap();

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(site.requests(), vec!["http://127.0.0.1:1/b"]);
        assert_eq!(result.pages_crawled, 2);
        assert_eq!(result.urls_visited, 3);
    }

    #[tokio::test]
    async fn test_zero_yield_at_page_cap_does_not_retry() {
        let dir = tempfile::tempdir().unwrap();
        let links: Vec<String> = (0..6).map(|i| format!("http://127.0.0.1:1/gone{i}")).collect();
        let site = Arc::new(FakeSite::new());
        let mut opts = options(3, 3);
        opts.retry_on_zero = true;
        let (crawler, store) = crawler(dir.path(), site.clone(), opts);

        // Seed already stored; every link it points at is dead
        let home = FetchedPage::from_render("http://127.0.0.1:1", "Home", "Home", 0, links).unwrap();
        let hash = home.content_hash.clone();
        store.save_page(&home.into_crawled("127.0.0.1:1")).await.unwrap();
        store
            .checkpoint("127.0.0.1:1", &["http://127.0.0.1:1".to_string()], &[hash], false, 1)
            .await
            .unwrap();

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(site.requests().len(), 2);
        assert_eq!(result.urls_visited, 3);
        assert_eq!(result.new_pages, 0);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_dead_seed_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(FakeSite::new());
        let mut opts = options(100, 3);
        opts.retry_on_zero = true;
        let (crawler, _store) = crawler(dir.path(), site.clone(), opts);

        let result = crawler.crawl("http://127.0.0.1:1").await.unwrap();

        assert_eq!(site.requests().len(), 1);
        assert_eq!(result.pages_crawled, 0);
        assert!(result.success);
    }
}
