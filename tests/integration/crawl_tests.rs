//! Integration tests for domain crawls
//!
//! These tests use wiremock to serve small sites and run the full crawl
//! cycle end-to-end against the file and SQLite stores.

use async_trait::async_trait;
use lead_crawler::config::UserAgentConfig;
use lead_crawler::crawler::{build_http_client, crawl_domains, CrawlOptions, DomainCrawler, HttpRenderer};
use lead_crawler::state::{CrawledPage, DomainCrawlState, FetchedPage};
use lead_crawler::storage::{
    DomainStatus, FileStore, SqliteStore, StateStore, StorageError, StorageResult, StoreSet,
};
use lead_crawler::host_of;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "LeadCrawlerTest".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/bot".to_string(),
        contact_email: "bot@example.com".to_string(),
    }
}

fn options(max_pages: u32, max_depth: u32) -> CrawlOptions {
    CrawlOptions {
        max_pages,
        max_depth,
        concurrency: 3,
        max_parallel_domains: 2,
        retry_on_zero: false,
        delay_min: Duration::ZERO,
        delay_max: Duration::ZERO,
        robots_agent: "LeadCrawlerTest".to_string(),
        ..CrawlOptions::default()
    }
}

fn crawler(stores: StoreSet, options: CrawlOptions) -> DomainCrawler {
    let client = build_http_client(&user_agent(), 5).unwrap();
    let renderer = Arc::new(HttpRenderer::new(client.clone()));
    DomainCrawler::new(stores, renderer, client, options)
}

fn file_stores(dir: &TempDir) -> (StoreSet, Arc<FileStore>) {
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    (StoreSet::new(None, store.clone()), store)
}

fn html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a> ", href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><main><h1>{}</h1><p>{}</p><p>{}</p></main></body></html>",
        title, title, body, anchors
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// State store that fails every call
struct DownStore;

#[async_trait]
impl StateStore for DownStore {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn load(&self, _domain: &str) -> StorageResult<DomainCrawlState> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn checkpoint(
        &self,
        _domain: &str,
        _visited: &[String],
        _hashes: &[String],
        _complete: bool,
        _pages_crawled: u32,
    ) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn mark_complete(&self, _domain: &str, _visited: usize, _hashes: usize) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn save_page(&self, _page: &CrawledPage) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn get_pages(&self, _domain: &str, _limit: usize) -> StorageResult<Vec<CrawledPage>> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn status(&self, _domain: &str) -> StorageResult<DomainStatus> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn reset(&self, _domain: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

/// File store that cannot load one particular domain
struct RejectingStore {
    inner: FileStore,
    rejected: String,
}

impl RejectingStore {
    fn check(&self, domain: &str) -> StorageResult<()> {
        if domain == self.rejected {
            Err(StorageError::Unavailable(format!("{} is locked", domain)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    async fn load(&self, domain: &str) -> StorageResult<DomainCrawlState> {
        self.check(domain)?;
        self.inner.load(domain).await
    }

    async fn checkpoint(
        &self,
        domain: &str,
        visited: &[String],
        hashes: &[String],
        complete: bool,
        pages_crawled: u32,
    ) -> StorageResult<()> {
        self.inner.checkpoint(domain, visited, hashes, complete, pages_crawled).await
    }

    async fn mark_complete(&self, domain: &str, visited: usize, hashes: usize) -> StorageResult<()> {
        self.inner.mark_complete(domain, visited, hashes).await
    }

    async fn save_page(&self, page: &CrawledPage) -> StorageResult<()> {
        self.inner.save_page(page).await
    }

    async fn get_pages(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        self.inner.get_pages(domain, limit).await
    }

    async fn status(&self, domain: &str) -> StorageResult<DomainStatus> {
        self.inner.status(domain).await
    }

    async fn reset(&self, domain: &str) -> StorageResult<()> {
        self.inner.reset(domain).await
    }
}

#[tokio::test]
async fn test_single_page_site_completes() {
    let server = MockServer::start().await;
    serve(&server, "/", html("Acme", "We build industrial pumps.", &[])).await;

    let dir = TempDir::new().unwrap();
    let (stores, store) = file_stores(&dir);
    let crawler = crawler(stores, options(1, 3));

    let result = crawler.crawl(&server.uri()).await.unwrap();
    let host = host_of(&server.uri());

    assert!(result.success);
    assert_eq!(result.domain, host);
    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.urls_visited, 1);

    let status = store.status(&host).await.unwrap();
    assert!(status.fully_crawled);
    assert_eq!(status.pages, 1);

    let pages = store.get_pages(&host, 10).await.unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].content.contains("industrial pumps"));
}

#[tokio::test]
async fn test_identical_content_stored_once() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        html("Home", "Welcome to Acme.", &["/catalog?page=1", "/catalog?page=2"]),
    )
    .await;
    // Both query variants render the same catalog
    serve(&server, "/catalog", html("Catalog", "Pumps and valves.", &[])).await;

    let dir = TempDir::new().unwrap();
    let (stores, store) = file_stores(&dir);
    let crawler = crawler(stores, options(100, 3));

    let result = crawler.crawl(&server.uri()).await.unwrap();
    let host = host_of(&server.uri());

    assert_eq!(result.urls_visited, 3);
    assert_eq!(result.pages_crawled, 2);
    assert_eq!(store.get_pages(&host, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_without_refetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("Home", "Home page.", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/team"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("Team", "Our team.", &[]), "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (stores, store) = file_stores(&dir);
    let host = host_of(&server.uri());
    let seed = server.uri();

    // A previous run stored the seed page and checkpointed, then died
    let page = FetchedPage::from_render(
        seed.clone(),
        "Home",
        "Home page.",
        0,
        vec![format!("{}/team", seed)],
    )
    .unwrap()
    .into_crawled(&host);
    store.save_page(&page).await.unwrap();
    store
        .checkpoint(&host, &[seed.clone()], &[page.content_hash.clone()], false, 1)
        .await
        .unwrap();
    assert!(store.status(&host).await.unwrap().in_progress);

    let result = crawler(stores, options(100, 3)).crawl(&seed).await.unwrap();

    assert_eq!(result.pages_crawled, 2);
    assert_eq!(result.new_pages, 1);
    assert_eq!(result.urls_visited, 2);
    assert!(store.status(&host).await.unwrap().fully_crawled);
}

#[tokio::test]
async fn test_resume_trusts_fallback_that_got_ahead_of_primary() {
    let server = MockServer::start().await;
    for (route, expected) in [("/", 0), ("/a", 0), ("/b", 1)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html(route, "Some page.", &[]), "text/html"))
            .expect(expected)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let primary = Arc::new(SqliteStore::new_in_memory().unwrap());
    let fallback = Arc::new(FileStore::new(dir.path()).unwrap());
    let host = host_of(&server.uri());
    let seed = server.uri();
    let about = format!("{}/a", seed);

    let home = FetchedPage::from_render(seed.clone(), "Home", "Home page.", 0, vec![about.clone()])
        .unwrap()
        .into_crawled(&host);
    let about_page = FetchedPage::from_render(about.clone(), "A", "Page a.", 1, vec![format!("{}/b", seed)])
        .unwrap()
        .into_crawled(&host);

    // The primary went away after the first page; the fallback kept going
    primary.save_page(&home).await.unwrap();
    primary
        .checkpoint(&host, &[seed.clone()], &[home.content_hash.clone()], false, 1)
        .await
        .unwrap();
    fallback.save_page(&home).await.unwrap();
    fallback.save_page(&about_page).await.unwrap();
    fallback
        .checkpoint(
            &host,
            &[seed.clone(), about.clone()],
            &[home.content_hash.clone(), about_page.content_hash.clone()],
            false,
            2,
        )
        .await
        .unwrap();

    let stores = StoreSet::new(Some(primary.clone()), fallback);
    let result = crawler(stores, options(100, 3)).crawl(&seed).await.unwrap();

    assert_eq!(result.new_pages, 1);
    assert_eq!(result.pages_crawled, 3);
    assert_eq!(result.urls_visited, 3);
    assert!(primary.status(&host).await.unwrap().fully_crawled);
}

#[tokio::test]
async fn test_primary_outage_falls_back_to_files() {
    let server = MockServer::start().await;
    serve(&server, "/", html("Home", "Home page.", &["/about"])).await;
    serve(&server, "/about", html("About", "Family business since 1952.", &[])).await;

    let dir = TempDir::new().unwrap();
    let fallback = Arc::new(FileStore::new(dir.path()).unwrap());
    let stores = StoreSet::new(Some(Arc::new(DownStore)), fallback.clone());
    let crawler = crawler(stores, options(100, 3));

    let result = crawler.crawl(&server.uri()).await.unwrap();
    let host = host_of(&server.uri());

    assert!(result.success);
    assert_eq!(result.pages_crawled, 2);
    assert!(fallback.status(&host).await.unwrap().fully_crawled);
    assert_eq!(fallback.get_pages(&host, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .mount(&server)
        .await;
    serve(&server, "/", html("Home", "Home page.", &["/private/plans", "/public"])).await;
    serve(&server, "/public", html("Public", "Public brochure.", &[])).await;
    Mock::given(method("GET"))
        .and(path("/private/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("Plans", "Secret.", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (stores, _store) = file_stores(&dir);
    let result = crawler(stores, options(100, 3)).crawl(&server.uri()).await.unwrap();

    assert_eq!(result.pages_crawled, 2);
    assert_eq!(result.urls_visited, 2);
}

#[tokio::test]
async fn test_scheduler_isolates_failing_domain_and_skips_complete_ones() {
    let first = MockServer::start().await;
    serve(&first, "/", html("First", "First company.", &[])).await;
    let second = MockServer::start().await;
    serve(&second, "/", html("Second", "Second company.", &["/products"])).await;
    serve(&second, "/products", html("Products", "Valves.", &[])).await;

    let dir = TempDir::new().unwrap();
    let store = RejectingStore {
        inner: FileStore::new(dir.path()).unwrap(),
        rejected: "locked.example".to_string(),
    };
    let stores = StoreSet::new(None, Arc::new(store));
    let crawler = crawler(stores, options(100, 3));

    let domains = vec![first.uri(), "locked.example".to_string(), second.uri()];
    let summary = crawl_domains(&crawler, &domains).await;

    assert_eq!(summary.total_domains, 3);
    assert_eq!(summary.crawled_domains, 2);
    assert_eq!(summary.failed_domains, 1);
    assert_eq!(summary.skipped_domains, 0);
    assert_eq!(summary.total_pages, 3);
    let failed = summary.results.iter().find(|r| !r.success).unwrap();
    assert_eq!(failed.domain, "locked.example");
    assert!(failed.error.is_some());

    // A second run skips the two completed domains
    let again = crawl_domains(&crawler, &domains).await;
    assert_eq!(again.skipped_domains, 2);
    assert_eq!(again.failed_domains, 1);
    assert_eq!(again.crawled_domains, 0);
}
