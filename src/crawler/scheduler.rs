//! Multi-domain scheduler
//!
//! This module handles:
//! - Skipping domains whose crawl is already complete
//! - A bounded pool of workers pulling domains from a shared queue
//! - Per-domain failure isolation and result aggregation

use crate::crawler::engine::{DomainCrawler, DomainResult};
use crate::url::{host_of, seed_url};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Aggregate outcome of a multi-domain crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Domains requested
    pub total_domains: usize,

    /// Domains crawled successfully by this run
    pub crawled_domains: usize,

    /// Domains skipped because they were already complete
    pub skipped_domains: usize,

    /// Domains whose crawl failed
    pub failed_domains: usize,

    /// Unique pages stored across crawled domains
    pub total_pages: u64,

    /// One entry per crawled or failed domain, in completion order
    pub results: Vec<DomainResult>,
}

impl CrawlSummary {
    fn from_results(total_domains: usize, skipped_domains: usize, results: Vec<DomainResult>) -> Self {
        let crawled_domains = results.iter().filter(|r| r.success).count();
        Self {
            total_domains,
            crawled_domains,
            skipped_domains,
            failed_domains: results.len() - crawled_domains,
            total_pages: results.iter().map(|r| u64::from(r.pages_crawled)).sum(),
            results,
        }
    }
}

/// Items on the shared domain queue
#[derive(Debug)]
enum WorkItem {
    Domain(String),
    /// Tells one worker to exit
    Stop,
}

type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>;

/// Crawls a list of domains with at most `max_parallel_domains` in flight
///
/// # Arguments
///
/// * `crawler` - Domain crawler carrying stores, renderer and options
/// * `domains` - Bare domains or seed URLs
///
/// # Returns
///
/// The aggregated summary. Failures of single domains are recorded in the
/// result list and never abort the pool.
pub async fn crawl_domains(crawler: &DomainCrawler, domains: &[String]) -> CrawlSummary {
    let to_crawl = if crawler.options().skip_crawled {
        pending_domains(crawler, domains).await
    } else {
        domains.to_vec()
    };
    let skipped = domains.len() - to_crawl.len();
    if skipped > 0 {
        info!(skipped = skipped, remaining = to_crawl.len(), "Skipping already-crawled domains");
    }

    if to_crawl.is_empty() {
        return CrawlSummary::from_results(domains.len(), skipped, Vec::new());
    }

    let worker_count = crawler.options().max_parallel_domains.min(to_crawl.len()).max(1);
    let (tx, rx) = mpsc::unbounded_channel();
    for domain in &to_crawl {
        // The receiver is alive until the workers are joined
        let _ = tx.send(WorkItem::Domain(domain.clone()));
    }
    for _ in 0..worker_count {
        let _ = tx.send(WorkItem::Stop);
    }
    drop(tx);

    info!(domains = to_crawl.len(), workers = worker_count, "Starting domain crawls");

    let queue: SharedQueue = Arc::new(Mutex::new(rx));
    let total = to_crawl.len();
    let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let handles: Vec<_> = (0..worker_count)
        .map(|id| {
            let crawler = crawler.clone();
            let queue = queue.clone();
            let finished = finished.clone();
            tokio::spawn(async move { run_worker(id, crawler, queue, finished, total).await })
        })
        .collect();

    let mut results = Vec::with_capacity(total);
    for handle in handles {
        match handle.await {
            Ok(mut worker_results) => results.append(&mut worker_results),
            Err(e) => error!(error = %e, "Crawl worker aborted"),
        }
    }

    let summary = CrawlSummary::from_results(domains.len(), skipped, results);
    info!(
        crawled = summary.crawled_domains,
        failed = summary.failed_domains,
        skipped = summary.skipped_domains,
        pages = summary.total_pages,
        "All domain crawls finished"
    );
    summary
}

/// Filters out domains already marked complete
///
/// A status lookup failure keeps the domain in the list.
async fn pending_domains(crawler: &DomainCrawler, domains: &[String]) -> Vec<String> {
    let mut pending = Vec::with_capacity(domains.len());
    for domain in domains {
        let host = host_of(&seed_url(domain));
        match crawler.stores().status(&host).await {
            Ok(status) if status.fully_crawled => {
                debug!(domain = %host, pages = status.pages, "Already crawled");
            }
            Ok(_) => pending.push(domain.clone()),
            Err(e) => {
                warn!(domain = %host, error = %e, "Status lookup failed, crawling anyway");
                pending.push(domain.clone());
            }
        }
    }
    pending
}

async fn run_worker(
    id: usize,
    crawler: DomainCrawler,
    queue: SharedQueue,
    finished: Arc<std::sync::atomic::AtomicUsize>,
    total: usize,
) -> Vec<DomainResult> {
    let mut results = Vec::new();

    loop {
        let item = { queue.lock().await.recv().await };
        let domain = match item {
            Some(WorkItem::Domain(domain)) => domain,
            Some(WorkItem::Stop) | None => break,
        };

        let result = match crawler.crawl(&domain).await {
            Ok(result) => result,
            Err(e) => {
                error!(worker = id, domain = %domain, error = %e, "Domain crawl failed");
                DomainResult::failed(host_of(&seed_url(&domain)), e)
            }
        };

        let done = finished.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        info!(
            worker = id,
            domain = %result.domain,
            pages = result.pages_crawled,
            success = result.success,
            progress = %format!("{}/{}", done, total),
            "Domain finished"
        );
        results.push(result);
    }

    debug!(worker = id, "Worker stopped");
    results
}
