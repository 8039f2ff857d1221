//! Local-file fallback store
//!
//! Layout under the configured directory:
//!
//! ```text
//! crawl_state/<host>_visited.txt    one canonical URL per line
//! crawl_state/<host>_hashes.txt     one content hash per line
//! crawl_state/<host>_complete.txt   completion marker
//! domains/<host>.jsonl.gz           appended gzip members, one page per line
//! extracted/<host>_profile.json
//! extracted/<host>_products.json
//! ```
//!
//! Set files are replaced atomically (write to a temp file, then rename).

use crate::extract::{CompanyProfile, Product};
use crate::state::{CrawledPage, DomainCrawlState};
use crate::storage::traits::{DomainStatus, EntityStore, StateStore, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed crawl state store
pub struct FileStore {
    root: PathBuf,
    // Serializes appends to the page archives
    append_lock: Mutex<()>,
}

impl FileStore {
    /// Creates the store, making its directories if needed
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("crawl_state"))?;
        fs::create_dir_all(root.join("domains"))?;
        fs::create_dir_all(root.join("extracted"))?;
        Ok(Self {
            root,
            append_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_file(&self, domain: &str, suffix: &str) -> PathBuf {
        self.root
            .join("crawl_state")
            .join(format!("{}_{}.txt", file_key(domain), suffix))
    }

    fn pages_file(&self, domain: &str) -> PathBuf {
        self.root
            .join("domains")
            .join(format!("{}.jsonl.gz", file_key(domain)))
    }

    fn entity_file(&self, domain: &str, kind: &str) -> PathBuf {
        self.root
            .join("extracted")
            .join(format!("{}_{}.json", file_key(domain), kind))
    }

    fn is_complete(&self, domain: &str) -> bool {
        self.state_file(domain, "complete").exists()
    }

    fn read_pages(&self, domain: &str) -> StorageResult<Vec<CrawledPage>> {
        let file = match File::open(self.pages_file(domain)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(MultiGzDecoder::new(file));
        let mut seen = HashSet::new();
        let mut pages = Vec::new();

        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                // A torn final member from a crash ends the readable archive
                Err(e) => {
                    tracing::warn!(domain = %domain, error = %e, "Truncated page archive");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CrawledPage>(&line) {
                Ok(page) => {
                    if seen.insert(page.content_hash.clone()) {
                        pages.push(page);
                    }
                }
                Err(e) => tracing::debug!(domain = %domain, error = %e, "Skipping bad archive line"),
            }
        }

        Ok(pages)
    }
}

/// File-name form of a host (`:` is not portable)
fn file_key(domain: &str) -> String {
    domain.replace(':', "_")
}

fn read_lines(path: &Path) -> StorageResult<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl StateStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, domain: &str) -> StorageResult<DomainCrawlState> {
        let visited = read_lines(&self.state_file(domain, "visited"))?;
        let hashes = read_lines(&self.state_file(domain, "hashes"))?;
        let mut state = DomainCrawlState::from_parts(domain, visited, hashes);
        state.is_complete = self.is_complete(domain);
        Ok(state)
    }

    async fn checkpoint(
        &self,
        domain: &str,
        visited: &[String],
        hashes: &[String],
        complete: bool,
        _pages_crawled: u32,
    ) -> StorageResult<()> {
        if self.is_complete(domain) {
            return Ok(());
        }

        write_atomic(
            &self.state_file(domain, "visited"),
            visited.join("\n").as_bytes(),
        )?;
        write_atomic(
            &self.state_file(domain, "hashes"),
            hashes.join("\n").as_bytes(),
        )?;

        if complete {
            self.mark_complete(domain, visited.len(), hashes.len()).await?;
        }
        Ok(())
    }

    async fn mark_complete(
        &self,
        domain: &str,
        visited_count: usize,
        hash_count: usize,
    ) -> StorageResult<()> {
        let marker = format!(
            "completed_at={}\nvisited={}\nunique_pages={}\n",
            Utc::now().to_rfc3339(),
            visited_count,
            hash_count
        );
        write_atomic(&self.state_file(domain, "complete"), marker.as_bytes())
    }

    async fn save_page(&self, page: &CrawledPage) -> StorageResult<()> {
        let mut line = serde_json::to_string(page)?;
        line.push('\n');

        let _guard = self
            .append_lock
            .lock()
            .map_err(|e| crate::storage::StorageError::Poisoned(e.to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.pages_file(&page.domain))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(line.as_bytes())?;
        encoder.finish()?.sync_data()?;
        Ok(())
    }

    async fn get_pages(&self, domain: &str, limit: usize) -> StorageResult<Vec<CrawledPage>> {
        let mut pages = self.read_pages(domain)?;
        // Stable sort keeps archive order within a depth
        pages.sort_by_key(|page| page.depth);
        pages.truncate(limit);
        Ok(pages)
    }

    async fn status(&self, domain: &str) -> StorageResult<DomainStatus> {
        let visited = read_lines(&self.state_file(domain, "visited"))?.len();
        let pages = read_lines(&self.state_file(domain, "hashes"))?.len() as u32;
        Ok(DomainStatus::new(self.is_complete(domain), pages, visited))
    }

    async fn reset(&self, domain: &str) -> StorageResult<()> {
        for suffix in ["visited", "hashes", "complete"] {
            remove_if_exists(&self.state_file(domain, suffix))?;
        }
        remove_if_exists(&self.pages_file(domain))
    }
}

#[async_trait]
impl EntityStore for FileStore {
    async fn save_profile(&self, profile: &CompanyProfile) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(profile)?;
        write_atomic(&self.entity_file(&profile.domain, "profile"), &data)
    }

    async fn get_profile(&self, domain: &str) -> StorageResult<Option<CompanyProfile>> {
        match fs::read(self.entity_file(domain, "profile")) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_products(&self, domain: &str, products: &[Product]) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(products)?;
        write_atomic(&self.entity_file(domain, "products"), &data)
    }

    async fn get_products(&self, domain: &str) -> StorageResult<Vec<Product>> {
        match fs::read(self.entity_file(domain, "products")) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
