//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainCrawlState`: visited URLs, content hashes and completion flag for one host
//! - `CrawlPhase`: the phases a domain crawl moves through
//! - `CrawledPage` / `FetchedPage`: a rendered page before and after it is stored

mod domain_state;
mod page;
mod phase;

pub use domain_state::{DomainCrawlState, FrontierEntry};
pub use page::{content_hash, CrawledPage, FetchedPage};
pub use phase::CrawlPhase;
