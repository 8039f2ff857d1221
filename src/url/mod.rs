//! URL handling module for Lead-Crawler
//!
//! This module provides the pure URL helpers the crawl frontier is built on:
//! host extraction, canonicalization, extension filtering and link resolution.
//! None of these functions fail; malformed input passes through and only
//! surfaces as an error when it is fetched.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{host_of, is_same_host, seed_url};
pub use normalize::{canonicalize, resolve_link, should_skip, SKIP_EXTENSIONS};
