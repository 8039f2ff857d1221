//! Output module for command summaries
//!
//! This module handles:
//! - The crawl summary table with crawled, skipped and failed counts
//! - Per-domain status lines
//! - Extraction and embedding counts

mod report;

pub use report::{
    format_crawl_summary, format_embed_stats, format_extraction, format_status, print_crawl_summary,
    print_embed_stats, print_extraction, print_status,
};
