use crate::crawler::CrawlSummary;
use crate::extract::{CompanyProfile, ProductCatalog};
use crate::rag::EmbedStats;
use crate::storage::DomainStatus;
use std::fmt::Write;

/// Formats the crawl summary table
pub fn format_crawl_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Summary ===\n");
    let _ = writeln!(out, "Domains requested: {}", summary.total_domains);
    let _ = writeln!(out, "  Crawled: {}", summary.crawled_domains);
    let _ = writeln!(out, "  Skipped (already complete): {}", summary.skipped_domains);
    let _ = writeln!(out, "  Failed: {}", summary.failed_domains);
    let _ = writeln!(out, "Pages stored: {}", summary.total_pages);

    if !summary.results.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<40} {:>8} {:>8} {:>8}  {}", "Domain", "Pages", "New", "Visited", "Result");
        for result in &summary.results {
            let status = match (&result.error, result.success) {
                (_, true) => "ok".to_string(),
                (Some(error), false) => format!("failed: {}", error),
                (None, false) => "failed".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<40} {:>8} {:>8} {:>8}  {}",
                result.domain, result.pages_crawled, result.new_pages, result.urls_visited, status
            );
        }
    }
    out
}

/// Formats one `status` line
pub fn format_status(domain: &str, status: &DomainStatus) -> String {
    let state = if status.fully_crawled {
        "complete"
    } else if status.in_progress {
        "in progress"
    } else {
        "not crawled"
    };
    format!(
        "{}: {} ({} pages, {} URLs visited)",
        domain, state, status.pages, status.visited_urls
    )
}

/// Formats the counts of a profile and product extraction
pub fn format_extraction(domain: &str, profile: Option<&CompanyProfile>, catalog: &ProductCatalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Extraction: {} ===\n", domain);

    match profile {
        Some(profile) => {
            let company = if profile.company.is_empty() { "(unknown)" } else { profile.company.as_str() };
            let _ = writeln!(out, "Company: {}", company);
            let _ = writeln!(
                out,
                "  Chunks: {} processed, {} succeeded, {} failed",
                profile.chunks_processed,
                profile.chunks_processed.saturating_sub(profile.chunks_failed),
                profile.chunks_failed
            );
            let _ = writeln!(
                out,
                "  Contacts: {} emails, {} phones, {} addresses",
                profile.main_contacts.email.len(),
                profile.main_contacts.phone.len(),
                profile.main_contacts.address.len()
            );
            let _ = writeln!(out, "  Notes: {}", profile.smykm_notes.len());
            let _ = writeln!(out, "  Social links: {}", profile.social_media.links().len());
        }
        None => {
            let _ = writeln!(out, "Company: no stored pages");
        }
    }

    let _ = writeln!(out, "Products: {}", catalog.products.len());
    let _ = writeln!(
        out,
        "  Chunks: {} processed, {} succeeded, {} failed",
        catalog.chunks_processed,
        catalog.chunks_processed.saturating_sub(catalog.chunks_failed),
        catalog.chunks_failed
    );
    out
}

/// Formats the counts of an embedding run
pub fn format_embed_stats(stats: &EmbedStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Embedding: {} ===\n", stats.domain);
    let _ = writeln!(out, "Records: {}", stats.total_chunks());
    let _ = writeln!(out, "  Raw page chunks: {}", stats.raw_pages_chunks);
    let _ = writeln!(out, "  Products: {}", stats.products_chunks);
    let _ = writeln!(out, "  Company: {}", stats.companies_chunks);
    let _ = writeln!(out, "Embedded: {}", stats.new_embeddings);
    let _ = writeln!(out, "Skipped (unchanged): {}", stats.skipped_embeddings);
    out
}

pub fn print_crawl_summary(summary: &CrawlSummary) {
    print!("{}", format_crawl_summary(summary));
}

pub fn print_status(domain: &str, status: &DomainStatus) {
    println!("{}", format_status(domain, status));
}

pub fn print_extraction(domain: &str, profile: Option<&CompanyProfile>, catalog: &ProductCatalog) {
    print!("{}", format_extraction(domain, profile, catalog));
}

pub fn print_embed_stats(stats: &EmbedStats) {
    print!("{}", format_embed_stats(stats));
}
