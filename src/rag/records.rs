use crate::chunking::Chunker;
use crate::extract::{CompanyProfile, Product};
use crate::state::{content_hash, CrawledPage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const RAW_PAGES: &str = "raw_pages";
pub const PRODUCTS: &str = "products";
pub const COMPANIES: &str = "companies";

/// One embedded text, keyed by `chunk_id`
///
/// `embedding` stays empty until the provider has answered for the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub domain: String,
    pub collection: String,
    pub content: String,
    pub content_hash: String,
    pub embedding: Vec<f32>,
    pub metadata: Value,
}

impl EmbeddingRecord {
    fn pending(chunk_id: String, domain: &str, collection: &str, content: String, metadata: Value) -> Self {
        Self {
            chunk_id,
            domain: domain.to_string(),
            collection: collection.to_string(),
            content_hash: content_hash(&content),
            content,
            embedding: Vec::new(),
            metadata,
        }
    }
}

/// Chunks every stored page into `raw_pages` records
pub fn page_records(chunker: &Chunker, pages: &[CrawledPage]) -> Vec<EmbeddingRecord> {
    let mut records = Vec::new();
    for page in pages {
        for chunk in chunker.chunk_page(page) {
            let metadata = json!({
                "url": chunk.source_url,
                "title": chunk.title,
                "chunk_index": chunk.chunk_index,
                "total_chunks": chunk.total_chunks,
                "depth": chunk.depth,
                "tokens": chunk.token_count,
                "tokenizer": chunker.tokenizer().id(),
            });
            records.push(EmbeddingRecord {
                chunk_id: chunk.chunk_id,
                domain: chunk.domain,
                collection: RAW_PAGES.to_string(),
                content: chunk.content,
                content_hash: chunk.content_hash,
                embedding: Vec::new(),
                metadata,
            });
        }
    }
    records
}

/// Renders a product as labelled lines, skipping empty fields
pub fn product_text(product: &Product) -> String {
    let mut lines = Vec::new();
    let labelled = [
        ("Brand", &product.brand),
        ("Name", &product.name),
        ("Category", &product.category),
        ("Description", &product.description),
    ];
    for (label, value) in labelled {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", label, value));
        }
    }
    if !product.specs.is_empty() {
        if let Ok(specs) = serde_json::to_string(&product.specs) {
            lines.push(format!("Specifications: {}", specs));
        }
    }
    if let Some(price) = product.price.as_deref().filter(|p| !p.is_empty()) {
        lines.push(format!("Price: {}", price));
    }
    if !product.reviews.is_empty() {
        lines.push(format!("Reviews: {}", product.reviews.join(" | ")));
    }
    lines.join("\n")
}

/// Builds `products` records
///
/// A product without an id is keyed `<domain>_product_<n>` by its 1-based
/// position, matching the ids assigned at merge time.
pub fn product_records(domain: &str, products: &[Product]) -> Vec<EmbeddingRecord> {
    let mut records = Vec::new();
    for (index, product) in products.iter().enumerate() {
        let content = product_text(product);
        if content.is_empty() {
            continue;
        }
        let chunk_id = product
            .product_id
            .clone()
            .unwrap_or_else(|| format!("{}_product_{}", domain, index + 1));
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        let metadata = json!({
            "brand": field(&product.brand),
            "name": field(&product.name),
            "category": field(&product.category),
            "price": field(&product.price),
            "url": field(&product.url),
        });
        records.push(EmbeddingRecord::pending(chunk_id, domain, PRODUCTS, content, metadata));
    }
    records
}

/// Renders the company summary, notes and contact lines
pub fn company_text(profile: &CompanyProfile) -> String {
    let mut parts = Vec::new();
    if !profile.company.is_empty() {
        parts.push(format!("Company: {}", profile.company));
    }
    if !profile.description.is_empty() {
        parts.push(format!("Description: {}", profile.description));
    }
    if !profile.smykm_notes.is_empty() {
        let notes: Vec<String> = profile.smykm_notes.iter().map(|n| format!("- {}", n)).collect();
        parts.push(format!("Key Insights:\n{}", notes.join("\n")));
    }

    let contacts = &profile.main_contacts;
    let mut contact_lines = Vec::new();
    if !contacts.email.is_empty() {
        contact_lines.push(format!("Email: {}", contacts.email.join(", ")));
    }
    if !contacts.phone.is_empty() {
        contact_lines.push(format!("Phone: {}", contacts.phone.join(", ")));
    }
    if !contacts.address.is_empty() {
        contact_lines.push(format!("Address: {}", contacts.address.join(" | ")));
    }
    if !contact_lines.is_empty() {
        parts.push(format!("Contact Information:\n{}", contact_lines.join("\n")));
    }
    parts.join("\n")
}

/// The single `companies` record of a domain, if the profile has any text
pub fn company_record(domain: &str, profile: &CompanyProfile) -> Option<EmbeddingRecord> {
    let content = company_text(profile);
    if content.is_empty() {
        return None;
    }
    Some(EmbeddingRecord::pending(
        format!("{}_company", domain),
        domain,
        COMPANIES,
        content,
        json!({ "company": profile.company }),
    ))
}
