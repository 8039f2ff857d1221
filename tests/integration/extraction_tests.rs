//! Integration tests for LLM extraction
//!
//! Pages are stored in a temporary file store; the provider is either an
//! in-process fake or the HTTP client pointed at a wiremock server.

use async_trait::async_trait;
use lead_crawler::config::{ExtractionConfig, StorageConfig};
use lead_crawler::extract::{BatchSettings, Extractor, LlmError, LlmProvider, OpenAiClient, RetryPolicy};
use lead_crawler::state::FetchedPage;
use lead_crawler::storage::{FileStore, StateStore, StoreSet};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOMAIN: &str = "acme.test";

/// Answers based on the `marker-<n>` token found in the prompt
struct ScriptedProvider {
    failing_marker: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(failing_marker: Option<usize>) -> Self {
        Self {
            failing_marker,
            calls: AtomicUsize::new(0),
        }
    }

    fn marker(prompt: &str) -> Option<usize> {
        let (_, rest) = prompt.split_once("marker-")?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete_json(&self, prompt: &str) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let marker = Self::marker(prompt).unwrap_or(0);
        if Some(marker) == self.failing_marker {
            return Err(LlmError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        if prompt.starts_with("Extract ONLY products") {
            let mut product = json!({"name": "Glove X", "price": "$50"});
            if marker == 2 {
                product["description"] = json!("Negative cut latex glove");
            }
            return Ok(json!({ "products": [product] }));
        }

        Ok(json!({
            "company": "Acme",
            "description": "",
            "smykm_notes": [format!("Fact {}", marker)],
            "main_contacts": {
                "email": [format!("team{}@acme.test", marker)],
                "phone": null,
                "address": [],
                "contact_page": ""
            },
            "social_media": null
        }))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|_| vec![0.0]).collect())
    }
}

fn extraction_config() -> ExtractionConfig {
    ExtractionConfig {
        max_concurrent: 2,
        request_delay_ms: 0,
        max_retries: 3,
        chars_per_chunk: 60,
        char_limit: 500_000,
        ..ExtractionConfig::default()
    }
}

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        database_path: String::new(),
        fallback_dir: dir.path().display().to_string(),
        page_limit: 1000,
    }
}

fn fast_settings() -> BatchSettings {
    BatchSettings {
        max_concurrent: 2,
        stagger: Duration::ZERO,
        retry: RetryPolicy {
            max_retries: 3,
            floor: Duration::from_millis(1),
            base: Duration::from_millis(1),
        },
    }
}

/// Stores one page per `(path, depth, text)`
async fn stored_site(dir: &TempDir, pages: &[(&str, u32, String)]) -> StoreSet {
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    for (route, depth, text) in pages {
        let page = FetchedPage::from_render(format!("https://{}{}", DOMAIN, route), "Page", text, *depth, vec![])
            .unwrap()
            .into_crawled(DOMAIN);
        store.save_page(&page).await.unwrap();
    }
    StoreSet::new(None, store)
}

#[tokio::test]
async fn test_failed_chunk_is_left_out_of_profile_merge() {
    let dir = TempDir::new().unwrap();
    let pages: Vec<(&str, u32, String)> = (1..=5)
        .map(|n| {
            let route = ["/", "/about", "/team", "/contact", "/blog"][n - 1];
            (route, 1, format!("Company page marker-{} with plenty of text", n))
        })
        .collect();
    let stores = stored_site(&dir, &pages).await;
    let provider = Arc::new(ScriptedProvider::new(Some(3)));

    let extractor = Extractor::new(provider.clone(), stores, extraction_config(), &storage_config(&dir))
        .with_settings(fast_settings());
    let profile = extractor.extract_profile(DOMAIN).await.unwrap().unwrap();

    assert_eq!(profile.chunks_processed, 5);
    assert_eq!(profile.chunks_failed, 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    assert_eq!(profile.company, "Acme");
    assert_eq!(profile.main_contacts.email.len(), 4);
    assert!(!profile.main_contacts.email.contains(&"team3@acme.test".to_string()));
    assert_eq!(profile.smykm_notes.len(), 4);
}

#[tokio::test]
async fn test_duplicate_products_across_chunks_merge_to_one() {
    let dir = TempDir::new().unwrap();
    let pages = vec![
        ("/shop/glove-x", 1, "Glove X listing marker-1 fifty dollars".to_string()),
        ("/shop/glove-x-detail", 2, "Glove X detail marker-2 negative cut".to_string()),
    ];
    let stores = stored_site(&dir, &pages).await;
    let provider = Arc::new(ScriptedProvider::new(None));

    let extractor = Extractor::new(provider, stores, extraction_config(), &storage_config(&dir))
        .with_settings(fast_settings());
    let catalog = extractor.extract_products(DOMAIN, "goalkeeper gloves").await.unwrap();

    assert_eq!(catalog.chunks_processed, 2);
    assert_eq!(catalog.products.len(), 1);
    let product = &catalog.products[0];
    assert_eq!(product.name.as_deref(), Some("Glove X"));
    assert_eq!(product.description, None);
    assert_eq!(product.product_id.as_deref(), Some("acme.test_product_1"));
    assert_eq!(product.domain.as_deref(), Some(DOMAIN));
}

#[tokio::test]
async fn test_domain_without_pages_has_no_profile() {
    let dir = TempDir::new().unwrap();
    let stores = stored_site(&dir, &[]).await;
    let provider = Arc::new(ScriptedProvider::new(None));

    let extractor = Extractor::new(provider.clone(), stores, extraction_config(), &storage_config(&dir));
    assert!(extractor.extract_profile(DOMAIN).await.unwrap().is_none());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_string("Rate limit reached. Please try again in 20ms."),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{\"company\": \"Acme\", \"main_contacts\": {\"email\": [\"hi@acme.test\"]}}"}}]
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let stores = stored_site(&dir, &[("/", 0, "Welcome to Acme".to_string())]).await;
    let client = OpenAiClient::new(
        reqwest::Client::new(),
        "sk-test",
        server.uri(),
        "gpt-4o-mini",
        "text-embedding-3-small",
    );

    let extractor = Extractor::new(Arc::new(client), stores, extraction_config(), &storage_config(&dir))
        .with_settings(fast_settings());
    let profile = extractor.extract_profile(DOMAIN).await.unwrap().unwrap();

    assert_eq!(profile.chunks_failed, 0);
    assert_eq!(profile.company, "Acme");
    assert_eq!(profile.main_contacts.email, vec!["hi@acme.test".to_string()]);
}
