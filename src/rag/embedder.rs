use crate::chunking::Chunker;
use crate::extract::{with_backoff, ExtractError, LlmError, LlmProvider, RetryPolicy};
use crate::rag::records::{
    company_record, page_records, product_records, EmbeddingRecord, COMPANIES, PRODUCTS, RAW_PAGES,
};
use crate::storage::{EntityStore, StoreSet, VectorStore};
use crate::url::host_of;
use crate::LeadError;
use std::sync::Arc;
use tracing::{debug, info};

/// Counts reported by one `embed_domain` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedStats {
    pub domain: String,
    pub raw_pages_chunks: usize,
    pub products_chunks: usize,
    pub companies_chunks: usize,
    pub new_embeddings: usize,
    pub skipped_embeddings: usize,
}

impl EmbedStats {
    pub fn total_chunks(&self) -> usize {
        self.raw_pages_chunks + self.products_chunks + self.companies_chunks
    }
}

/// Builds and stores embeddings for the pages, products and profile of a domain
pub struct Embedder {
    llm: Arc<dyn LlmProvider>,
    stores: StoreSet,
    entities: Arc<dyn EntityStore>,
    vectors: Arc<dyn VectorStore>,
    chunker: Chunker,
    batch_size: usize,
    page_limit: usize,
    retry: RetryPolicy,
}

impl Embedder {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        stores: StoreSet,
        entities: Arc<dyn EntityStore>,
        vectors: Arc<dyn VectorStore>,
        chunker: Chunker,
    ) -> Self {
        Self {
            llm,
            stores,
            entities,
            vectors,
            chunker,
            batch_size: 100,
            page_limit: 1000,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embeds every collection of a domain
    ///
    /// Unless `force_reembed` is set, records whose content hash is already
    /// stored for the domain and collection are skipped. Records embedded
    /// before a failing batch stay stored.
    pub async fn embed_domain(&self, domain: &str, force_reembed: bool) -> Result<EmbedStats, LeadError> {
        let host = host_of(domain);
        if host.is_empty() {
            return Err(ExtractError::InvalidDomain(domain.to_string()).into());
        }

        let pages = self.stores.get_pages(&host, self.page_limit).await?;
        let raw = page_records(&self.chunker, &pages);
        let products = product_records(&host, &self.entities.get_products(&host).await?);
        let companies: Vec<EmbeddingRecord> = self
            .entities
            .get_profile(&host)
            .await?
            .and_then(|profile| company_record(&host, &profile))
            .into_iter()
            .collect();

        let mut stats = EmbedStats {
            domain: host.clone(),
            raw_pages_chunks: raw.len(),
            products_chunks: products.len(),
            companies_chunks: companies.len(),
            ..EmbedStats::default()
        };
        info!(
            domain = %host,
            raw_pages = raw.len(),
            products = products.len(),
            companies = companies.len(),
            "Prepared embedding records"
        );

        for (collection, records) in [(RAW_PAGES, raw), (PRODUCTS, products), (COMPANIES, companies)] {
            if records.is_empty() {
                continue;
            }
            self.embed_collection(&host, collection, records, force_reembed, &mut stats)
                .await?;
        }

        info!(
            domain = %host,
            new = stats.new_embeddings,
            skipped = stats.skipped_embeddings,
            "Embedding complete"
        );
        Ok(stats)
    }

    async fn embed_collection(
        &self,
        domain: &str,
        collection: &str,
        records: Vec<EmbeddingRecord>,
        force_reembed: bool,
        stats: &mut EmbedStats,
    ) -> Result<(), LeadError> {
        let pending: Vec<EmbeddingRecord> = if force_reembed {
            records
        } else {
            let existing = self.vectors.existing_hashes(domain, collection).await?;
            let before = records.len();
            let fresh: Vec<_> = records
                .into_iter()
                .filter(|r| !existing.contains(&r.content_hash))
                .collect();
            stats.skipped_embeddings += before - fresh.len();
            fresh
        };

        if pending.is_empty() {
            debug!(domain = %domain, collection = collection, "All records already embedded");
            return Ok(());
        }

        let batches = pending.len().div_ceil(self.batch_size);
        for (number, batch) in pending.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|r| r.content.clone()).collect();
            let texts = &texts;
            let llm = &self.llm;
            let vectors = with_backoff(&self.retry, domain, || llm.embed(texts)).await?;
            if vectors.len() != batch.len() {
                return Err(LlmError::MalformedResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }

            let embedded: Vec<EmbeddingRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(record, embedding)| EmbeddingRecord {
                    embedding,
                    ..record.clone()
                })
                .collect();
            self.vectors.upsert(&embedded).await?;
            stats.new_embeddings += embedded.len();

            debug!(
                domain = %domain,
                collection = collection,
                batch = number + 1,
                batches = batches,
                "Embedded batch"
            );
        }
        Ok(())
    }
}
