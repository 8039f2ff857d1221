use crate::extract::llm::LlmError;
use crate::extract::retry::{with_backoff, RetryPolicy};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Concurrency and pacing of one fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Calls allowed in flight at once
    pub max_concurrent: usize,

    /// Request `k` waits `k * stagger` before queueing for a permit
    pub stagger: Duration,

    pub retry: RetryPolicy,
}

impl BatchSettings {
    pub fn from_config(config: &crate::config::ExtractionConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            stagger: Duration::from_millis(config.request_delay_ms),
            retry: RetryPolicy::new(config.max_retries),
        }
    }
}

/// A chunk whose call failed for good
#[derive(Debug)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: LlmError,
}

/// Results of a fan-out, in chunk order, plus the failures
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub failures: Vec<ChunkFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

/// Runs `task` once per chunk index with bounded concurrency
///
/// Starts are staggered, throttling is retried per `settings.retry`, and
/// one failed chunk never cancels the others.
pub async fn run_batch<T, F, Fut>(count: usize, settings: &BatchSettings, label: &str, task: F) -> BatchOutcome<T>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let semaphore = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
    let task = &task;

    let calls = (0..count).map(|index| {
        let semaphore = semaphore.clone();
        async move {
            let offset = settings.stagger.saturating_mul(index as u32);
            if !offset.is_zero() {
                tokio::time::sleep(offset).await;
            }
            let _permit = semaphore.acquire().await.ok();
            debug!(label = %label, chunk = index + 1, total = count, "Extraction call started");
            let result = with_backoff(&settings.retry, label, || task(index)).await;
            (index, result)
        }
    });

    let mut outcome = BatchOutcome {
        results: Vec::with_capacity(count),
        failures: Vec::new(),
    };
    for (index, result) in join_all(calls).await {
        match result {
            Ok(value) => outcome.results.push(value),
            Err(error) => {
                warn!(label = %label, chunk = index + 1, total = count, error = %error, "Chunk failed");
                outcome.failures.push(ChunkFailure { index, error });
            }
        }
    }
    outcome
}
