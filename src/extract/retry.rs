//! Backoff for provider throttling
//!
//! Only `LlmError::RateLimited` is retried. The wait comes from the
//! provider's `Retry-After` value when it sent one, then from a
//! "try again in 3.2s" hint in the error text, and otherwise grows
//! exponentially from the base delay.

use crate::extract::llm::LlmError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How throttled calls are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,

    /// Lower bound for any provider-suggested wait
    pub floor: Duration,

    /// First exponential step when no wait was suggested
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            floor: Duration::from_secs(5),
            base: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            ..Self::default()
        }
    }

    /// Wait before the next attempt after a throttled `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>, message: &str) -> Duration {
        let suggested = retry_after.or_else(|| parse_wait(message).map(|wait| wait + Duration::from_secs(1)));
        match suggested {
            Some(wait) => wait.max(self.floor),
            None => self.base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// Reads the wait out of messages like "Please try again in 3.685s"
pub fn parse_wait(message: &str) -> Option<Duration> {
    let (_, rest) = message.split_once("try again in")?;
    let rest = rest.trim_start();
    let number: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.parse().ok()?;
    let unit = rest[number.len()..].trim_start();

    let seconds = if unit.starts_with("ms") {
        value / 1000.0
    } else if unit.starts_with('m') && !unit.starts_with("ms") {
        value * 60.0
    } else {
        value
    };
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Runs `operation`, retrying rate-limited failures per `policy`
///
/// Every other error is returned immediately. After the last throttled
/// attempt the rate-limit error itself is returned.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(LlmError::RateLimited { retry_after, message }) if attempt + 1 < attempts => {
                let wait = policy.delay_for(attempt, retry_after, &message);
                warn!(
                    label = %label,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    wait_secs = wait.as_secs_f64(),
                    "Rate limit hit, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    warn!(label = %label, attempts = attempts, "Max retries reached for rate limit");
                }
                return Err(e);
            }
        }
    }
}
