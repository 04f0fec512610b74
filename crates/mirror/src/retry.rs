// Retry-with-backoff for resource fetches.
//
// The delay grows linearly with the retry number: retry k waits k * base_delay.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::MirrorError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Delay unit. Retry `k` (1-based) sleeps `k * base_delay` beforehand.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the given retry (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.base_delay.checked_mul(retry).unwrap_or(Duration::MAX)
    }
}

/// Execute an async operation, retrying it while it fails with a retryable error.
///
/// The `operation` closure receives the number of retries performed so far
/// (0 for the initial attempt). Non-retryable errors are returned at once;
/// retryable ones are returned once `max_retries` is exhausted.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, MirrorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MirrorError>>,
{
    let mut retries = 0;
    loop {
        match operation(retries).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retries < policy.max_retries => {
                retries += 1;
                let delay = policy.delay_for_retry(retries);
                warn!(
                    attempt = retries,
                    max = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Classify a reqwest error as retryable or non-retryable.
///
/// Retryable: connect, timeout, request, body read, and decode errors.
/// Non-retryable: redirect and builder errors.
pub fn is_retryable_reqwest_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() || e.is_decode()
}
