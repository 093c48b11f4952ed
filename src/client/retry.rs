//! Retry and timeout policies for network attempts.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::RequestError;

/// Bounded retry with a fixed delay between attempts.
///
/// Errors that [`RequestError::is_retryable`] rejects end the loop at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Wait between attempts; constant, no jitter
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Upper bound on attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Runs `f` until it succeeds, fails with a final error, or the retry
    /// budget is spent. `f` receives the zero-based attempt number.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, RequestError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut attempt = 0;
        loop {
            match f(attempt).await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => {
                    debug!("Attempt {} failed with final error: {}", attempt + 1, e);
                    return Err(e);
                }
                Err(e) if attempt >= self.retries => {
                    debug!("Attempt {} failed, retries exhausted: {}", attempt + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    debug!(
                        "Attempt {} failed: {}; retrying after {:?}",
                        attempt + 1,
                        e,
                        self.delay
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

/// Runs `fut` under a deadline; dropping it on expiry cancels the attempt.
pub async fn with_timeout<Fut, T>(duration: Duration, fut: Fut) -> Result<T, RequestError>
where
    Fut: Future<Output = Result<T, RequestError>>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| RequestError::Timeout(duration))?
}
