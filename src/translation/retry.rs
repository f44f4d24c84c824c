/*!
 * Retry policy for inference requests.
 *
 * A request is attempted up to `max_attempts` times. Between attempts the
 * policy sleeps for an exponentially growing delay (base, 2x base, 4x base,
 * ...) capped at `max_backoff`. Errors that cannot succeed on a retry are
 * returned immediately.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::ProviderError;

/// Exponential backoff retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one, at least 1
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub backoff_base: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            max_backoff,
        }
    }

    /// Policy that gives up after the first failure
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!("Attempt {}/{} failed with a non-retryable error: {}", attempt, self.max_attempts, e);
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!("Attempt {}/{} failed ({:?}): {}", attempt, self.max_attempts, e.kind(), e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed ({:?}): {} - retrying in {:.1}s",
                        attempt,
                        self.max_attempts,
                        e.kind(),
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
