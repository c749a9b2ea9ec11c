//! Retry policy for provider calls.
//!
//! One policy object, parameterized by [`ProviderErrorKind`] classification,
//! wraps every provider attempt with a timeout, cancellation and exponential
//! backoff.

use crate::ports::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
            ..Default::default()
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// Each attempt is bounded by `attempt_timeout` and raced against
    /// `cancel`. Expired attempts become `Timeout` errors; cancellation
    /// becomes `Cancelled` and is never retried.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        attempt_timeout: Duration,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::cancelled());
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProviderError::cancelled()),
                outcome = tokio::time::timeout(attempt_timeout, op()) => match outcome {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::timeout(format!(
                        "no response within {}ms",
                        attempt_timeout.as_millis()
                    ))),
                },
            };

            match result {
                Ok(value) => return Ok(value),
                Err(error) if error.kind.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Attempt {} failed ({}), retrying in {}ms",
                        attempt,
                        error,
                        delay.as_millis()
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ProviderError::cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(error) => {
                    debug!("Giving up after {} attempt(s): {}", attempt + 1, error);
                    return Err(error);
                }
            }
        }
    }
}
