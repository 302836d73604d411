//! Bounded retry with a fixed backoff

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{PricingError, Result};

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Try once, no retries
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub const fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up
///
/// A single-attempt policy returns the operation's own error unchanged.
/// Otherwise the last error is wrapped in [`PricingError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempts == 1 => return Err(err),
            Err(err) if attempt >= attempts => {
                return Err(PricingError::RetriesExhausted {
                    attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                warn!(attempt, max_attempts = attempts, error = %err, "Attempt failed, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
