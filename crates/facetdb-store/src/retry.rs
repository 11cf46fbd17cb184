//! Conflict retry for writes.
//!
//! A transaction that loses a write race is retried as a whole after a random
//! delay drawn uniformly from `[0, max_jitter]`, up to a hard attempt ceiling.
//! Any other error ends the loop immediately. The delay source is a
//! [`Backoff`] trait object so tests can run the loop without sleeping.

use crate::error::{Result, StorageError};
use facetdb_configs::LimitsSettings;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Delay to wait before the next attempt.
pub trait Backoff: Send + Sync {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Uniform random delay in `[0, max_delay]`, independent of the attempt number.
#[derive(Debug, Clone, Copy)]
pub struct JitterBackoff {
    max_delay: Duration,
}

impl JitterBackoff {
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }
}

impl Backoff for JitterBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        rand::thread_rng().gen_range(Duration::ZERO..=self.max_delay)
    }
}

/// Retries immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Attempt ceiling plus delay source.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_limits(limits: &LimitsSettings) -> Self {
        Self::new(
            limits.max_transaction_attempts,
            Arc::new(JitterBackoff::new(Duration::from_millis(limits.max_retry_jitter_ms))),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_limits(&LimitsSettings::default())
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Runs `op` until it succeeds, fails with a non-conflict error, or the
/// attempt ceiling is reached. `op` receives the 1-based attempt number.
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        let message = match op(attempt).await {
            Err(StorageError::TransactionConflict(message)) => message,
            other => return other,
        };

        if attempt >= policy.max_attempts {
            log::error!(
                "Transaction still conflicting after {} attempts, giving up: {}",
                attempt,
                message
            );
            return Err(StorageError::RetriesExhausted {
                attempts: attempt,
                last_conflict: message,
            });
        }

        let delay = policy.backoff.delay(attempt);
        log::warn!(
            "Transaction conflict on attempt {}/{}, retrying in {:?}: {}",
            attempt,
            policy.max_attempts,
            delay,
            message
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}
