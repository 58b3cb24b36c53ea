//! Retry policy for transient store failures.

use std::future::Future;
use std::time::Duration;

use super::error::{Result, StoreError, TableError};

/// How many times, and how patiently, a store call is retried.
///
/// Backoff doubles from `initial_delay` on every retry and is capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Retries without waiting. Meant for tests.
    pub fn fast(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: usize) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(u32::MAX as usize) as u32);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `call` until it succeeds, fails permanently, or the attempt budget
    /// is spent.
    ///
    /// Permanent failures map to [`TableError::Rejected`] straight away; an
    /// exhausted budget maps to [`TableError::StorageUnavailable`].
    pub async fn run<T, F, Fut>(&self, table: &str, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Permanent(message)) => {
                    tracing::debug!(table, operation, %message, "Store rejected request");
                    return Err(TableError::Rejected(message));
                }
                Err(StoreError::Transient(message)) if attempt >= max_attempts => {
                    tracing::warn!(table, operation, attempt, %message, "Retry budget exhausted");
                    return Err(TableError::StorageUnavailable {
                        operation,
                        attempts: attempt,
                        message,
                    });
                }
                Err(StoreError::Transient(message)) => {
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        table,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %message,
                        "Transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
