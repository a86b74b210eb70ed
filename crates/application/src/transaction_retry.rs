//! Retrying transaction executor.
//!
//! A unit of work opens its own transaction, runs its body and commits. When
//! the store reports a serialization conflict the whole unit is invoked again
//! against a fresh transaction, so bodies must not have side effects outside
//! the transaction.

use std::future::Future;

use aceload_core::{AppError, AppResult};
use tracing::debug;

/// Default cap on attempts per unit of work.
pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 100;

/// Bounds how often a conflicting unit of work is re-executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` executions per unit of work.
    pub fn new(max_attempts: u32) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "max transaction attempts must be greater than zero".to_owned(),
            ));
        }

        Ok(Self { max_attempts })
    }

    /// Returns the attempt cap.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt cap is reached.
pub async fn retry_transaction<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt_number = 1_u32;
    loop {
        match attempt().await {
            Err(error) if error.is_retryable() && attempt_number < policy.max_attempts => {
                debug!(
                    operation,
                    attempt = attempt_number,
                    error = %error,
                    "retrying transaction after serialization conflict"
                );
                attempt_number += 1;
            }
            result => return result,
        }
    }
}
