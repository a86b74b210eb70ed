//! Shared primitives for all Rust crates in aceload.

#![forbid(unsafe_code)]

/// Business key primitives shared across crates.
pub mod key;

use thiserror::Error;

pub use key::BusinessKey;

/// Result type used across aceload crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation violates a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transaction lost a serialization race and may be retried from scratch.
    #[error("serialization failure: {0}")]
    Serialization(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Teardown failed, possibly while an earlier load error was in flight.
    #[error("{}", describe_teardown_failure(.load, .teardown))]
    TeardownFailed {
        /// Load phase error that was being handled when teardown ran.
        load: Option<Box<AppError>>,
        /// Error raised by the teardown itself.
        teardown: Box<AppError>,
    },
}

impl AppError {
    /// Returns whether the failed transaction can be re-executed from scratch.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}

fn describe_teardown_failure(load: &Option<Box<AppError>>, teardown: &AppError) -> String {
    match load {
        Some(load) => format!("teardown failed: {teardown} (while handling load error: {load})"),
        None => format!("teardown failed: {teardown}"),
    }
}
