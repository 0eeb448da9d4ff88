//! Error types for the concurrency primitives.

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, ConcurrencyError>;

/// Errors that can occur while using the concurrency primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    /// A bounded wait expired before the condition was met.
    #[error("wait timed out")]
    TimedOut,

    /// A bounded wait was released by shutdown/force rather than success.
    #[error("wait cancelled")]
    Cancelled,

    /// `unlock()` called by a thread that does not hold the lock.
    #[error("unlock attempted by non-holder")]
    NotHolder,

    /// `reset()` called while a participant is currently inside `wait_for_all`.
    #[error("reset attempted while a participant is waiting")]
    ResetWhileWaiting,
}
