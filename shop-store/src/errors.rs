//! Unified error type for storage operations.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by repository implementations.
///
/// `Timeout` and `Backend` are deliberately distinct: callers use the split
/// to decide whether a retry is sensible.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage call exceeded its deadline.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A record required by the operation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),
}
