//! Deadline wrapper shared by every caller of the storage layer.

use std::future::Future;
use std::time::Duration;

use crate::errors::StoreError;

/// Runs a storage future under `deadline`, mapping elapse to
/// [`StoreError::Timeout`] so callers can tell a slow store from a broken one.
pub async fn with_store_timeout<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}
