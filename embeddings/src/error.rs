//! Unified error type for embedding operations.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the embeddings service and its providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Two vectors of different dimensions were compared.
    #[error("dimension mismatch: {got} vs {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// The provider call exceeded its deadline.
    #[error("embedding provider timed out after {0:?}")]
    Timeout(Duration),

    /// Transport/HTTP client error.
    #[error("embedding transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from the provider.
    #[error("embedding provider HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected/invalid provider response.
    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    /// Any other upstream provider failure.
    #[error("embedding provider error: {0}")]
    Provider(String),
}
