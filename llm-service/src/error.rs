//! Unified error type for language-model calls.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// Invalid endpoint (empty or missing http/https).
    #[error("invalid model endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client error.
    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected/invalid JSON response.
    #[error("failed to decode model response: {0}")]
    Decode(String),

    /// The generation call exceeded its deadline.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}
