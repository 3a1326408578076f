//! Embedding provider interface and the HTTP implementation.
//!
//! The service never depends on a vendor SDK; providers implement one
//! batch-embed call and everything else (caching, timeouts, similarity) lives
//! above them.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EmbedError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider interface for embedding generation. Implement this to plug in a
/// different backend (hosted API, local model, test stub).
pub trait EmbedProvider: Send + Sync {
    /// Embeds every text, preserving input order in the output.
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>>;
}

/// Configuration for [`HttpEmbedder`].
#[derive(Clone, Debug)]
pub struct HttpEmbedderConfig {
    /// Provider base URL, e.g. `http://localhost:11434`.
    pub endpoint: String,
    /// Embedding model name.
    pub model: String,
    /// Expected vector dimension; responses of any other size are rejected.
    pub dimension: Option<usize>,
}

impl HttpEmbedderConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("EMBED_URL")
                .unwrap_or_else(|_| "http://localhost:11434".into()),
            model: std::env::var("EMBED_MODEL").unwrap_or_else(|_| "bge-m3".into()),
            dimension: std::env::var("EMBED_DIM")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// Thin client for an Ollama-compatible `/api/embed` endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    cfg: HttpEmbedderConfig,
    url: String,
}

impl HttpEmbedder {
    /// # Errors
    /// [`EmbedError::Provider`] for an invalid endpoint,
    /// [`EmbedError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: HttpEmbedderConfig) -> Result<Self, EmbedError> {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(EmbedError::Provider(format!(
                "invalid embedding endpoint: {}",
                cfg.endpoint
            )));
        }

        // No per-request timeout here: the service layer owns deadlines so
        // single and batch calls can use different ones.
        let client = reqwest::Client::builder().build()?;
        let url = format!("{}/api/embed", endpoint.trim_end_matches('/'));

        Ok(Self { client, cfg, url })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbedProvider for HttpEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>> {
        Box::pin(async move {
            let body = EmbedRequest {
                model: &self.cfg.model,
                input: texts,
            };

            debug!(target: "embeddings::provider", count = texts.len(), "POST {}", self.url);
            let resp = self.client.post(&self.url).json(&body).send().await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                let snippet = text.chars().take(240).collect::<String>();
                return Err(EmbedError::HttpStatus {
                    status,
                    url: self.url.clone(),
                    snippet,
                });
            }

            let out: EmbedResponse = resp
                .json()
                .await
                .map_err(|e| EmbedError::Decode(format!("embed response: {e}")))?;

            if out.embeddings.len() != texts.len() {
                return Err(EmbedError::Decode(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    out.embeddings.len()
                )));
            }
            if let Some(dim) = self.cfg.dimension {
                for v in &out.embeddings {
                    if v.len() != dim {
                        return Err(EmbedError::Decode(format!(
                            "embedding dim {} != expected {dim} (model: {})",
                            v.len(),
                            self.cfg.model
                        )));
                    }
                }
            }

            Ok(out.embeddings)
        })
    }
}
