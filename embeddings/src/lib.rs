//! Embedding generation, caching and similarity utilities.
//!
//! The crate wraps a provider-agnostic embedding call behind
//! [`EmbeddingsService`], which adds a normalized-key LRU cache and explicit
//! deadlines, and exposes the cosine-similarity math the search layer scores
//! with. Providers implement [`EmbedProvider`]; [`HttpEmbedder`] talks to an
//! Ollama-compatible endpoint, [`VocabEmbedder`] is the deterministic offline
//! fallback.

mod cache;
mod error;
mod provider;
mod service;
mod similarity;
mod stub;

pub use error::EmbedError;
pub use provider::{BoxFuture, EmbedProvider, HttpEmbedder, HttpEmbedderConfig};
pub use service::{EmbedConfig, EmbeddingsService};
pub use similarity::{Scored, cosine_similarity, find_most_similar};
pub use stub::{CountingEmbedder, VocabEmbedder};
