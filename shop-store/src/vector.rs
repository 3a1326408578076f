//! Embedding vector wrapper.

use serde::{Deserialize, Serialize};

/// A fixed-length numeric vector representing the semantic content of a text.
///
/// The dimension is the length of `values` by construction, so the
/// `dimension == len(values)` invariant cannot be violated after creation.
/// Comparing two vectors requires equal dimensions; that check lives with the
/// similarity math in the `embeddings` crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector {
    values: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}
