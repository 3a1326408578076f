//! Cosine similarity and deterministic nearest-neighbour ranking.

use shop_store::EmbeddingVector;

use crate::error::EmbedError;

/// An item paired with its similarity to some query vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub similarity: f32,
}

/// Normalized dot product of two vectors, in `[-1, 1]`.
///
/// Returns `0.0` if either vector has zero magnitude (guards divide-by-zero).
///
/// # Errors
/// [`EmbedError::DimensionMismatch`] if the vectors differ in dimension.
pub fn cosine_similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> Result<f32, EmbedError> {
    if a.dimension() != b.dimension() {
        return Err(EmbedError::DimensionMismatch {
            got: a.dimension(),
            want: b.dimension(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.values().iter().zip(b.values()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// Ranks `candidates` against `query`: drops anything below `threshold`,
/// sorts descending by similarity and truncates to `limit`.
///
/// The sort is stable, so ties keep candidate input order; the result is
/// deterministic for identical inputs.
///
/// # Errors
/// [`EmbedError::DimensionMismatch`] if any candidate's dimension differs
/// from the query's.
pub fn find_most_similar<T>(
    query: &EmbeddingVector,
    candidates: Vec<(T, EmbeddingVector)>,
    limit: usize,
    threshold: f32,
) -> Result<Vec<Scored<T>>, EmbedError> {
    let mut scored = Vec::with_capacity(candidates.len());
    for (item, vector) in candidates {
        let similarity = cosine_similarity(query, &vector)?;
        if similarity >= threshold {
            scored.push(Scored { item, similarity });
        }
    }

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    Ok(scored)
}
