//! Offline embedding providers: a deterministic vocabulary embedder and a
//! call-counting wrapper.
//!
//! `VocabEmbedder` maps known bilingual catalog terms onto fixed axes and
//! hashes everything else into overflow buckets, so semantically related
//! texts (across Arabic and English) land close together without a model.
//! It backs tests and offline runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EmbedError;
use crate::provider::{BoxFuture, EmbedProvider};

/// Number of hash buckets for out-of-vocabulary tokens.
const OOV_BUCKETS: usize = 16;

/// Bilingual term groups; every group is one vector axis.
const VOCAB: &[&[&str]] = &[
    &["hdpe", "polyethylene", "poly", "بولي", "إيثيلين", "ايثيلين"],
    &["pipe", "pipes", "tube", "tubes", "أنابيب", "انابيب", "أنبوب"],
    &["cable", "cables", "wire", "كابل", "كابلات", "سلك"],
    &["valve", "valves", "صمام", "صمامات"],
    &["pump", "pumps", "مضخة", "مضخات"],
    &["steel", "iron", "حديد", "فولاذ"],
    &["shipping", "delivery", "شحن", "توصيل"],
    &["return", "refund", "استرجاع", "استرداد"],
    &["warranty", "guarantee", "ضمان"],
    &["price", "cost", "سعر", "تكلفة"],
];

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn oov_bucket(token: &str) -> usize {
    // FNV-1a, stable across runs and platforms.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in token.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % OOV_BUCKETS as u64) as usize
}

/// Deterministic, vocabulary-driven embedder.
#[derive(Default)]
pub struct VocabEmbedder;

impl VocabEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Vector dimension produced by this embedder.
    pub fn dimension() -> usize {
        VOCAB.len() + OOV_BUCKETS
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; Self::dimension()];
        for token in tokenize(text) {
            // A token like "hdpe-p6006" should still light up the hdpe axis.
            let mut matched = false;
            for (axis, terms) in VOCAB.iter().enumerate() {
                if terms.iter().any(|t| token.contains(t)) {
                    values[axis] += 1.0;
                    matched = true;
                }
            }
            if !matched {
                values[VOCAB.len() + oov_bucket(&token)] += 1.0;
            }
        }
        values
    }
}

impl EmbedProvider for VocabEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>> {
        Box::pin(async move { Ok(texts.iter().map(|t| Self::embed_one(t)).collect()) })
    }
}

/// Wraps any provider and counts how many texts reach it; lets tests assert
/// cache idempotence and debounce coalescing.
pub struct CountingEmbedder {
    inner: Arc<dyn EmbedProvider>,
    calls: AtomicUsize,
    texts_embedded: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(inner: Arc<dyn EmbedProvider>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    /// Number of provider round-trips.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of individual texts that reached the provider.
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }
}

impl EmbedProvider for CountingEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        })
    }
}
