//! The embeddings service: provider calls under deadlines, fronted by a
//! normalized-key LRU cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shop_store::EmbeddingVector;
use tracing::debug;

use crate::cache::EmbeddingCache;
use crate::error::EmbedError;
use crate::provider::EmbedProvider;

/// Deadlines and cache bound for [`EmbeddingsService`].
#[derive(Clone, Debug)]
pub struct EmbedConfig {
    /// Deadline for a single-text provider call.
    pub embed_timeout: Duration,
    /// Deadline for a batched provider call; longer, batches do more work.
    pub batch_timeout: Duration,
    /// LRU bound, in entries.
    pub cache_capacity: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            embed_timeout: Duration::from_secs(10),
            batch_timeout: Duration::from_secs(60),
            cache_capacity: 4096,
        }
    }
}

impl EmbedConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = env_u64("EMBED_TIMEOUT_SECS") {
            cfg.embed_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("EMBED_BATCH_TIMEOUT_SECS") {
            cfg.batch_timeout = Duration::from_secs(secs);
        }
        if let Some(cap) = env_u64("EMBED_CACHE_CAPACITY") {
            cfg.cache_capacity = cap as usize;
        }
        cfg
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Generates and caches embedding vectors.
///
/// The cache key is the trimmed, lowercased text, so trivially different
/// spellings of the same query share one provider call. The cache is owned by
/// the instance (no process-wide globals); share the service itself via `Arc`.
pub struct EmbeddingsService {
    provider: Arc<dyn EmbedProvider>,
    cache: Mutex<EmbeddingCache>,
    cfg: EmbedConfig,
}

impl EmbeddingsService {
    pub fn new(provider: Arc<dyn EmbedProvider>, cfg: EmbedConfig) -> Self {
        let cache = Mutex::new(EmbeddingCache::new(cfg.cache_capacity));
        Self {
            provider,
            cache,
            cfg,
        }
    }

    fn normalize_key(text: &str) -> String {
        text.trim().to_lowercase()
    }

    fn cache_get(&self, key: &str) -> Option<EmbeddingVector> {
        self.cache.lock().expect("embedding cache poisoned").get(key)
    }

    fn cache_put(&self, key: String, value: EmbeddingVector) {
        self.cache
            .lock()
            .expect("embedding cache poisoned")
            .insert(key, value);
    }

    /// Embeds one text, serving repeats from the cache.
    ///
    /// # Errors
    /// [`EmbedError::Timeout`] if the provider exceeds the single-call
    /// deadline; provider failures are propagated, never swallowed, so
    /// callers decide recoverability.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbedError> {
        let key = Self::normalize_key(text);
        if let Some(hit) = self.cache_get(&key) {
            debug!(target: "embeddings::service", "cache hit");
            return Ok(hit);
        }

        let texts = [key.clone()];
        let mut vectors = self.call_provider(&texts, self.cfg.embed_timeout).await?;
        let vector = EmbeddingVector::new(vectors.remove(0));
        self.cache_put(key, vector.clone());
        Ok(vector)
    }

    /// Embeds many texts: cached entries are reused, the uncached subset goes
    /// to the provider in one batched call. Output order matches input order.
    /// The cache is write-through only; the result is assembled from the
    /// provider's vectors, so a batch wider than the cache still succeeds.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbedError> {
        let keys: Vec<String> = texts.iter().map(|t| Self::normalize_key(t)).collect();

        // Cached hits, plus the uncached remainder deduplicated in
        // first-seen order.
        let mut found: HashMap<String, EmbeddingVector> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        let cache_len;
        {
            let mut cache = self.cache.lock().expect("embedding cache poisoned");
            cache_len = cache.len();
            for key in &keys {
                if found.contains_key(key) || missing.contains(key) {
                    continue;
                }
                match cache.get(key) {
                    Some(hit) => {
                        found.insert(key.clone(), hit);
                    }
                    None => missing.push(key.clone()),
                }
            }
        }

        if !missing.is_empty() {
            debug!(
                target: "embeddings::service",
                total = keys.len(),
                uncached = missing.len(),
                cached_entries = cache_len,
                "embed_batch: fetching uncached subset"
            );
            let vectors = self.call_provider(&missing, self.cfg.batch_timeout).await?;
            for (key, values) in missing.into_iter().zip(vectors) {
                let vector = EmbeddingVector::new(values);
                self.cache_put(key.clone(), vector.clone());
                found.insert(key, vector);
            }
        }

        let mut out = Vec::with_capacity(keys.len());
        for key in &keys {
            let vector = found.get(key).cloned().ok_or_else(|| {
                EmbedError::Provider(format!("provider returned no vector for '{key}'"))
            })?;
            out.push(vector);
        }
        Ok(out)
    }

    async fn call_provider(
        &self,
        texts: &[String],
        deadline: Duration,
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let vectors = tokio::time::timeout(deadline, self.provider.embed_batch(texts))
            .await
            .map_err(|_| EmbedError::Timeout(deadline))??;
        if vectors.len() != texts.len() {
            return Err(EmbedError::Provider(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
