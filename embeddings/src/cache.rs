//! Count-bounded LRU cache for embedding vectors.
//!
//! Entries are immutable once written, so the only race to care about is the
//! map insertion itself; the service guards the cache with a plain mutex and
//! never holds it across an await.

use std::collections::HashMap;

use shop_store::EmbeddingVector;

/// LRU by entry count. Recency is tracked with a monotonic tick; eviction
/// scans for the minimum, which is fine at the capacities we run (thousands).
pub struct EmbeddingCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, (u64, EmbeddingVector)>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Looks up `key`, refreshing its recency on a hit.
    pub fn get(&mut self, key: &str) -> Option<EmbeddingVector> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.0 = tick;
            entry.1.clone()
        })
    }

    pub fn insert(&mut self, key: String, value: EmbeddingVector) {
        self.tick += 1;
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (tick, _))| *tick)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, (self.tick, value));
    }
}
