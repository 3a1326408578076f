//! Indexer tuning knobs.

use std::time::Duration;

use shop_store::Locale;

#[derive(Clone, Debug)]
pub struct IndexerConfig {
    /// Quiet period after an entity change before its job runs; bursty edits
    /// within the window coalesce into one embedding call.
    pub debounce: Duration,
    /// Pause between entities during bulk indexing, cooperative rate
    /// limiting toward the embedding provider.
    pub bulk_batch_delay: Duration,
    /// Locales indexed for every entity.
    pub locales: Vec<Locale>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            bulk_batch_delay: Duration::from_millis(200),
            locales: Locale::all().to_vec(),
        }
    }
}

impl IndexerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_u64("INDEX_DEBOUNCE_MS") {
            cfg.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("INDEX_BULK_DELAY_MS") {
            cfg.bulk_batch_delay = Duration::from_millis(ms);
        }
        cfg
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
