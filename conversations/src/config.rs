use std::time::Duration;

/// Knobs for the conversation layer.
#[derive(Clone, Debug)]
pub struct ConversationConfig {
    /// Deadline applied to every storage call.
    pub store_timeout: Duration,
    /// Default page size for history reads.
    pub history_page: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            history_page: 50,
        }
    }
}

impl ConversationConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = std::env::var("CONV_STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.store_timeout = Duration::from_secs(secs);
        }
        if let Some(page) = std::env::var("CONV_HISTORY_PAGE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.history_page = page;
        }
        cfg
    }
}
