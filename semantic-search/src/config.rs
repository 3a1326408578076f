//! Search tuning knobs.

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Candidate page size loaded per query. The full corpus is never
    /// scored in one pass.
    pub candidate_page: usize,
    /// Threshold used where the caller does not supply one (hybrid and
    /// similar-to lookups).
    pub default_threshold: f32,
    /// Score assigned to keyword-only hits in hybrid search.
    pub keyword_score: f32,
    /// Multiplier for entities found by both legs, capped at 1.0.
    pub both_legs_boost: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_page: 500,
            default_threshold: 0.3,
            keyword_score: 0.5,
            both_legs_boost: 1.2,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(page) = std::env::var("SEARCH_CANDIDATE_PAGE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.candidate_page = page;
        }
        if let Some(t) = std::env::var("SEARCH_DEFAULT_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.default_threshold = t;
        }
        cfg
    }
}
