//! Hybrid retrieval: the union of vector and keyword legs with asymmetric
//! scoring.
//!
//! Pure vector search misses exact SKU/brand strings when embeddings are
//! imprecise; pure keyword search misses paraphrase. The merged list keeps
//! vector similarities, gives keyword-only hits a fixed default score, and
//! boosts entities both legs agree on.

use std::collections::HashMap;

use shop_store::Locale;
use tracing::debug;

use crate::filters::SearchFilters;
use crate::search::{SearchMatch, SemanticSearch};

impl SemanticSearch {
    /// Vector and keyword search in parallel, merged by product id, sorted
    /// and truncated to `limit`. Failures in either leg degrade to that leg
    /// being empty.
    pub async fn hybrid_search(
        &self,
        query: &str,
        locale: Locale,
        limit: usize,
    ) -> Vec<SearchMatch> {
        let filters = SearchFilters::default();
        let (vector_hits, keyword_hits) = tokio::join!(
            self.search(query, locale, limit, self.cfg.default_threshold, &filters),
            async {
                match self.products.keyword_search(query, locale, limit).await {
                    Ok(hits) => hits,
                    Err(e) => {
                        tracing::warn!(
                            target: "semantic_search::hybrid",
                            query, "keyword leg degraded to empty: {e}"
                        );
                        Vec::new()
                    }
                }
            }
        );

        debug!(
            target: "semantic_search::hybrid",
            query,
            vector = vector_hits.len(),
            keyword = keyword_hits.len(),
            "merging legs"
        );

        let mut merged: Vec<SearchMatch> = Vec::with_capacity(vector_hits.len());
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for hit in vector_hits {
            by_id.insert(hit.product.id.clone(), merged.len());
            merged.push(hit);
        }

        for product in keyword_hits {
            match by_id.get(&product.id) {
                Some(&idx) => {
                    // Both legs agree; boost, bounded at a perfect score.
                    let boosted = merged[idx].similarity * self.cfg.both_legs_boost;
                    merged[idx].similarity = boosted.min(1.0);
                }
                None => {
                    let matched_text = product.name.get(locale).to_string();
                    merged.push(SearchMatch {
                        product,
                        similarity: self.cfg.keyword_score,
                        matched_text,
                    });
                }
            }
        }

        merged.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(limit);
        merged
    }
}
