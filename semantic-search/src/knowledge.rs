//! Knowledge-base search: the product pipeline plus a keyword-overlap
//! re-rank.
//!
//! Policies and FAQs benefit more from exact term matching than product
//! descriptions do, so similarity-filtered hits get a small additive bonus
//! per query token found in the title or body before the final sort.

use embeddings::find_most_similar;
use shop_store::{Locale, SourceKind};
use tracing::{debug, warn};

use crate::search::{KnowledgeMatch, SearchFail, SemanticSearch};

/// Per-token additive bonus for title matches.
const TITLE_BONUS: f32 = 0.05;
/// Per-token additive bonus for body matches.
const BODY_BONUS: f32 = 0.02;

impl SemanticSearch {
    /// Ranked knowledge-base articles for `query`. Failures yield an empty
    /// list, like every other search entry point.
    pub async fn search_knowledge(
        &self,
        query: &str,
        locale: Locale,
        limit: usize,
        threshold: f32,
    ) -> Vec<KnowledgeMatch> {
        match self
            .search_knowledge_inner(query, locale, limit, threshold)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!(target: "semantic_search::knowledge", query, "knowledge search degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn search_knowledge_inner(
        &self,
        query: &str,
        locale: Locale,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<KnowledgeMatch>, SearchFail> {
        let query_vector = self.embeddings.embed(query).await?;
        let candidates = self
            .documents
            .list_for_locale(SourceKind::Article, locale, self.cfg.candidate_page)
            .await?;

        let scored = find_most_similar(
            &query_vector,
            candidates
                .into_iter()
                .map(|d| {
                    let vector = d.embedding.clone();
                    (d, vector)
                })
                .collect(),
            limit.saturating_mul(2),
            threshold,
        )?;

        let ids: Vec<String> = scored.iter().map(|s| s.item.source_id.clone()).collect();
        let articles = self.articles.get_many(&ids).await?;

        let tokens = query_tokens(query);
        let mut out: Vec<KnowledgeMatch> = Vec::new();
        for hit in scored {
            let Some(article) = articles.iter().find(|a| a.id == hit.item.source_id) else {
                continue;
            };

            let title = article.title.get(locale).to_lowercase();
            let body = article.body.get(locale).to_lowercase();
            let mut score = hit.similarity;
            for token in &tokens {
                if title.contains(token) {
                    score += TITLE_BONUS;
                }
                if body.contains(token) {
                    score += BODY_BONUS;
                }
            }

            out.push(KnowledgeMatch {
                article: article.clone(),
                similarity: score.min(1.0),
                matched_text: hit.item.text,
            });
        }

        out.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out.truncate(limit);

        debug!(
            target: "semantic_search::knowledge",
            query,
            hits = out.len(),
            "knowledge search done"
        );
        Ok(out)
    }
}

fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_string())
        .collect()
}
