//! Product vector search: embed, score a bounded candidate page, post-filter.

use std::sync::Arc;

use embeddings::{EmbedError, EmbeddingsService, find_most_similar};
use shop_store::{
    ArticleRepo, DocumentRepo, EmbeddingVector, IndexedDocument, Locale, Product, ProductRepo,
    SourceKind, StoreError,
};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::filters::SearchFilters;

/// One ranked product hit. The embedded text rides along for explainability.
#[derive(Clone, Debug)]
pub struct SearchMatch {
    pub product: Product,
    pub similarity: f32,
    pub matched_text: String,
}

/// One ranked knowledge-base hit.
#[derive(Clone, Debug)]
pub struct KnowledgeMatch {
    pub article: shop_store::KbArticle,
    pub similarity: f32,
    pub matched_text: String,
}

pub(crate) enum SearchFail {
    Embed(EmbedError),
    Store(StoreError),
}

impl From<EmbedError> for SearchFail {
    fn from(e: EmbedError) -> Self {
        SearchFail::Embed(e)
    }
}

impl From<StoreError> for SearchFail {
    fn from(e: StoreError) -> Self {
        SearchFail::Store(e)
    }
}

impl std::fmt::Display for SearchFail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchFail::Embed(e) => write!(f, "embedding: {e}"),
            SearchFail::Store(e) => write!(f, "store: {e}"),
        }
    }
}

/// Semantic retrieval over the embedded catalog.
///
/// Every public method recovers failures to an empty result list: the
/// calling assistant must degrade to "no results", never crash the turn.
pub struct SemanticSearch {
    pub(crate) embeddings: Arc<EmbeddingsService>,
    pub(crate) products: Arc<dyn ProductRepo>,
    pub(crate) articles: Arc<dyn ArticleRepo>,
    pub(crate) documents: Arc<dyn DocumentRepo>,
    pub(crate) cfg: SearchConfig,
}

impl SemanticSearch {
    pub fn new(
        embeddings: Arc<EmbeddingsService>,
        products: Arc<dyn ProductRepo>,
        articles: Arc<dyn ArticleRepo>,
        documents: Arc<dyn DocumentRepo>,
        cfg: SearchConfig,
    ) -> Self {
        Self {
            embeddings,
            products,
            articles,
            documents,
            cfg,
        }
    }

    /// Ranked products for `query`, similarity ≥ `threshold`, post-filtered
    /// by `filters`, at most `limit` entries. Failures yield an empty list.
    pub async fn search(
        &self,
        query: &str,
        locale: Locale,
        limit: usize,
        threshold: f32,
        filters: &SearchFilters,
    ) -> Vec<SearchMatch> {
        match self
            .search_products_inner(query, locale, limit, threshold, filters)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!(target: "semantic_search::search", query, "search degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    /// Ranked products similar to an already-indexed entity. The query vector
    /// is the target's stored embedding; the target itself is excluded.
    pub async fn find_similar_to(
        &self,
        entity_id: &str,
        locale: Locale,
        limit: usize,
    ) -> Vec<SearchMatch> {
        let result: Result<Vec<SearchMatch>, SearchFail> = async {
            let Some(target) = self.documents.get(entity_id, locale).await? else {
                debug!(target: "semantic_search::search", entity_id, "no document for similar-to target");
                return Ok(Vec::new());
            };

            let candidates = self
                .documents
                .list_for_locale(SourceKind::Product, locale, self.cfg.candidate_page)
                .await?
                .into_iter()
                .filter(|d| d.source_id != entity_id)
                .collect();

            self.rank_product_candidates(
                &target.embedding,
                candidates,
                limit,
                self.cfg.default_threshold,
                &SearchFilters::default(),
            )
            .await
        }
        .await;

        match result {
            Ok(matches) => matches,
            Err(e) => {
                warn!(target: "semantic_search::search", entity_id, "similar-to degraded to empty: {e}");
                Vec::new()
            }
        }
    }

    async fn search_products_inner(
        &self,
        query: &str,
        locale: Locale,
        limit: usize,
        threshold: f32,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchMatch>, SearchFail> {
        let query_vector = self.embeddings.embed(query).await?;
        let candidates = self
            .documents
            .list_for_locale(SourceKind::Product, locale, self.cfg.candidate_page)
            .await?;

        debug!(
            target: "semantic_search::search",
            query,
            candidates = candidates.len(),
            "scoring product candidates"
        );
        self.rank_product_candidates(&query_vector, candidates, limit, threshold, filters)
            .await
    }

    /// Shared ranking tail: score, keep a `2 × limit` superset, resolve
    /// entities, post-filter, truncate.
    async fn rank_product_candidates(
        &self,
        query_vector: &EmbeddingVector,
        candidates: Vec<IndexedDocument>,
        limit: usize,
        threshold: f32,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchMatch>, SearchFail> {
        let scored = find_most_similar(
            query_vector,
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
        let products = self.products.get_many(&ids).await?;

        let mut out = Vec::with_capacity(limit);
        for hit in scored {
            let Some(product) = products.iter().find(|p| p.id == hit.item.source_id) else {
                continue;
            };
            if !filters.matches(product) {
                continue;
            }
            out.push(SearchMatch {
                product: product.clone(),
                similarity: hit.similarity,
                matched_text: hit.item.text,
            });
            if out.len() == limit {
                break;
            }
        }
        Ok(out)
    }
}
