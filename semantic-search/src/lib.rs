//! Semantic + keyword hybrid retrieval with metadata filtering.
//!
//! [`SemanticSearch`] embeds the query, scores a bounded page of stored
//! documents by cosine similarity and resolves the survivors back to catalog
//! entities. Variants: [`SemanticSearch::hybrid_search`] (vector ∪ keyword),
//! [`SemanticSearch::find_similar_to`] (query = a stored embedding) and
//! [`SemanticSearch::search_knowledge`] (keyword-overlap re-rank for
//! policies/FAQs).

mod config;
mod filters;
mod hybrid;
mod knowledge;
mod search;

#[cfg(test)]
mod tests;

pub use config::SearchConfig;
pub use filters::SearchFilters;
pub use search::{KnowledgeMatch, SearchMatch, SemanticSearch};
