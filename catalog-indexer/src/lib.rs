//! Debounced catalog indexing.
//!
//! Converts mutable catalog entities (products, knowledge-base articles)
//! into embedded documents and keeps them consistent through cancellable
//! background jobs. The CMS layer talks to exactly two hooks:
//! [`CatalogIndexer::on_entity_changed`] and
//! [`CatalogIndexer::on_entity_deleted`]; bulk passes exist for recovery and
//! catch-up.

mod canonical;
mod config;
mod indexer;
mod queue;

pub use canonical::{article_text, product_text};
pub use config::IndexerConfig;
pub use indexer::{CatalogIndexer, IndexError, IndexReport};
pub use queue::SourceKey;
