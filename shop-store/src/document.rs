//! Embedded documents kept in sync with catalog entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::SourceKind;
use crate::locale::Locale;
use crate::vector::EmbeddingVector;

/// Filterable attributes carried alongside an embedding.
///
/// Filters are applied after similarity scoring (they are cheap, embeddings
/// are not), so this stays a flat bag of optional fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocMetadata {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price_bucket: Option<String>,
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One embedded unit: the canonical text of an entity in one locale plus its
/// vector. At most one document exists per `(source_id, locale)`; the store
/// upserts on that key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub source_id: String,
    pub source_kind: SourceKind,
    pub locale: Locale,
    /// The exact string that was embedded, kept for debugging and re-embedding.
    pub text: String,
    pub embedding: EmbeddingVector,
    pub metadata: DocMetadata,
    pub updated_at: DateTime<Utc>,
}
