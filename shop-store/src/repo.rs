//! Repository traits: the narrow storage interfaces the rest of the
//! workspace depends on.
//!
//! Traits use boxed futures so they stay object-safe and implementations can
//! be handed around as `Arc<dyn …>`.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::chat::{Conversation, Message};
use crate::document::IndexedDocument;
use crate::entities::{KbArticle, Order, Product, SourceKind};
use crate::errors::StoreError;
use crate::locale::Locale;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Products collection.
pub trait ProductRepo: Send + Sync {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Product>>>;

    /// Resolves several products at once, skipping unknown ids.
    fn get_many<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, StoreResult<Vec<Product>>>;

    fn upsert(&self, product: Product) -> BoxFuture<'_, StoreResult<()>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    fn list_published(&self) -> BoxFuture<'_, StoreResult<Vec<Product>>>;

    fn list_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<Product>>>;

    /// Case-insensitive substring match over name, SKU, brand and
    /// description; the keyword leg of hybrid search.
    fn keyword_search<'a>(
        &'a self,
        query: &'a str,
        locale: Locale,
        limit: usize,
    ) -> BoxFuture<'a, StoreResult<Vec<Product>>>;
}

/// Knowledge-base articles collection.
pub trait ArticleRepo: Send + Sync {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<KbArticle>>>;

    fn get_many<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, StoreResult<Vec<KbArticle>>>;

    fn upsert(&self, article: KbArticle) -> BoxFuture<'_, StoreResult<()>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    fn list_published(&self) -> BoxFuture<'_, StoreResult<Vec<KbArticle>>>;

    fn list_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<KbArticle>>>;
}

/// Embedded documents collection, keyed by `(source_id, locale)`.
pub trait DocumentRepo: Send + Sync {
    /// Inserts or replaces the document for its `(source_id, locale)` key.
    fn upsert(&self, doc: IndexedDocument) -> BoxFuture<'_, StoreResult<()>>;

    fn get<'a>(
        &'a self,
        source_id: &'a str,
        locale: Locale,
    ) -> BoxFuture<'a, StoreResult<Option<IndexedDocument>>>;

    /// Removes the documents for every locale of `source_id`; returns how
    /// many were deleted.
    fn delete_for_source<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, StoreResult<usize>>;

    /// Whether any locale of `source_id` is currently indexed.
    fn has_any<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, StoreResult<bool>>;

    /// A bounded candidate page for similarity scoring. Recall/latency
    /// trade-off lives in `limit`, not here.
    fn list_for_locale(
        &self,
        kind: SourceKind,
        locale: Locale,
        limit: usize,
    ) -> BoxFuture<'_, StoreResult<Vec<IndexedDocument>>>;
}

/// Conversations collection.
pub trait ConversationRepo: Send + Sync {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Conversation>>>;

    fn find_by_session<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Conversation>>>;

    fn create(&self, conversation: Conversation) -> BoxFuture<'_, StoreResult<()>>;

    fn update(&self, conversation: Conversation) -> BoxFuture<'_, StoreResult<()>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Archived conversations whose last activity precedes `cutoff`;
    /// feed for the retention sweep.
    fn list_archived_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<Conversation>>>;
}

/// Messages collection, owned exclusively by conversations.
pub trait MessageRepo: Send + Sync {
    fn append(&self, message: Message) -> BoxFuture<'_, StoreResult<()>>;

    /// One page, most-recent-first (callers reverse for chronological
    /// delivery).
    fn page<'a>(
        &'a self,
        conversation_id: &'a str,
        limit: usize,
        offset: usize,
        include_system: bool,
    ) -> BoxFuture<'a, StoreResult<Vec<Message>>>;

    /// Every message of a conversation, oldest first.
    fn all<'a>(&'a self, conversation_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Message>>>;

    fn delete_for_conversation<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<usize>>;
}

/// Past orders, read-only.
pub trait OrderRepo: Send + Sync {
    fn list_for_customer<'a>(
        &'a self,
        customer_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, StoreResult<Vec<Order>>>;
}
