//! In-memory implementation of every repository trait.
//!
//! Cross-request state lives behind `std::sync::RwLock` maps; locks are never
//! held across an await point, so the sync primitives are safe inside the
//! async trait methods.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::chat::{ChatRole, Conversation, Message};
use crate::document::IndexedDocument;
use crate::entities::{KbArticle, Order, Product, SourceKind};
use crate::errors::StoreError;
use crate::locale::Locale;
use crate::repo::{
    ArticleRepo, BoxFuture, ConversationRepo, DocumentRepo, MessageRepo, OrderRepo, ProductRepo,
    StoreResult,
};

/// Process-local document store backing all collections.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<String, Product>>,
    articles: RwLock<HashMap<String, KbArticle>>,
    documents: RwLock<HashMap<(String, Locale), IndexedDocument>>,
    conversations: RwLock<HashMap<String, Conversation>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order; only the admin/test layer writes orders.
    pub fn insert_order(&self, order: Order) {
        self.orders
            .write()
            .expect("orders lock poisoned")
            .insert(order.id.clone(), order);
    }
}

fn lock_err(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} lock poisoned"))
}

impl ProductRepo for MemoryStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Product>>> {
        Box::pin(async move {
            let map = self.products.read().map_err(|_| lock_err("products"))?;
            Ok(map.get(id).cloned())
        })
    }

    fn get_many<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, StoreResult<Vec<Product>>> {
        Box::pin(async move {
            let map = self.products.read().map_err(|_| lock_err("products"))?;
            Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
        })
    }

    fn upsert(&self, product: Product) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.products.write().map_err(|_| lock_err("products"))?;
            map.insert(product.id.clone(), product);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.products.write().map_err(|_| lock_err("products"))?;
            map.remove(id);
            Ok(())
        })
    }

    fn list_published(&self) -> BoxFuture<'_, StoreResult<Vec<Product>>> {
        Box::pin(async move {
            let map = self.products.read().map_err(|_| lock_err("products"))?;
            let mut out: Vec<Product> =
                map.values().filter(|p| p.is_indexable()).cloned().collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(out)
        })
    }

    fn list_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<Product>>> {
        Box::pin(async move {
            let map = self.products.read().map_err(|_| lock_err("products"))?;
            let mut out: Vec<Product> = map
                .values()
                .filter(|p| p.is_indexable() && p.updated_at > since)
                .cloned()
                .collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(out)
        })
    }

    fn keyword_search<'a>(
        &'a self,
        query: &'a str,
        locale: Locale,
        limit: usize,
    ) -> BoxFuture<'a, StoreResult<Vec<Product>>> {
        Box::pin(async move {
            let needle = query.trim().to_lowercase();
            if needle.is_empty() {
                return Ok(Vec::new());
            }
            let map = self.products.read().map_err(|_| lock_err("products"))?;
            let mut out: Vec<Product> = map
                .values()
                .filter(|p| {
                    p.is_indexable() && {
                        let hay = format!(
                            "{}\n{}\n{}\n{}",
                            p.name.get(locale),
                            p.sku,
                            p.brand,
                            p.description.get(locale)
                        )
                        .to_lowercase();
                        hay.contains(&needle)
                    }
                })
                .cloned()
                .collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            out.truncate(limit);
            Ok(out)
        })
    }
}

impl ArticleRepo for MemoryStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<KbArticle>>> {
        Box::pin(async move {
            let map = self.articles.read().map_err(|_| lock_err("articles"))?;
            Ok(map.get(id).cloned())
        })
    }

    fn get_many<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, StoreResult<Vec<KbArticle>>> {
        Box::pin(async move {
            let map = self.articles.read().map_err(|_| lock_err("articles"))?;
            Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
        })
    }

    fn upsert(&self, article: KbArticle) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.articles.write().map_err(|_| lock_err("articles"))?;
            map.insert(article.id.clone(), article);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.articles.write().map_err(|_| lock_err("articles"))?;
            map.remove(id);
            Ok(())
        })
    }

    fn list_published(&self) -> BoxFuture<'_, StoreResult<Vec<KbArticle>>> {
        Box::pin(async move {
            let map = self.articles.read().map_err(|_| lock_err("articles"))?;
            let mut out: Vec<KbArticle> =
                map.values().filter(|a| a.is_indexable()).cloned().collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(out)
        })
    }

    fn list_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<KbArticle>>> {
        Box::pin(async move {
            let map = self.articles.read().map_err(|_| lock_err("articles"))?;
            let mut out: Vec<KbArticle> = map
                .values()
                .filter(|a| a.is_indexable() && a.updated_at > since)
                .cloned()
                .collect();
            out.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(out)
        })
    }
}

impl DocumentRepo for MemoryStore {
    fn upsert(&self, doc: IndexedDocument) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.documents.write().map_err(|_| lock_err("documents"))?;
            map.insert((doc.source_id.clone(), doc.locale), doc);
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        source_id: &'a str,
        locale: Locale,
    ) -> BoxFuture<'a, StoreResult<Option<IndexedDocument>>> {
        Box::pin(async move {
            let map = self.documents.read().map_err(|_| lock_err("documents"))?;
            Ok(map.get(&(source_id.to_string(), locale)).cloned())
        })
    }

    fn delete_for_source<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            let mut map = self.documents.write().map_err(|_| lock_err("documents"))?;
            let before = map.len();
            map.retain(|(id, _), _| id != source_id);
            Ok(before - map.len())
        })
    }

    fn has_any<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let map = self.documents.read().map_err(|_| lock_err("documents"))?;
            Ok(map.keys().any(|(id, _)| id == source_id))
        })
    }

    fn list_for_locale(
        &self,
        kind: SourceKind,
        locale: Locale,
        limit: usize,
    ) -> BoxFuture<'_, StoreResult<Vec<IndexedDocument>>> {
        Box::pin(async move {
            let map = self.documents.read().map_err(|_| lock_err("documents"))?;
            let mut out: Vec<IndexedDocument> = map
                .values()
                .filter(|d| d.source_kind == kind && d.locale == locale)
                .cloned()
                .collect();
            // Deterministic candidate order keeps scoring stable across runs.
            out.sort_by(|a, b| a.source_id.cmp(&b.source_id));
            out.truncate(limit);
            Ok(out)
        })
    }
}

impl ConversationRepo for MemoryStore {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<Option<Conversation>>> {
        Box::pin(async move {
            let map = self
                .conversations
                .read()
                .map_err(|_| lock_err("conversations"))?;
            Ok(map.get(id).cloned())
        })
    }

    fn find_by_session<'a>(
        &'a self,
        session_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Conversation>>> {
        Box::pin(async move {
            let map = self
                .conversations
                .read()
                .map_err(|_| lock_err("conversations"))?;
            Ok(map.values().find(|c| c.session_id == session_id).cloned())
        })
    }

    fn create(&self, conversation: Conversation) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self
                .conversations
                .write()
                .map_err(|_| lock_err("conversations"))?;
            if map.values().any(|c| c.session_id == conversation.session_id) {
                return Err(StoreError::Conflict(format!(
                    "session {} already has a conversation",
                    conversation.session_id
                )));
            }
            map.insert(conversation.id.clone(), conversation);
            Ok(())
        })
    }

    fn update(&self, conversation: Conversation) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self
                .conversations
                .write()
                .map_err(|_| lock_err("conversations"))?;
            if !map.contains_key(&conversation.id) {
                return Err(StoreError::NotFound(format!(
                    "conversation {}",
                    conversation.id
                )));
            }
            map.insert(conversation.id.clone(), conversation);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self
                .conversations
                .write()
                .map_err(|_| lock_err("conversations"))?;
            map.remove(id);
            Ok(())
        })
    }

    fn list_archived_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> BoxFuture<'_, StoreResult<Vec<Conversation>>> {
        Box::pin(async move {
            let map = self
                .conversations
                .read()
                .map_err(|_| lock_err("conversations"))?;
            Ok(map
                .values()
                .filter(|c| {
                    c.status == crate::chat::ConversationStatus::Archived
                        && c.last_message_at.is_some_and(|t| t < cutoff)
                })
                .cloned()
                .collect())
        })
    }
}

impl MessageRepo for MemoryStore {
    fn append(&self, message: Message) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut map = self.messages.write().map_err(|_| lock_err("messages"))?;
            map.entry(message.conversation_id.clone())
                .or_default()
                .push(message);
            Ok(())
        })
    }

    fn page<'a>(
        &'a self,
        conversation_id: &'a str,
        limit: usize,
        offset: usize,
        include_system: bool,
    ) -> BoxFuture<'a, StoreResult<Vec<Message>>> {
        Box::pin(async move {
            let map = self.messages.read().map_err(|_| lock_err("messages"))?;
            let mut out: Vec<Message> = map
                .get(conversation_id)
                .map(|v| v.as_slice())
                .unwrap_or_default()
                .iter()
                .filter(|m| include_system || m.role != ChatRole::System)
                .cloned()
                .collect();
            out.sort_by(|a, b| b.seq.cmp(&a.seq));
            Ok(out.into_iter().skip(offset).take(limit).collect())
        })
    }

    fn all<'a>(&'a self, conversation_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Message>>> {
        Box::pin(async move {
            let map = self.messages.read().map_err(|_| lock_err("messages"))?;
            let mut out: Vec<Message> = map.get(conversation_id).cloned().unwrap_or_default();
            out.sort_by(|a, b| a.seq.cmp(&b.seq));
            Ok(out)
        })
    }

    fn delete_for_conversation<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            let mut map = self.messages.write().map_err(|_| lock_err("messages"))?;
            Ok(map.remove(conversation_id).map(|v| v.len()).unwrap_or(0))
        })
    }
}

impl OrderRepo for MemoryStore {
    fn list_for_customer<'a>(
        &'a self,
        customer_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, StoreResult<Vec<Order>>> {
        Box::pin(async move {
            let map = self.orders.read().map_err(|_| lock_err("orders"))?;
            let mut out: Vec<Order> = map
                .values()
                .filter(|o| o.customer_id == customer_id)
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            out.truncate(limit);
            Ok(out)
        })
    }
}
