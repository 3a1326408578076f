//! Entity models, repository traits and the in-memory document store.
//!
//! This crate is the storage boundary of the workspace. Everything above it
//! (indexing, search, conversations, the chat engine) talks to narrow
//! repository traits; the concrete backing store is swappable. The bundled
//! [`MemoryStore`] implements every trait over `RwLock<HashMap>` maps and is
//! both the default runtime store and the test fixture.

mod chat;
mod document;
mod entities;
mod errors;
mod locale;
mod memory;
mod repo;
mod timeout;
mod vector;

pub use chat::{
    ChatRole, Conversation, ConversationStatus, FunctionCall, FunctionOutcome, FunctionResult,
    Message, MessageDraft,
};
pub use document::{DocMetadata, IndexedDocument};
pub use entities::{
    KbArticle, LocalizedText, Order, OrderItem, OrderStatus, Product, PublishStatus, SourceKind,
    price_bucket,
};
pub use errors::StoreError;
pub use locale::Locale;
pub use memory::MemoryStore;
pub use repo::{
    ArticleRepo, BoxFuture, ConversationRepo, DocumentRepo, MessageRepo, OrderRepo, ProductRepo,
    StoreResult,
};
pub use timeout::with_store_timeout;
pub use vector::EmbeddingVector;
