//! Conversation lifecycle on top of the storage traits: session-keyed
//! lookup, sequenced append with derived counters, chronological history
//! paging, token accounting and retention sweeps.

mod config;
mod manager;

pub use config::ConversationConfig;
pub use manager::ConversationManager;
