//! Conversation and message records, plus the ephemeral function-call types
//! attached to messages for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::locale::Locale;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
    Deleted,
}

/// A durable, session-addressable chat thread.
///
/// `message_count` and `last_message_at` are derived fields, updated together
/// with each appended message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Unique per browser/app session; lookup key for `get_or_create`.
    pub session_id: String,
    /// `None` for guests, the customer id for identified users.
    pub owner_id: Option<String>,
    pub locale: Locale,
    pub status: ConversationStatus,
    /// Derived from the first user message; `None` until one arrives.
    pub title: Option<String>,
    pub message_count: u64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// A model-issued request to invoke a named function.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Outcome of one dispatched function call, already formatted as text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "text")]
pub enum FunctionOutcome {
    Ok(String),
    Error(String),
}

impl FunctionOutcome {
    pub fn text(&self) -> &str {
        match self {
            FunctionOutcome::Ok(t) | FunctionOutcome::Error(t) => t,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FunctionOutcome::Error(_))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionResult {
    pub name: String,
    pub outcome: FunctionOutcome,
}

/// One immutable message within a conversation, ordered by `seq` ascending.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_results: Vec<FunctionResult>,
    pub tokens_used: Option<u32>,
    /// Monotonic per-conversation sequence number.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// The caller-supplied part of a message; ids, sequence numbers and
/// timestamps are assigned at append time.
#[derive(Clone, Debug)]
pub struct MessageDraft {
    pub role: ChatRole,
    pub content: String,
    pub function_calls: Vec<FunctionCall>,
    pub function_results: Vec<FunctionResult>,
    pub tokens_used: Option<u32>,
}

impl MessageDraft {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            function_calls: Vec::new(),
            function_results: Vec::new(),
            tokens_used: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }
}
