//! Wire-neutral chat types shared by every provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Schema-described function the model may request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments.
    pub parameters: Value,
}

/// A function invocation proposed by the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// One generation request: optional system prompt, prior turns, and the
/// tools the model may call.
#[derive(Clone, Debug, Default)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// Outcome of a non-streaming generation pass.
#[derive(Clone, Debug, Default)]
pub struct GenerationOutput {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// Tokens the provider reports for this pass, when it reports any.
    pub tokens: Option<u32>,
}

/// Incremental event from a streaming generation pass.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// A chunk of assistant text.
    Delta(String),
    /// The model requested function calls; no further text precedes results.
    ToolCalls(Vec<ToolCall>),
    /// Generation finished.
    Done { tokens: Option<u32> },
}
