//! Provider-agnostic language-model service.
//!
//! The chat engine consumes the [`LanguageModel`] trait only; [`OllamaChat`]
//! is the bundled HTTP implementation. Generation comes in two shapes: one
//! complete pass ([`LanguageModel::generate`]) and a streaming pass yielding
//! [`StreamEvent`]s, both carrying parsed tool calls when the model proposes
//! any.

mod error;
mod ollama;
mod provider;
mod types;

pub use error::LlmError;
pub use ollama::{LlmConfig, OllamaChat};
pub use provider::{BoxFuture, LanguageModel};
pub use types::{
    ChatMessage, ChatRequest, ChatRole, GenerationOutput, StreamEvent, ToolCall, ToolSpec,
};
