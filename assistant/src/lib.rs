//! The conversational layer: a registry of callable storefront functions,
//! concurrent dispatch with per-call failure isolation, and the chat engine
//! that drives grounded model turns over it.

mod dispatch;
mod engine;
mod error;
mod format;
mod registry;

#[cfg(test)]
mod tests;

pub use dispatch::{FunctionOrchestrator, Identity};
pub use engine::{ChatChunk, ChatEngine, ChatError, ChatReply, EngineConfig};
pub use error::FunctionError;
pub use registry::{ArgKind, ArgSpec, FunctionSpec, builtin_functions};
