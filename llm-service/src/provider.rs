//! The `LanguageModel` trait: the single seam between the chat engine and
//! whichever model vendor is configured.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::error::LlmError;
use crate::types::{ChatRequest, GenerationOutput, StreamEvent};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider-agnostic generation interface.
///
/// The core never depends on a vendor SDK beyond this shape: one complete
/// call, one streaming variant yielding incremental events.
pub trait LanguageModel: Send + Sync {
    /// Runs one complete generation pass.
    fn generate<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<GenerationOutput, LlmError>>;

    /// Starts a streaming pass; events arrive on the returned channel until
    /// [`StreamEvent::Done`].
    fn generate_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<mpsc::Receiver<StreamEvent>, LlmError>>;
}
