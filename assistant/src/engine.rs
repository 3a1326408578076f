//! The chat engine: one user message in, one grounded assistant reply out.
//!
//! A turn is persist → generate → (dispatch functions → generate again) →
//! persist. The streaming variant runs the same shape as a state machine
//! that forwards text only once it is known whether function results will
//! precede it.

use std::sync::Arc;

use llm_service::{
    ChatMessage, ChatRequest, ChatRole as LlmRole, LanguageModel, LlmError, StreamEvent, ToolCall,
};
use shop_store::{
    ChatRole, Conversation, FunctionCall, FunctionResult, Locale, MessageDraft, StoreError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use conversations::ConversationManager;

use crate::dispatch::{FunctionOrchestrator, Identity};

const SYSTEM_PROMPT: &str = "You are the shopping assistant of an industrial supplies \
storefront. Use the available functions to look up products, prices, stock and policies \
instead of guessing. Ground every claim in function results. Keep answers short and concrete.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Outcome of a complete (non-streaming) turn.
#[derive(Clone, Debug)]
pub struct ChatReply {
    pub conversation_id: String,
    pub text: String,
    pub tokens: Option<u32>,
}

/// Incremental output of a streaming turn.
#[derive(Clone, Debug)]
pub enum ChatChunk {
    Delta(String),
    Done {
        conversation_id: String,
        tokens: Option<u32>,
    },
}

/// Where a streaming turn currently is. First-pass text is buffered in
/// `Streaming` and only released once the pass ends without tool calls;
/// `Dispatching` drops it.
enum TurnState {
    AwaitingModel,
    Streaming,
    Dispatching,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How many prior messages accompany each generation request.
    pub max_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_history: 20 }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = std::env::var("CHAT_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            cfg.max_history = n;
        }
        cfg
    }
}

#[derive(Clone)]
pub struct ChatEngine {
    llm: Arc<dyn LanguageModel>,
    conversations: Arc<ConversationManager>,
    functions: Arc<FunctionOrchestrator>,
    cfg: EngineConfig,
}

impl ChatEngine {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        conversations: Arc<ConversationManager>,
        functions: Arc<FunctionOrchestrator>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            llm,
            conversations,
            functions,
            cfg,
        }
    }

    /// Runs one complete turn and returns the final reply.
    pub async fn respond(
        &self,
        session_id: &str,
        user_text: &str,
        locale: Locale,
        identity: &Identity,
    ) -> Result<ChatReply, ChatError> {
        let conversation = self.begin_turn(session_id, user_text, locale, identity).await?;
        let mut request = self.build_request(&conversation, locale).await?;

        let first = self.llm.generate(&request).await?;
        if first.tool_calls.is_empty() {
            let mut draft = MessageDraft::assistant(first.text.clone());
            draft.tokens_used = first.tokens;
            self.conversations.append_message(&conversation.id, draft).await?;
            return Ok(ChatReply {
                conversation_id: conversation.id,
                text: first.text,
                tokens: first.tokens,
            });
        }

        let calls: Vec<FunctionCall> = first.tool_calls.into_iter().map(to_function_call).collect();
        let results = self.functions.execute_all(&calls, identity, locale).await;
        request.messages.push(ChatMessage::user(results_block(&results)));
        request.tools.clear();

        let second = self.llm.generate(&request).await?;
        let tokens = add_tokens(first.tokens, second.tokens);

        let mut draft = MessageDraft::assistant(second.text.clone());
        draft.function_calls = calls;
        draft.function_results = results;
        draft.tokens_used = tokens;
        self.conversations.append_message(&conversation.id, draft).await?;

        Ok(ChatReply {
            conversation_id: conversation.id,
            text: second.text,
            tokens,
        })
    }

    /// Runs one turn as a stream of [`ChatChunk`]s.
    ///
    /// Setup errors surface directly; once the stream is handed over, any
    /// failure is reported in-band and the channel always ends with
    /// [`ChatChunk::Done`].
    pub async fn respond_stream(
        &self,
        session_id: &str,
        user_text: &str,
        locale: Locale,
        identity: &Identity,
    ) -> Result<mpsc::Receiver<ChatChunk>, ChatError> {
        let conversation = self.begin_turn(session_id, user_text, locale, identity).await?;
        let request = self.build_request(&conversation, locale).await?;

        let (tx, rx) = mpsc::channel(32);
        let engine = self.clone();
        let identity = identity.clone();
        tokio::spawn(async move {
            let conversation_id = conversation.id.clone();
            if let Err(e) = engine
                .run_stream(conversation, request, identity, locale, &tx)
                .await
            {
                warn!(target: "assistant::engine", conversation_id, "streaming turn failed: {e}");
                let _ = tx
                    .send(ChatChunk::Delta(
                        "Sorry, something went wrong. Please try again.".to_string(),
                    ))
                    .await;
                let _ = tx
                    .send(ChatChunk::Done {
                        conversation_id,
                        tokens: None,
                    })
                    .await;
            }
        });
        Ok(rx)
    }

    async fn run_stream(
        &self,
        conversation: Conversation,
        mut request: ChatRequest,
        identity: Identity,
        locale: Locale,
        tx: &mpsc::Sender<ChatChunk>,
    ) -> Result<(), ChatError> {
        let mut events = self.llm.generate_stream(&request).await?;
        let mut state = TurnState::AwaitingModel;
        let mut text = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut tokens: Option<u32> = None;

        // First pass: nothing is sent downstream until it is known whether
        // function results will precede the reply.
        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::Delta(chunk) => match state {
                    TurnState::AwaitingModel | TurnState::Streaming => {
                        state = TurnState::Streaming;
                        text.push_str(&chunk);
                    }
                    // Pre-result filler is neither shown nor kept.
                    TurnState::Dispatching => {}
                },
                StreamEvent::ToolCalls(calls) => {
                    state = TurnState::Dispatching;
                    text.clear();
                    tool_calls = calls;
                }
                StreamEvent::Done { tokens: t } => {
                    tokens = add_tokens(tokens, t);
                    break;
                }
            }
        }

        if tool_calls.is_empty() {
            if !text.is_empty() {
                let _ = tx.send(ChatChunk::Delta(text.clone())).await;
            }
            let mut draft = MessageDraft::assistant(text);
            draft.tokens_used = tokens;
            self.conversations.append_message(&conversation.id, draft).await?;
            let _ = tx
                .send(ChatChunk::Done {
                    conversation_id: conversation.id,
                    tokens,
                })
                .await;
            return Ok(());
        }

        let calls: Vec<FunctionCall> = tool_calls.into_iter().map(to_function_call).collect();
        let results = self.functions.execute_all(&calls, &identity, locale).await;
        request.messages.push(ChatMessage::user(results_block(&results)));
        request.tools.clear();

        let mut events = self.llm.generate_stream(&request).await?;
        let mut final_text = String::new();
        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    final_text.push_str(&chunk);
                    let _ = tx.send(ChatChunk::Delta(chunk)).await;
                }
                // A second round of calls is not honored; the turn ends with
                // whatever text the model produced.
                StreamEvent::ToolCalls(_) => {}
                StreamEvent::Done { tokens: t } => {
                    tokens = add_tokens(tokens, t);
                    break;
                }
            }
        }

        let mut draft = MessageDraft::assistant(final_text);
        draft.function_calls = calls;
        draft.function_results = results;
        draft.tokens_used = tokens;
        self.conversations.append_message(&conversation.id, draft).await?;

        let _ = tx
            .send(ChatChunk::Done {
                conversation_id: conversation.id,
                tokens,
            })
            .await;
        Ok(())
    }

    /// Resolves the conversation and persists the incoming user message.
    async fn begin_turn(
        &self,
        session_id: &str,
        user_text: &str,
        locale: Locale,
        identity: &Identity,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .conversations
            .get_or_create(session_id, identity.customer_id.as_deref(), locale)
            .await?;
        self.conversations
            .append_message(&conversation.id, MessageDraft::user(user_text))
            .await?;
        debug!(
            target: "assistant::engine",
            conversation_id = %conversation.id,
            locale = %locale,
            "turn started"
        );
        Ok(conversation)
    }

    /// Prompt assembly: system instructions, a statistical summary when the
    /// history window is full, then the most recent turns.
    async fn build_request(
        &self,
        conversation: &Conversation,
        locale: Locale,
    ) -> Result<ChatRequest, ChatError> {
        let mut system = format!(
            "{SYSTEM_PROMPT} Respond in {}.",
            match locale {
                Locale::Ar => "Arabic",
                Locale::En => "English",
            }
        );
        if conversation.message_count as usize > self.cfg.max_history {
            let summary = self.conversations.summarize(&conversation.id).await?;
            system.push_str("\nEarlier context: ");
            system.push_str(&summary);
        }

        let history = self
            .conversations
            .history(&conversation.id, self.cfg.max_history, 0, false)
            .await?;
        let messages = history
            .into_iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => LlmRole::User,
                    ChatRole::Assistant => LlmRole::Assistant,
                    ChatRole::System => LlmRole::System,
                };
                ChatMessage::new(role, m.content)
            })
            .collect();

        Ok(ChatRequest {
            system: Some(system),
            messages,
            tools: self.functions.tool_specs(),
        })
    }
}

fn to_function_call(call: ToolCall) -> FunctionCall {
    FunctionCall {
        name: call.name,
        arguments: call.arguments,
    }
}

/// Results rendered as the follow-up turn the model answers from.
fn results_block(results: &[FunctionResult]) -> String {
    let mut block = String::from("Function results:\n");
    for result in results {
        block.push_str(&format!("[{}] {}\n", result.name, result.outcome.text()));
    }
    block.push_str("Answer the customer using only these results.");
    block
}

fn add_tokens(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (x, None) => x,
        (None, y) => y,
    }
}
