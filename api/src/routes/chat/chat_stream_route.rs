//! POST /chat/stream — one assistant turn as server-sent events.

use std::convert::Infallible;
use std::sync::Arc;

use assistant::{ChatChunk, Identity};
use axum::{
    Json,
    extract::State,
    response::sse::{Event, Sse},
};
use serde_json::json;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::ChatRequestBody,
};

/// Handler: POST /chat/stream
///
/// Emits `message` events carrying text deltas, then one `done` event with
/// the conversation id and token count. Setup failures (storage, model
/// connectivity) surface as a regular error response before any event.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }

    let identity = Identity {
        customer_id: body.customer_id.clone(),
    };
    let rx = state
        .engine
        .respond_stream(&body.session_id, &body.message, body.locale, &identity)
        .await?;

    let events = ReceiverStream::new(rx).map(|chunk| {
        let event = match chunk {
            ChatChunk::Delta(text) => Event::default().data(text),
            ChatChunk::Done {
                conversation_id,
                tokens,
            } => Event::default().event("done").data(
                json!({ "conversation_id": conversation_id, "tokens": tokens }).to_string(),
            ),
        };
        Ok(event)
    });
    Ok(Sse::new(events))
}
