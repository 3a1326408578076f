//! POST /chat — one complete assistant turn.

use std::sync::Arc;

use assistant::Identity;
use axum::{Json, extract::State};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::{ChatRequestBody, ChatResponseBody},
};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/chat \
///   -H 'content-type: application/json' \
///   -d '{"session_id":"s1","message":"هل لديكم أنابيب بولي إيثيلين؟","locale":"ar"}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> AppResult<Json<ChatResponseBody>> {
    if body.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }

    let identity = Identity {
        customer_id: body.customer_id.clone(),
    };
    let reply = state
        .engine
        .respond(&body.session_id, &body.message, body.locale, &identity)
        .await?;

    Ok(Json(ChatResponseBody {
        conversation_id: reply.conversation_id,
        reply: reply.text,
        tokens: reply.tokens,
    }))
}
