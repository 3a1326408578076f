//! POST /hooks/entity-changed and /hooks/entity-deleted — the two
//! notifications the CMS layer sends after a catalog write.
//!
//! Both return 202 immediately; indexing work happens in the background and
//! its failures are logged, never bounced back to the CMS.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use shop_store::SourceKind;

use crate::core::app_state::AppState;

/// Payload for both entity hooks.
#[derive(Debug, Deserialize)]
pub struct EntityHookBody {
    pub kind: SourceKind,
    pub id: String,
}

/// Handler: POST /hooks/entity-changed
pub async fn entity_changed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EntityHookBody>,
) -> StatusCode {
    state.indexer.on_entity_changed(body.kind, &body.id).await;
    StatusCode::ACCEPTED
}

/// Handler: POST /hooks/entity-deleted
pub async fn entity_deleted(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EntityHookBody>,
) -> StatusCode {
    state.indexer.on_entity_deleted(body.kind, &body.id).await;
    StatusCode::ACCEPTED
}
