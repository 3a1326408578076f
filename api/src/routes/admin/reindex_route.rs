//! POST /admin/reindex — bulk recovery path for the search index.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_store::Locale;

use crate::{core::app_state::AppState, error_handler::AppResult};

#[derive(Debug, Deserialize)]
pub struct ReindexBody {
    /// When set, only entities updated at or after this instant are
    /// re-embedded; otherwise the whole catalog is.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub indexed: usize,
    pub failed: usize,
}

/// Handler: POST /admin/reindex
pub async fn reindex(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReindexBody>,
) -> AppResult<Json<ReindexResponse>> {
    let report = match body.since {
        Some(since) => state.indexer.reindex_since(since).await?,
        None => state.indexer.index_all(&Locale::all()).await?,
    };

    Ok(Json(ReindexResponse {
        indexed: report.indexed,
        failed: report.failed,
    }))
}
