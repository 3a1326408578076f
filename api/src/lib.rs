//! HTTP surface of the storefront assistant: the chat endpoints, the CMS
//! entity hooks and the admin reindex path.

use std::env;
use std::sync::Arc;

mod core;
mod error_handler;
mod routes;

use axum::{Router, routing::post};
use tokio::signal;
use tracing::info;

pub use crate::core::app_state::AppState;
pub use crate::error_handler::{AppError, AppResult};
use crate::routes::{
    admin::reindex_route::reindex,
    chat::{chat_route::chat, chat_stream_route::chat_stream},
    hooks::entity_hooks_route::{entity_changed, entity_deleted},
};

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/hooks/entity-changed", post(entity_changed))
        .route("/hooks/entity-deleted", post(entity_deleted))
        .route("/admin/reindex", post(reindex))
        .with_state(state)
}

pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let state = Arc::new(AppState::from_env()?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(target: "api", %host_url, "listening");

    // Serve until Ctrl+C.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(target: "api", "failed to listen for shutdown signal: {e}");
    }
}
