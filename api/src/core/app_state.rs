use std::sync::Arc;

use assistant::{ChatEngine, EngineConfig, FunctionOrchestrator};
use catalog_indexer::{CatalogIndexer, IndexerConfig};
use conversations::{ConversationConfig, ConversationManager};
use embeddings::{EmbedConfig, EmbeddingsService, HttpEmbedder, HttpEmbedderConfig};
use llm_service::{LlmConfig, OllamaChat};
use semantic_search::{SearchConfig, SemanticSearch};
use shop_store::MemoryStore;

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: ChatEngine,
    pub indexer: CatalogIndexer,
    pub conversations: Arc<ConversationManager>,
}

impl AppState {
    /// Wires the full service stack from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store)
    }

    /// Same wiring over a caller-provided store.
    pub fn with_store(store: Arc<MemoryStore>) -> Result<Self, AppError> {
        let embedder = HttpEmbedder::new(HttpEmbedderConfig::from_env())
            .map_err(|e| AppError::Startup(e.to_string()))?;
        let embeddings = Arc::new(EmbeddingsService::new(
            Arc::new(embedder),
            EmbedConfig::from_env(),
        ));

        let llm = OllamaChat::new(LlmConfig::from_env())
            .map_err(|e| AppError::Startup(e.to_string()))?;

        let indexer = CatalogIndexer::new(
            IndexerConfig::from_env(),
            embeddings.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        let search = Arc::new(SemanticSearch::new(
            embeddings,
            store.clone(),
            store.clone(),
            store.clone(),
            SearchConfig::from_env(),
        ));
        let conversations = Arc::new(ConversationManager::new(
            store.clone(),
            store.clone(),
            ConversationConfig::from_env(),
        ));
        let orchestrator = Arc::new(FunctionOrchestrator::new(
            search,
            store.clone(),
            store.clone(),
        ));
        let engine = ChatEngine::new(
            Arc::new(llm),
            conversations.clone(),
            orchestrator,
            EngineConfig::from_env(),
        );

        Ok(Self {
            engine,
            indexer,
            conversations,
        })
    }
}
