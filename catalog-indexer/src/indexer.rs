//! The indexer: entity-change hooks, debounced jobs, bulk re-indexing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use embeddings::{EmbedError, EmbeddingsService};
use futures::future::join_all;
use shop_store::{
    ArticleRepo, DocumentRepo, IndexedDocument, Locale, ProductRepo, SourceKind, StoreError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::canonical;
use crate::config::IndexerConfig;
use crate::queue::{DebounceQueue, SourceKey};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

/// Counts from a bulk indexing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub failed: usize,
}

/// Keeps one [`IndexedDocument`] per `(entity, locale)` synchronized with
/// entity state.
///
/// Change notifications never block on embedding work: eligible changes are
/// debounced into background jobs, and job failures are logged and cleared
/// rather than propagated. The triggering write already completed, and
/// [`CatalogIndexer::index_all`] exists for recovery.
#[derive(Clone)]
pub struct CatalogIndexer {
    inner: Arc<Inner>,
}

struct Inner {
    cfg: IndexerConfig,
    embeddings: Arc<EmbeddingsService>,
    products: Arc<dyn ProductRepo>,
    articles: Arc<dyn ArticleRepo>,
    documents: Arc<dyn DocumentRepo>,
    queue: DebounceQueue,
}

impl CatalogIndexer {
    pub fn new(
        cfg: IndexerConfig,
        embeddings: Arc<EmbeddingsService>,
        products: Arc<dyn ProductRepo>,
        articles: Arc<dyn ArticleRepo>,
        documents: Arc<dyn DocumentRepo>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                embeddings,
                products,
                articles,
                documents,
                queue: DebounceQueue::default(),
            }),
        }
    }

    /// CMS hook: an entity was created or updated.
    ///
    /// Eligible entities get a debounced indexing job (superseding any
    /// pending one); entities that stopped being eligible lose their
    /// documents right away.
    pub async fn on_entity_changed(&self, kind: SourceKind, id: &str) {
        let key = SourceKey::new(kind, id);

        let eligible = match self.inner.is_eligible(&key).await {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    target: "catalog_indexer::hooks",
                    id, "eligibility check failed, skipping: {e}"
                );
                return;
            }
        };

        if !eligible {
            self.inner.queue.cancel(&key);
            match self.inner.documents.has_any(&key.id).await {
                Ok(true) => {
                    if let Err(e) = self.inner.documents.delete_for_source(&key.id).await {
                        warn!(
                            target: "catalog_indexer::hooks",
                            id, "failed to drop documents of ineligible entity: {e}"
                        );
                    } else {
                        debug!(target: "catalog_indexer::hooks", id, "dropped documents of ineligible entity");
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(target: "catalog_indexer::hooks", id, "document lookup failed: {e}"),
            }
            return;
        }

        self.schedule(key);
    }

    /// CMS hook: an entity was deleted. Pending work is cancelled and every
    /// locale's document is removed immediately, no debounce.
    pub async fn on_entity_deleted(&self, kind: SourceKind, id: &str) {
        let key = SourceKey::new(kind, id);
        self.inner.queue.cancel(&key);

        match self.inner.documents.delete_for_source(id).await {
            Ok(removed) => {
                debug!(target: "catalog_indexer::hooks", id, removed, "documents removed after entity delete");
            }
            Err(e) => {
                warn!(target: "catalog_indexer::hooks", id, "document delete failed: {e}");
            }
        }
    }

    /// Indexes every eligible product and article for `locales`, pausing
    /// between entities to respect provider rate limits.
    ///
    /// # Errors
    /// Fails only if the entity listings themselves cannot be read;
    /// per-entity failures are logged and counted in the report.
    pub async fn index_all(&self, locales: &[Locale]) -> Result<IndexReport, IndexError> {
        let mut keys: Vec<SourceKey> = Vec::new();
        for p in self.inner.products.list_published().await? {
            keys.push(SourceKey::new(SourceKind::Product, p.id));
        }
        for a in self.inner.articles.list_published().await? {
            keys.push(SourceKey::new(SourceKind::Article, a.id));
        }
        info!(target: "catalog_indexer::bulk", entities = keys.len(), "index_all: start");
        Ok(self.run_bulk(keys, locales).await)
    }

    /// Incremental catch-up: entities updated after `since` only.
    pub async fn reindex_since(&self, since: DateTime<Utc>) -> Result<IndexReport, IndexError> {
        let mut keys: Vec<SourceKey> = Vec::new();
        for p in self.inner.products.list_updated_since(since).await? {
            keys.push(SourceKey::new(SourceKind::Product, p.id));
        }
        for a in self.inner.articles.list_updated_since(since).await? {
            keys.push(SourceKey::new(SourceKind::Article, a.id));
        }
        info!(
            target: "catalog_indexer::bulk",
            entities = keys.len(),
            since = %since,
            "reindex_since: start"
        );
        let locales = self.inner.cfg.locales.clone();
        Ok(self.run_bulk(keys, &locales).await)
    }

    async fn run_bulk(&self, keys: Vec<SourceKey>, locales: &[Locale]) -> IndexReport {
        let mut report = IndexReport::default();
        for key in keys {
            match self.inner.index_entity(&key, locales).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(target: "catalog_indexer::bulk", id = %key.id, "bulk index failed: {e}");
                }
            }
            tokio::time::sleep(self.inner.cfg.bulk_batch_delay).await;
        }
        info!(
            target: "catalog_indexer::bulk",
            indexed = report.indexed,
            failed = report.failed,
            "bulk pass done"
        );
        report
    }

    fn schedule(&self, key: SourceKey) {
        let generation = self.inner.queue.next_generation();
        let inner = self.inner.clone();
        let job_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.cfg.debounce).await;
            // Past the window the job flips to running and can no longer be
            // aborted, only superseded after it completes.
            if !inner.queue.begin(&job_key, generation) {
                return;
            }
            if let Err(e) = inner.index_entity(&job_key, &inner.cfg.locales).await {
                warn!(target: "catalog_indexer::queue", id = %job_key.id, "indexing job failed: {e}");
            }
            inner.queue.clear(&job_key, generation);
        });

        debug!(target: "catalog_indexer::queue", id = %key.id, "job scheduled");
        self.inner
            .queue
            .register(key, generation, handle.abort_handle());
    }

    #[cfg(test)]
    fn pending_jobs(&self) -> usize {
        self.inner.queue.pending()
    }
}

impl Inner {
    async fn is_eligible(&self, key: &SourceKey) -> Result<bool, IndexError> {
        Ok(match key.kind {
            SourceKind::Product => self
                .products
                .get(&key.id)
                .await?
                .is_some_and(|p| p.is_indexable()),
            SourceKind::Article => self
                .articles
                .get(&key.id)
                .await?
                .is_some_and(|a| a.is_indexable()),
        })
    }

    /// Indexes one entity for all `locales`, locales concurrently.
    async fn index_entity(&self, key: &SourceKey, locales: &[Locale]) -> Result<(), IndexError> {
        let results = join_all(
            locales
                .iter()
                .map(|locale| self.index_locale(key, *locale)),
        )
        .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    async fn index_locale(&self, key: &SourceKey, locale: Locale) -> Result<(), IndexError> {
        let (text, metadata) = match key.kind {
            SourceKind::Product => {
                let Some(product) = self.products.get(&key.id).await? else {
                    return Ok(());
                };
                if !product.is_indexable() {
                    return Ok(());
                }
                (
                    canonical::product_text(&product, locale),
                    canonical::product_metadata(&product),
                )
            }
            SourceKind::Article => {
                let Some(article) = self.articles.get(&key.id).await? else {
                    return Ok(());
                };
                if !article.is_indexable() {
                    return Ok(());
                }
                (
                    canonical::article_text(&article, locale),
                    canonical::article_metadata(&article),
                )
            }
        };

        let embedding = self.embeddings.embed(&text).await?;
        self.documents
            .upsert(IndexedDocument {
                source_id: key.id.clone(),
                source_kind: key.kind,
                locale,
                text,
                embedding,
                metadata,
                updated_at: Utc::now(),
            })
            .await?;

        debug!(target: "catalog_indexer::job", id = %key.id, locale = %locale, "document upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embeddings::{CountingEmbedder, EmbedConfig, VocabEmbedder};
    use shop_store::{LocalizedText, MemoryStore, Product, PublishStatus};
    use std::time::Duration;

    fn product(id: &str, status: PublishStatus) -> Product {
        Product {
            id: id.into(),
            sku: format!("SKU-{id}"),
            name: LocalizedText::new("أنابيب", "Pipes"),
            description: LocalizedText::new("بولي إيثيلين", "Polyethylene"),
            category: "polymers".into(),
            brand: "SABIC".into(),
            price: 100.0,
            currency: "USD".into(),
            in_stock: true,
            stock_qty: 3,
            status,
            updated_at: Utc::now(),
        }
    }

    fn fixture(debounce_ms: u64) -> (CatalogIndexer, Arc<MemoryStore>, Arc<CountingEmbedder>) {
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(CountingEmbedder::new(Arc::new(VocabEmbedder::new())));
        let embeddings = Arc::new(EmbeddingsService::new(
            counter.clone(),
            EmbedConfig::default(),
        ));
        let cfg = IndexerConfig {
            debounce: Duration::from_millis(debounce_ms),
            bulk_batch_delay: Duration::from_millis(1),
            locales: vec![Locale::En],
        };
        let indexer = CatalogIndexer::new(
            cfg,
            embeddings,
            store.clone(),
            store.clone(),
            store.clone(),
        );
        (indexer, store, counter)
    }

    #[tokio::test]
    async fn rapid_changes_coalesce_into_one_embedding_call() {
        let (indexer, store, counter) = fixture(50);
        ProductRepo::upsert(&*store, product("p1", PublishStatus::Published))
            .await
            .unwrap();

        for _ in 0..5 {
            indexer.on_entity_changed(SourceKind::Product, "p1").await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(counter.calls(), 1);
        assert!(store.has_any("p1").await.unwrap());
        assert_eq!(indexer.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn delete_within_debounce_window_cancels_everything() {
        let (indexer, store, counter) = fixture(100);
        ProductRepo::upsert(&*store, product("p1", PublishStatus::Published))
            .await
            .unwrap();

        indexer.on_entity_changed(SourceKind::Product, "p1").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        indexer.on_entity_changed(SourceKind::Product, "p1").await;
        indexer.on_entity_deleted(SourceKind::Product, "p1").await;

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(counter.calls(), 0);
        assert!(!store.has_any("p1").await.unwrap());
    }

    #[tokio::test]
    async fn unpublishing_drops_existing_documents() {
        let (indexer, store, _counter) = fixture(10);
        ProductRepo::upsert(&*store, product("p1", PublishStatus::Published))
            .await
            .unwrap();
        indexer.on_entity_changed(SourceKind::Product, "p1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.has_any("p1").await.unwrap());

        ProductRepo::upsert(&*store, product("p1", PublishStatus::Draft))
            .await
            .unwrap();
        indexer.on_entity_changed(SourceKind::Product, "p1").await;

        assert!(!store.has_any("p1").await.unwrap());
    }

    #[tokio::test]
    async fn entity_delete_removes_all_locales() {
        let store = Arc::new(MemoryStore::new());
        let embeddings = Arc::new(EmbeddingsService::new(
            Arc::new(VocabEmbedder::new()),
            EmbedConfig::default(),
        ));
        let indexer = CatalogIndexer::new(
            IndexerConfig {
                debounce: Duration::from_millis(10),
                bulk_batch_delay: Duration::from_millis(1),
                locales: Locale::all().to_vec(),
            },
            embeddings,
            store.clone(),
            store.clone(),
            store.clone(),
        );

        ProductRepo::upsert(&*store, product("p9", PublishStatus::Published))
            .await
            .unwrap();
        indexer.on_entity_changed(SourceKind::Product, "p9").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let en = DocumentRepo::get(&*store, "p9", Locale::En).await.unwrap();
        let ar = DocumentRepo::get(&*store, "p9", Locale::Ar).await.unwrap();
        assert!(en.is_some() && ar.is_some());

        indexer.on_entity_deleted(SourceKind::Product, "p9").await;
        assert!(!store.has_any("p9").await.unwrap());
    }

    #[tokio::test]
    async fn job_past_its_window_survives_a_successor() {
        use embeddings::{BoxFuture, EmbedError, EmbedProvider};
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct SlowProvider {
            completed: AtomicUsize,
        }
        impl EmbedProvider for SlowProvider {
            fn embed_batch<'a>(
                &'a self,
                texts: &'a [String],
            ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>> {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    self.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(texts.iter().map(|_| vec![1.0]).collect())
                })
            }
        }

        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(SlowProvider::default());
        let embeddings = Arc::new(EmbeddingsService::new(
            provider.clone(),
            EmbedConfig::default(),
        ));
        let indexer = CatalogIndexer::new(
            IndexerConfig {
                debounce: Duration::from_millis(10),
                bulk_batch_delay: Duration::from_millis(1),
                locales: vec![Locale::En],
            },
            embeddings,
            store.clone(),
            store.clone(),
            store.clone(),
        );
        ProductRepo::upsert(&*store, product("p1", PublishStatus::Published))
            .await
            .unwrap();

        indexer.on_entity_changed(SourceKind::Product, "p1").await;
        // First job is past its debounce sleep and inside the provider call.
        tokio::time::sleep(Duration::from_millis(40)).await;
        indexer.on_entity_changed(SourceKind::Product, "p1").await;

        tokio::time::sleep(Duration::from_millis(300)).await;

        // The running job finished instead of being aborted mid-flight.
        assert_eq!(provider.completed.load(Ordering::SeqCst), 2);
        assert!(store.has_any("p1").await.unwrap());
        assert_eq!(indexer.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn index_all_counts_eligible_entities() {
        let (indexer, store, _counter) = fixture(10);
        ProductRepo::upsert(&*store, product("p1", PublishStatus::Published))
            .await
            .unwrap();
        ProductRepo::upsert(&*store, product("p2", PublishStatus::Published))
            .await
            .unwrap();
        ProductRepo::upsert(&*store, product("p3", PublishStatus::Draft))
            .await
            .unwrap();

        let report = indexer.index_all(&[Locale::En]).await.unwrap();
        assert_eq!(report, IndexReport { indexed: 2, failed: 0 });
    }
}
