use std::sync::Arc;

use chrono::Utc;
use embeddings::{
    BoxFuture, EmbedConfig, EmbedError, EmbedProvider, EmbeddingsService, VocabEmbedder,
};
use shop_store::{
    ArticleRepo, DocMetadata, DocumentRepo, IndexedDocument, KbArticle, Locale, LocalizedText,
    MemoryStore, Product, ProductRepo, PublishStatus, SourceKind,
};

use crate::{SearchConfig, SearchFilters, SemanticSearch};

fn product(id: &str, sku: &str, name: LocalizedText, description: LocalizedText) -> Product {
    Product {
        id: id.into(),
        sku: sku.into(),
        name,
        description,
        category: "polymers".into(),
        brand: "SABIC".into(),
        price: 900.0,
        currency: "USD".into(),
        in_stock: true,
        stock_qty: 20,
        status: PublishStatus::Published,
        updated_at: Utc::now(),
    }
}

fn product_text(p: &Product, locale: Locale) -> String {
    format!(
        "{} | {} | {}\nSKU: {}\n{}",
        p.name.get(locale),
        p.category,
        p.brand,
        p.sku,
        p.description.get(locale)
    )
}

async fn index_product(store: &MemoryStore, service: &EmbeddingsService, p: &Product) {
    for locale in Locale::all() {
        let text = product_text(p, locale);
        let embedding = service.embed(&text).await.unwrap();
        DocumentRepo::upsert(
            store,
            IndexedDocument {
                source_id: p.id.clone(),
                source_kind: SourceKind::Product,
                locale,
                text,
                embedding,
                metadata: DocMetadata::default(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }
}

async fn index_article(store: &MemoryStore, service: &EmbeddingsService, a: &KbArticle) {
    for locale in Locale::all() {
        let text = format!("{}\n{}", a.title.get(locale), a.body.get(locale));
        let embedding = service.embed(&text).await.unwrap();
        DocumentRepo::upsert(
            store,
            IndexedDocument {
                source_id: a.id.clone(),
                source_kind: SourceKind::Article,
                locale,
                text,
                embedding,
                metadata: DocMetadata::default(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }
}

async fn fixture(cfg: SearchConfig) -> (SemanticSearch, Arc<MemoryStore>, Arc<EmbeddingsService>) {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(EmbeddingsService::new(
        Arc::new(VocabEmbedder::new()),
        EmbedConfig::default(),
    ));

    let hdpe = product(
        "p1",
        "HDPE-P6006",
        LocalizedText::new("سابك بولي إيثيلين", "SABIC HDPE P6006"),
        LocalizedText::new(
            "أنابيب بولي إيثيلين",
            "High-density polyethylene resin for pipes",
        ),
    );
    let mut cable = product(
        "p2",
        "CBL-5MM",
        LocalizedText::new("كابل نحاس", "Copper Cable 5mm"),
        LocalizedText::new("كابل كهربائي", "Electrical copper cable"),
    );
    cable.category = "cables".into();
    cable.brand = "ElCab".into();
    cable.price = 40.0;

    let similar_hdpe = product(
        "p3",
        "HDPE-P4208",
        LocalizedText::new("بولي إيثيلين P4208", "HDPE P4208"),
        LocalizedText::new("بولي إيثيلين", "Polyethylene resin for pipes"),
    );

    for p in [&hdpe, &cable, &similar_hdpe] {
        ProductRepo::upsert(&*store, (*p).clone()).await.unwrap();
        index_product(&store, &service, p).await;
    }

    let search = SemanticSearch::new(
        service.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cfg,
    );
    (search, store, service)
}

#[tokio::test]
async fn arabic_query_finds_polyethylene_product() {
    let (search, _store, _service) = fixture(SearchConfig::default()).await;

    let hits = search
        .search(
            "أنابيب بولي إيثيلين",
            Locale::Ar,
            5,
            0.5,
            &SearchFilters::default(),
        )
        .await;

    assert!(!hits.is_empty());
    assert_eq!(hits[0].product.id, "p1");
    assert!(hits[0].similarity > 0.5);
    assert!(hits[0].matched_text.contains("بولي"));
}

#[tokio::test]
async fn nonsense_query_returns_empty_not_error() {
    let (search, _store, _service) = fixture(SearchConfig::default()).await;

    let hits = search
        .search(
            "zzz-nonexistent-term",
            Locale::En,
            5,
            0.7,
            &SearchFilters::default(),
        )
        .await;

    assert!(hits.is_empty());
}

#[tokio::test]
async fn hybrid_rescues_exact_sku_below_vector_threshold() {
    let cfg = SearchConfig {
        // Vector leg alone cannot clear this bar.
        default_threshold: 0.99,
        ..SearchConfig::default()
    };
    let (search, _store, _service) = fixture(cfg).await;

    let hits = search.hybrid_search("HDPE-P6006", Locale::En, 5).await;

    let rescued = hits.iter().find(|h| h.product.id == "p1");
    assert!(rescued.is_some(), "keyword leg should surface the exact SKU");
    assert_eq!(rescued.unwrap().similarity, 0.5);
}

#[tokio::test]
async fn both_legs_boost_is_capped() {
    let (search, _store, _service) = fixture(SearchConfig::default()).await;

    // The query is a substring of p1's Arabic description and its vector
    // similarity is already above 1.0 / 1.2, so an uncapped boost would
    // overshoot a perfect score.
    let hits = search
        .hybrid_search("أنابيب بولي إيثيلين", Locale::Ar, 5)
        .await;

    assert!(!hits.is_empty());
    assert_eq!(hits[0].product.id, "p1");
    assert_eq!(hits[0].similarity, 1.0);
    assert!(hits.iter().all(|h| h.similarity <= 1.0));
}

#[tokio::test]
async fn structured_filters_apply_after_scoring() {
    let (search, _store, _service) = fixture(SearchConfig::default()).await;

    let sabic_only = SearchFilters {
        brand: Some("SABIC".into()),
        ..SearchFilters::default()
    };
    let hits = search
        .search("polyethylene pipes", Locale::En, 5, 0.3, &sabic_only)
        .await;
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.product.brand == "SABIC"));

    let other_brand = SearchFilters {
        brand: Some("NoSuchBrand".into()),
        ..SearchFilters::default()
    };
    let hits = search
        .search("polyethylene pipes", Locale::En, 5, 0.3, &other_brand)
        .await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn find_similar_excludes_the_target() {
    let (search, _store, _service) = fixture(SearchConfig::default()).await;

    let hits = search.find_similar_to("p1", Locale::En, 5).await;

    assert!(hits.iter().all(|h| h.product.id != "p1"));
    assert!(hits.iter().any(|h| h.product.id == "p3"));
}

#[tokio::test]
async fn knowledge_title_overlap_outranks_plain_similarity() {
    let (search, store, service) = fixture(SearchConfig::default()).await;

    let body = LocalizedText::new(
        "يمكنك استرجاع المنتجات خلال ١٤ يوما",
        "You can return items within 14 days for a refund.",
    );
    let policy = KbArticle {
        id: "a1".into(),
        title: LocalizedText::new("سياسة الاسترجاع", "Return policy"),
        body: body.clone(),
        tags: vec!["returns".into()],
        status: PublishStatus::Published,
        updated_at: Utc::now(),
    };
    let overview = KbArticle {
        id: "a2".into(),
        title: LocalizedText::new("نظرة عامة", "Refunds overview"),
        body,
        tags: vec![],
        status: PublishStatus::Published,
        updated_at: Utc::now(),
    };
    for a in [&policy, &overview] {
        ArticleRepo::upsert(&*store, (*a).clone()).await.unwrap();
        index_article(&store, &service, a).await;
    }

    let hits = search
        .search_knowledge("return policy", Locale::En, 5, 0.2)
        .await;

    assert!(hits.len() >= 2);
    assert_eq!(hits[0].article.id, "a1");
    assert!(hits.iter().all(|h| h.similarity <= 1.0));
}

#[tokio::test]
async fn provider_failure_degrades_to_empty() {
    struct FailingProvider;
    impl EmbedProvider for FailingProvider {
        fn embed_batch<'a>(
            &'a self,
            _texts: &'a [String],
        ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedError>> {
            Box::pin(async { Err(EmbedError::Provider("backend down".into())) })
        }
    }

    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(EmbeddingsService::new(
        Arc::new(FailingProvider),
        EmbedConfig::default(),
    ));
    let search = SemanticSearch::new(
        service,
        store.clone(),
        store.clone(),
        store.clone(),
        SearchConfig::default(),
    );

    let hits = search
        .search("anything", Locale::En, 5, 0.1, &SearchFilters::default())
        .await;
    assert!(hits.is_empty());
}
