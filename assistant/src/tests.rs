use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use conversations::{ConversationConfig, ConversationManager};
use embeddings::{EmbedConfig, EmbeddingsService, VocabEmbedder};
use llm_service::{
    BoxFuture, ChatRequest, GenerationOutput, LanguageModel, LlmError, StreamEvent, ToolCall,
};
use semantic_search::{SearchConfig, SemanticSearch};
use serde_json::json;
use shop_store::{
    ChatRole, DocMetadata, DocumentRepo, FunctionCall, IndexedDocument, Locale, LocalizedText,
    MemoryStore, Order, OrderItem, OrderStatus, Product, ProductRepo, PublishStatus, SourceKind,
};
use tokio::sync::mpsc;

use crate::dispatch::{FunctionOrchestrator, Identity};
use crate::engine::{ChatChunk, ChatEngine, EngineConfig};

/// Plays back a fixed sequence of generation outputs, one per model call.
struct ScriptedModel {
    outputs: Mutex<VecDeque<GenerationOutput>>,
}

impl ScriptedModel {
    fn new(outputs: Vec<GenerationOutput>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
        }
    }

    fn next_output(&self) -> GenerationOutput {
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .expect("model script exhausted")
    }
}

impl LanguageModel for ScriptedModel {
    fn generate<'a>(
        &'a self,
        _request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<GenerationOutput, LlmError>> {
        Box::pin(async move { Ok(self.next_output()) })
    }

    fn generate_stream<'a>(
        &'a self,
        _request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<mpsc::Receiver<StreamEvent>, LlmError>> {
        Box::pin(async move {
            let output = self.next_output();
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                if !output.text.is_empty() {
                    // Two chunks so forwarding order is observable.
                    let mid = output.text.len() / 2;
                    let (a, b) = output.text.split_at(mid);
                    let _ = tx.send(StreamEvent::Delta(a.to_string())).await;
                    let _ = tx.send(StreamEvent::Delta(b.to_string())).await;
                }
                if !output.tool_calls.is_empty() {
                    let _ = tx.send(StreamEvent::ToolCalls(output.tool_calls)).await;
                }
                let _ = tx
                    .send(StreamEvent::Done {
                        tokens: output.tokens,
                    })
                    .await;
            });
            Ok(rx)
        })
    }
}

fn text_output(text: &str, tokens: u32) -> GenerationOutput {
    GenerationOutput {
        text: text.to_string(),
        tool_calls: Vec::new(),
        tokens: Some(tokens),
    }
}

fn tool_output(calls: Vec<ToolCall>, tokens: u32) -> GenerationOutput {
    GenerationOutput {
        text: String::new(),
        tool_calls: calls,
        tokens: Some(tokens),
    }
}

fn filler_then_tools(text: &str, calls: Vec<ToolCall>, tokens: u32) -> GenerationOutput {
    GenerationOutput {
        text: text.to_string(),
        tool_calls: calls,
        tokens: Some(tokens),
    }
}

fn call(name: &str, args: serde_json::Value) -> FunctionCall {
    FunctionCall {
        name: name.to_string(),
        arguments: args.as_object().cloned().unwrap_or_default(),
    }
}

fn hdpe_product() -> Product {
    Product {
        id: "p1".into(),
        sku: "HDPE-P6006".into(),
        name: LocalizedText::new("بولي إيثيلين", "HDPE P6006"),
        description: LocalizedText::new(
            "أنابيب بولي إيثيلين",
            "High-density polyethylene for pipes",
        ),
        category: "polymers".into(),
        brand: "SABIC".into(),
        price: 950.0,
        currency: "USD".into(),
        in_stock: true,
        stock_qty: 12,
        status: PublishStatus::Published,
        updated_at: Utc::now(),
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    orchestrator: Arc<FunctionOrchestrator>,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let embeddings = Arc::new(EmbeddingsService::new(
        Arc::new(VocabEmbedder::new()),
        EmbedConfig::default(),
    ));

    let product = hdpe_product();
    ProductRepo::upsert(&*store, product.clone()).await.unwrap();
    for locale in Locale::all() {
        let text = format!(
            "{} | {} | {}\nSKU: {}\n{}",
            product.name.get(locale),
            product.category,
            product.brand,
            product.sku,
            product.description.get(locale)
        );
        let embedding = embeddings.embed(&text).await.unwrap();
        DocumentRepo::upsert(
            &*store,
            IndexedDocument {
                source_id: product.id.clone(),
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

    let search = Arc::new(SemanticSearch::new(
        embeddings,
        store.clone(),
        store.clone(),
        store.clone(),
        SearchConfig::default(),
    ));
    let orchestrator = Arc::new(FunctionOrchestrator::new(
        search,
        store.clone(),
        store.clone(),
    ));
    Fixture {
        store,
        orchestrator,
    }
}

fn engine_with(fx: &Fixture, outputs: Vec<GenerationOutput>) -> ChatEngine {
    let conversations = Arc::new(ConversationManager::new(
        fx.store.clone(),
        fx.store.clone(),
        ConversationConfig::default(),
    ));
    ChatEngine::new(
        Arc::new(ScriptedModel::new(outputs)),
        conversations,
        fx.orchestrator.clone(),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn failing_call_does_not_poison_its_siblings() {
    let fx = fixture().await;
    let calls = vec![
        call("check_stock", json!({ "product_id": "p1" })),
        call("do_magic", json!({})),
    ];
    let results = fx
        .orchestrator
        .execute_all(&calls, &Identity::guest(), Locale::En)
        .await;

    assert_eq!(results.len(), 2);
    assert!(!results[0].outcome.is_error());
    assert!(results[0].outcome.text().contains("in stock (12 available)"));
    assert!(results[1].outcome.is_error());
    assert!(results[1].outcome.text().contains("unknown function"));
}

#[tokio::test]
async fn order_history_requires_sign_in() {
    let fx = fixture().await;
    fx.store.insert_order(Order {
        id: "ord-1".into(),
        customer_id: "cust-7".into(),
        items: vec![OrderItem {
            product_id: "p1".into(),
            name: "HDPE P6006".into(),
            quantity: 3,
            unit_price: 950.0,
        }],
        total: 2850.0,
        currency: "USD".into(),
        status: OrderStatus::Delivered,
        created_at: Utc::now(),
    });
    let calls = vec![call("get_order_history", json!({}))];

    let guest = fx
        .orchestrator
        .execute_all(&calls, &Identity::guest(), Locale::En)
        .await;
    assert!(guest[0].outcome.is_error());
    assert!(guest[0].outcome.text().contains("sign in"));

    let signed_in = fx
        .orchestrator
        .execute_all(&calls, &Identity::customer("cust-7"), Locale::En)
        .await;
    assert!(!signed_in[0].outcome.is_error());
    assert!(signed_in[0].outcome.text().contains("ord-1"));
}

#[tokio::test]
async fn invalid_arguments_surface_as_error_results() {
    let fx = fixture().await;
    let calls = vec![call("get_quote", json!({ "product_id": "p1" }))];
    let results = fx
        .orchestrator
        .execute_all(&calls, &Identity::guest(), Locale::En)
        .await;
    assert!(results[0].outcome.is_error());
    assert!(results[0].outcome.text().contains("quantity"));
}

#[tokio::test]
async fn quote_formats_totals() {
    let fx = fixture().await;
    let calls = vec![call(
        "get_quote",
        json!({ "product_id": "p1", "quantity": 3 }),
    )];
    let results = fx
        .orchestrator
        .execute_all(&calls, &Identity::guest(), Locale::En)
        .await;
    assert!(results[0].outcome.text().contains("2850.00 USD"));
}

#[tokio::test]
async fn plain_turn_persists_user_and_assistant_messages() {
    let fx = fixture().await;
    let engine = engine_with(&fx, vec![text_output("Hello! How can I help?", 10)]);

    let reply = engine
        .respond("sess-1", "hi", Locale::En, &Identity::guest())
        .await
        .unwrap();
    assert_eq!(reply.text, "Hello! How can I help?");
    assert_eq!(reply.tokens, Some(10));

    let conversations = Arc::new(ConversationManager::new(
        fx.store.clone(),
        fx.store.clone(),
        ConversationConfig::default(),
    ));
    let history = conversations
        .history(&reply.conversation_id, 10, 0, false)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].role, ChatRole::Assistant);
    assert_eq!(history[1].tokens_used, Some(10));
}

#[tokio::test]
async fn tool_call_turn_dispatches_and_regenerates() {
    let fx = fixture().await;
    let engine = engine_with(
        &fx,
        vec![
            tool_output(
                vec![ToolCall {
                    name: "search_products".into(),
                    arguments: json!({ "query": "polyethylene pipes" })
                        .as_object()
                        .cloned()
                        .unwrap(),
                }],
                20,
            ),
            text_output("We carry HDPE P6006, in stock.", 15),
        ],
    );

    let reply = engine
        .respond(
            "sess-2",
            "do you have polyethylene pipes?",
            Locale::En,
            &Identity::guest(),
        )
        .await
        .unwrap();
    assert_eq!(reply.text, "We carry HDPE P6006, in stock.");
    assert_eq!(reply.tokens, Some(35));

    let conversations = Arc::new(ConversationManager::new(
        fx.store.clone(),
        fx.store.clone(),
        ConversationConfig::default(),
    ));
    let history = conversations
        .history(&reply.conversation_id, 10, 0, false)
        .await
        .unwrap();
    let assistant = history.last().unwrap();
    assert_eq!(assistant.function_calls.len(), 1);
    assert_eq!(assistant.function_calls[0].name, "search_products");
    assert_eq!(assistant.function_results.len(), 1);
    assert!(!assistant.function_results[0].outcome.is_error());
    assert!(
        assistant.function_results[0]
            .outcome
            .text()
            .contains("HDPE P6006")
    );
}

#[tokio::test]
async fn streaming_plain_turn_delivers_deltas_then_done() {
    let fx = fixture().await;
    let engine = engine_with(&fx, vec![text_output("Hello there", 8)]);

    let mut rx = engine
        .respond_stream("sess-3", "hi", Locale::En, &Identity::guest())
        .await
        .unwrap();

    let mut text = String::new();
    let mut done = None;
    while let Some(chunk) = rx.recv().await {
        match chunk {
            ChatChunk::Delta(d) => text.push_str(&d),
            ChatChunk::Done { tokens, .. } => done = Some(tokens),
        }
    }
    assert_eq!(text, "Hello there");
    assert_eq!(done, Some(Some(8)));
}

#[tokio::test]
async fn streaming_tool_turn_emits_no_text_before_results() {
    let fx = fixture().await;
    let engine = engine_with(
        &fx,
        vec![
            tool_output(
                vec![ToolCall {
                    name: "check_stock".into(),
                    arguments: json!({ "product_id": "p1" }).as_object().cloned().unwrap(),
                }],
                12,
            ),
            text_output("Yes, 12 units available.", 6),
        ],
    );

    let mut rx = engine
        .respond_stream("sess-4", "is p1 in stock?", Locale::En, &Identity::guest())
        .await
        .unwrap();

    let mut text = String::new();
    let mut done = None;
    while let Some(chunk) = rx.recv().await {
        match chunk {
            ChatChunk::Delta(d) => text.push_str(&d),
            ChatChunk::Done { tokens, .. } => done = Some(tokens),
        }
    }
    // Every delta belongs to the post-dispatch pass.
    assert_eq!(text, "Yes, 12 units available.");
    assert_eq!(done, Some(Some(18)));

    let conversations = Arc::new(ConversationManager::new(
        fx.store.clone(),
        fx.store.clone(),
        ConversationConfig::default(),
    ));
    let conv = conversations
        .get_or_create("sess-4", None, Locale::En)
        .await
        .unwrap();
    let history = conversations.history(&conv.id, 10, 0, false).await.unwrap();
    let assistant = history.last().unwrap();
    assert_eq!(assistant.function_results.len(), 1);
    assert_eq!(assistant.tokens_used, Some(18));
}

#[tokio::test]
async fn streaming_filler_ahead_of_tool_calls_is_discarded() {
    let fx = fixture().await;
    let engine = engine_with(
        &fx,
        vec![
            filler_then_tools(
                "Let me check that for you. ",
                vec![ToolCall {
                    name: "check_stock".into(),
                    arguments: json!({ "product_id": "p1" }).as_object().cloned().unwrap(),
                }],
                12,
            ),
            text_output("Yes, 12 units available.", 6),
        ],
    );

    let mut rx = engine
        .respond_stream("sess-5", "is p1 in stock?", Locale::En, &Identity::guest())
        .await
        .unwrap();

    let mut text = String::new();
    while let Some(chunk) = rx.recv().await {
        if let ChatChunk::Delta(d) = chunk {
            text.push_str(&d);
        }
    }
    // The filler streamed before the calls never reaches the client.
    assert_eq!(text, "Yes, 12 units available.");

    let conversations = Arc::new(ConversationManager::new(
        fx.store.clone(),
        fx.store.clone(),
        ConversationConfig::default(),
    ));
    let conv = conversations
        .get_or_create("sess-5", None, Locale::En)
        .await
        .unwrap();
    let history = conversations.history(&conv.id, 10, 0, false).await.unwrap();
    let assistant = history.last().unwrap();
    // What the client saw is exactly what history records.
    assert_eq!(assistant.content, "Yes, 12 units available.");
}
