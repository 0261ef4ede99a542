use std::sync::Arc;

use async_trait::async_trait;
use finsight_conversation::ConversationPipeline;
use finsight_model::{MockGenerator, TextGenerator};
use finsight_rag::{DocumentChunk, EmbeddingProvider, InMemoryChunkStore};
use finsight_server::{AppState, ConversationCatalog, InMemoryCatalog, app_router};
use finsight_session::{Checkpointer, InMemoryCheckpointer};
use serde_json::{Value, json};

struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> finsight_rag::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }
}

fn answering_generator() -> Arc<dyn TextGenerator> {
    Arc::new(MockGenerator::new(|prompt| {
        if prompt.contains("<questions>") {
            Ok("<question>What is EPS?</question>\n<question>What is a PEG ratio?</question>\n\
                <question>How do sectors differ?</question>"
                .to_string())
        } else {
            Ok("The P/E ratio divides the share price by earnings per share.".to_string())
        }
    }))
}

async fn spawn_server(generator: Arc<dyn TextGenerator>) -> (String, tokio::task::JoinHandle<()>) {
    spawn_with(generator, Arc::new(InMemoryCheckpointer::new()), Arc::new(InMemoryCatalog::new())).await
}

/// Serve a fresh pipeline over existing stores, as a restarted process would.
async fn spawn_with(
    generator: Arc<dyn TextGenerator>,
    checkpointer: Arc<dyn Checkpointer>,
    catalog: Arc<dyn ConversationCatalog>,
) -> (String, tokio::task::JoinHandle<()>) {
    let store = InMemoryChunkStore::new();
    store
        .insert(vec![DocumentChunk::new(
            "k1",
            "report-1",
            "Operating profit rose 18% year on year.",
            vec![0.9, 0.1, 0.0],
            0,
        )])
        .await
        .expect("seed chunk store");

    let pipeline = ConversationPipeline::builder()
        .embedder(Arc::new(FixedEmbedder))
        .chunk_store(Arc::new(store))
        .generator(generator)
        .checkpointer(checkpointer)
        .build()
        .expect("pipeline");
    let app = app_router(AppState::with_catalog(pipeline, catalog));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

async fn create_conversation(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/api/v1/conversations", base))
        .json(&body)
        .send()
        .await
        .expect("create response");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.expect("record json")
}

#[tokio::test]
async fn health_reports_model() {
    let (base, handle) = spawn_server(answering_generator()).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "mock");

    handle.abort();
}

#[tokio::test]
async fn general_conversation_round_trip() {
    let (base, handle) = spawn_server(answering_generator()).await;
    let client = reqwest::Client::new();

    let record = create_conversation(&client, &base, json!({})).await;
    assert_eq!(record["title"], "New conversation");
    assert_eq!(record["session_type"], "general");
    let id = record["id"].as_str().expect("id field").to_string();

    let response = client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "What is a P/E ratio?"}))
        .send()
        .await
        .expect("message response");
    assert!(response.status().is_success());
    let outcome: Value = response.json().await.expect("outcome json");
    assert_eq!(outcome["follow_up_questions"].as_array().map(Vec::len), Some(3));
    assert_eq!(outcome["reference_context"]["user_level"], "beginner");
    assert_eq!(outcome["model"], "mock");

    let messages: Value = client
        .get(format!("{}/api/v1/conversations/{}/messages", base, id))
        .send()
        .await
        .expect("messages response")
        .json()
        .await
        .expect("messages json");
    assert_eq!(messages["total"], 2);
    assert_eq!(messages["items"][0]["role"], "user");
    assert_eq!(messages["items"][1]["role"], "assistant");

    let page: Value = client
        .get(format!("{}/api/v1/conversations?limit=1&skip=1", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(0));

    handle.abort();
}

#[tokio::test]
async fn report_based_conversation_uses_document_scope() {
    let (base, handle) = spawn_server(answering_generator()).await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/api/v1/conversations", base))
        .json(&json!({"session_type": "report_based"}))
        .send()
        .await
        .expect("create response");
    assert_eq!(missing.status(), reqwest::StatusCode::BAD_REQUEST);

    let record = create_conversation(
        &client,
        &base,
        json!({"title": "Q3 results", "session_type": "report_based", "document_id": "report-1"}),
    )
    .await;
    let id = record["id"].as_str().expect("id field");

    let outcome: Value = client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "How did operating profit change?", "user_level": "advanced"}))
        .send()
        .await
        .expect("message response")
        .json()
        .await
        .expect("outcome json");
    assert_eq!(outcome["cited_chunks"], json!(["k1"]));
    assert_eq!(outcome["reference_context"]["decision_reason"], "relevant");
    assert_eq!(outcome["reference_context"]["document_id"], "report-1");

    let listed: Value = client
        .get(format!("{}/api/v1/conversations", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed["items"][0]["message_count"], 2);

    handle.abort();
}

#[tokio::test]
async fn invalid_input_is_rejected_with_400() {
    let (base, handle) = spawn_server(answering_generator()).await;
    let client = reqwest::Client::new();
    let record = create_conversation(&client, &base, json!({})).await;
    let url = format!("{}/api/v1/conversations/{}/messages", base, record["id"].as_str().expect("id"));

    let bad_level = client
        .post(&url)
        .json(&json!({"content": "Hi", "user_level": "expert"}))
        .send()
        .await
        .expect("response");
    assert_eq!(bad_level.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = bad_level.json().await.expect("error json");
    assert_eq!(body["error"]["code"], "validation");

    let blank = client.post(&url).json(&json!({"content": "   "})).send().await.expect("response");
    assert_eq!(blank.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn unknown_conversation_is_404() {
    let (base, handle) = spawn_server(answering_generator()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/conversations/nope/messages", base))
        .json(&json!({"content": "Hello"}))
        .send()
        .await
        .expect("response");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/api/v1/conversations/nope/messages", base))
        .send()
        .await
        .expect("response");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn upstream_failure_is_503_and_retryable() {
    let (base, handle) = spawn_server(Arc::new(MockGenerator::failing("connection reset"))).await;
    let client = reqwest::Client::new();
    let record = create_conversation(&client, &base, json!({})).await;
    let id = record["id"].as_str().expect("id");

    let response = client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "What is beta?"}))
        .send()
        .await
        .expect("response");
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body["error"]["retryable"], true);
    assert!(!body["error"]["message"].as_str().unwrap_or_default().contains("connection reset"));

    let messages: Value = client
        .get(format!("{}/api/v1/conversations/{}/messages", base, id))
        .send()
        .await
        .expect("messages response")
        .json()
        .await
        .expect("messages json");
    assert_eq!(messages["total"], 0);

    handle.abort();
}

#[tokio::test]
async fn conversation_detail_by_id() {
    let (base, handle) = spawn_server(answering_generator()).await;
    let client = reqwest::Client::new();

    let record = create_conversation(
        &client,
        &base,
        json!({"title": "Q3 results", "session_type": "report_based", "document_id": "report-1"}),
    )
    .await;
    let id = record["id"].as_str().expect("id field");

    let response = client
        .get(format!("{}/api/v1/conversations/{}", base, id))
        .send()
        .await
        .expect("detail response");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let detail: Value = response.json().await.expect("detail json");
    assert_eq!(detail, record);

    let missing = client
        .get(format!("{}/api/v1/conversations/nope", base))
        .send()
        .await
        .expect("detail response");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.expect("error json");
    assert_eq!(body["error"]["code"], "not_found");

    handle.abort();
}

async fn exercise_restart(checkpointer: Arc<dyn Checkpointer>, catalog: Arc<dyn ConversationCatalog>) {
    let client = reqwest::Client::new();

    let (base, first) = spawn_with(answering_generator(), checkpointer.clone(), catalog.clone()).await;
    let record = create_conversation(&client, &base, json!({"title": "Before restart"})).await;
    let id = record["id"].as_str().expect("id field").to_string();
    let response = client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "What is a P/E ratio?"}))
        .send()
        .await
        .expect("message response");
    assert!(response.status().is_success());
    first.abort();

    let (base, second) = spawn_with(answering_generator(), checkpointer, catalog).await;

    let detail: Value = client
        .get(format!("{}/api/v1/conversations/{}", base, id))
        .send()
        .await
        .expect("detail response")
        .json()
        .await
        .expect("detail json");
    assert_eq!(detail["title"], "Before restart");
    assert_eq!(detail["message_count"], 2);

    let listed: Value = client
        .get(format!("{}/api/v1/conversations", base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed["total"], 1);

    let response = client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "And a PEG ratio?"}))
        .send()
        .await
        .expect("message response");
    assert!(response.status().is_success());

    let messages: Value = client
        .get(format!("{}/api/v1/conversations/{}/messages", base, id))
        .send()
        .await
        .expect("messages response")
        .json()
        .await
        .expect("messages json");
    assert_eq!(messages["total"], 4);

    second.abort();
}

#[tokio::test]
async fn conversations_outlive_the_app_state_that_created_them() {
    exercise_restart(Arc::new(InMemoryCheckpointer::new()), Arc::new(InMemoryCatalog::new())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_conversations_survive_restart() {
    use finsight_server::SqliteCatalog;
    use finsight_session::SqliteCheckpointer;

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("sqlite pool");

    let checkpointer = SqliteCheckpointer::from_pool(pool.clone()).await.expect("checkpointer");
    let catalog = SqliteCatalog::from_pool(pool.clone()).await.expect("catalog");
    let (base, first) =
        spawn_with(answering_generator(), Arc::new(checkpointer), Arc::new(catalog)).await;
    let client = reqwest::Client::new();
    let record = create_conversation(&client, &base, json!({"title": "Persisted"})).await;
    let id = record["id"].as_str().expect("id field").to_string();
    client
        .post(format!("{}/api/v1/conversations/{}/messages", base, id))
        .json(&json!({"content": "What is a P/E ratio?"}))
        .send()
        .await
        .expect("message response");
    first.abort();

    // New stores over the same database, as after a process restart.
    let checkpointer = SqliteCheckpointer::from_pool(pool.clone()).await.expect("checkpointer");
    let catalog = SqliteCatalog::from_pool(pool).await.expect("catalog");
    let (base, second) =
        spawn_with(answering_generator(), Arc::new(checkpointer), Arc::new(catalog)).await;

    let detail = client
        .get(format!("{}/api/v1/conversations/{}", base, id))
        .send()
        .await
        .expect("detail response");
    assert_eq!(detail.status(), reqwest::StatusCode::OK);

    let messages: Value = client
        .get(format!("{}/api/v1/conversations/{}/messages", base, id))
        .send()
        .await
        .expect("messages response")
        .json()
        .await
        .expect("messages json");
    assert_eq!(messages["total"], 2);

    second.abort();
}
