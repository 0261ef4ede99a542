use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use finsight_conversation::{ConversationPipeline, TurnOutcome, TurnRequest};
use finsight_session::{Turn, UserLevel};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    catalog::{ConversationCatalog, ConversationRecord, InMemoryCatalog, NewConversation},
    error::ApiError,
};

const DEFAULT_CONVERSATION_PAGE: usize = 20;
const MAX_CONVERSATION_PAGE: usize = 100;
const DEFAULT_MESSAGE_PAGE: usize = 50;
const MAX_MESSAGE_PAGE: usize = 200;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConversationPipeline>,
    pub catalog: Arc<dyn ConversationCatalog>,
}

impl AppState {
    /// State with an in-memory catalog.
    pub fn new(pipeline: ConversationPipeline) -> Self {
        Self::with_catalog(pipeline, Arc::new(InMemoryCatalog::new()))
    }

    pub fn with_catalog(pipeline: ConversationPipeline, catalog: Arc<dyn ConversationCatalog>) -> Self {
        Self { pipeline: Arc::new(pipeline), catalog }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/conversations", get(list_conversations).post(create_conversation))
        .route("/api/v1/conversations/{conversation_id}", get(get_conversation))
        .route(
            "/api/v1/conversations/{conversation_id}/messages",
            get(list_messages).post(post_message),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for finsight server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("finsight listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl Pagination {
    fn window(&self, default: usize, max: usize) -> (usize, usize) {
        (self.skip.unwrap_or(0), self.limit.unwrap_or(default).clamp(1, max))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
    #[serde(default)]
    pub user_level: Option<String>,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"status":"ok","service":"finsight","model": state.pipeline.model_name()}))
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(request): Json<NewConversation>,
) -> Result<(StatusCode, Json<ConversationRecord>), ApiError> {
    let record = state.catalog.create(request).await?;
    info!(conversation_id = %record.id, session_type = ?record.session_type, "conversation created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_conversations(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<ConversationRecord>>, ApiError> {
    let (skip, limit) = pagination.window(DEFAULT_CONVERSATION_PAGE, MAX_CONVERSATION_PAGE);
    let (items, total) = state.catalog.list(skip, limit).await?;
    Ok(Json(Page { items, total }))
}

async fn get_conversation(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ConversationRecord>, ApiError> {
    find_conversation(&state, &conversation_id).await.map(Json)
}

async fn find_conversation(state: &AppState, conversation_id: &str) -> Result<ConversationRecord, ApiError> {
    state
        .catalog
        .get(conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("conversation '{conversation_id}' not found")))
}

async fn list_messages(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Turn>>, ApiError> {
    find_conversation(&state, &conversation_id).await?;
    let (skip, limit) = pagination.window(DEFAULT_MESSAGE_PAGE, MAX_MESSAGE_PAGE);
    let history = state.pipeline.history(&conversation_id).await?;
    let turns = history.turns();
    Ok(Json(Page { items: turns.iter().skip(skip).take(limit).cloned().collect(), total: turns.len() }))
}

async fn post_message(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let level = match request.user_level.as_deref() {
        Some(raw) => raw.parse::<UserLevel>()?,
        None => UserLevel::default(),
    };
    let record = find_conversation(&state, &conversation_id).await?;

    let turn = TurnRequest { text: request.content, level, document_id: record.document_id };
    let outcome = state.pipeline.run_turn(&conversation_id, turn).await?;
    state.catalog.touch(&conversation_id, 2).await?;
    Ok(Json(outcome))
}
