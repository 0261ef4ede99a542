use std::sync::Arc;

use finsight_conversation::ConversationPipeline;
use finsight_model::TextGenerator;
use finsight_rag::{ChunkStore, EmbeddingProvider, InMemoryChunkStore};
use finsight_server::{AppConfig, AppState, ConversationCatalog, InMemoryCatalog, run_server};
use finsight_session::{Checkpointer, InMemoryCheckpointer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let (checkpointer, catalog) = storage(&config).await?;
    let pipeline = ConversationPipeline::builder()
        .config(config.pipeline.clone())
        .embedder(embedder(&config)?)
        .chunk_store(chunk_store(&config).await?)
        .generator(generator(&config)?)
        .checkpointer(checkpointer)
        .build()?;
    info!(model = pipeline.model_name(), "pipeline ready");

    run_server(config.server.clone(), AppState::with_catalog(pipeline, catalog)).await
}

#[cfg(feature = "openai")]
fn embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    use finsight_rag::OpenAIEmbeddingProvider;

    let api_key = config.api_key.clone().unwrap_or_default();
    let mut provider =
        OpenAIEmbeddingProvider::new(api_key)?.with_dimensions(config.embedding_dimensions);
    if let Some(base_url) = &config.embedding_base_url {
        provider = provider.with_base_url(base_url);
    }
    if let Some(model) = &config.embedding_model {
        provider = provider.with_model(model);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn embedder(_config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("finsight-server was built without an embedding provider; enable the `openai` feature")
}

#[cfg(feature = "openai")]
fn generator(config: &AppConfig) -> anyhow::Result<Arc<dyn TextGenerator>> {
    use finsight_model::{OpenAIChatClient, OpenAIChatConfig};

    let mut chat = OpenAIChatConfig::new(config.api_key.clone().unwrap_or_default(), &config.llm_model)
        .with_request_timeout(config.pipeline.generation_timeout);
    if let Some(base_url) = &config.llm_base_url {
        chat = chat.with_base_url(base_url);
    }
    Ok(Arc::new(OpenAIChatClient::new(chat)?))
}

#[cfg(not(feature = "openai"))]
fn generator(_config: &AppConfig) -> anyhow::Result<Arc<dyn TextGenerator>> {
    anyhow::bail!("finsight-server was built without a generation client; enable the `openai` feature")
}

async fn chunk_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ChunkStore>> {
    #[cfg(feature = "pgvector")]
    if let Some(url) = &config.database_url {
        let store = finsight_rag::PgChunkStore::new(url).await?;
        info!("using pgvector chunk store");
        return Ok(Arc::new(store));
    }

    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but the `pgvector` feature is disabled");
    }
    warn!("using an empty in-memory chunk store; every turn falls back to general conversation");
    Ok(Arc::new(InMemoryChunkStore::with_dimensions(config.embedding_dimensions)))
}

/// Checkpointer and conversation catalog, both on SQLite when configured so
/// conversations and their history survive a restart together.
async fn storage(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn Checkpointer>, Arc<dyn ConversationCatalog>)> {
    #[cfg(feature = "sqlite")]
    if let Some(url) = &config.checkpoint_database_url {
        let pool = sqlx::sqlite::SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        let checkpointer = finsight_session::SqliteCheckpointer::from_pool(pool.clone()).await?;
        let catalog = finsight_server::SqliteCatalog::from_pool(pool).await?;
        info!("using sqlite checkpointer and conversation catalog");
        return Ok((Arc::new(checkpointer), Arc::new(catalog)));
    }

    if config.checkpoint_database_url.is_some() {
        warn!("CHECKPOINT_DATABASE_URL is set but the `sqlite` feature is disabled");
    }
    info!("using in-memory checkpointer and conversation catalog");
    Ok((Arc::new(InMemoryCheckpointer::new()), Arc::new(InMemoryCatalog::new())))
}
