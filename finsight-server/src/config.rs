//! Environment-driven configuration for the server binary.

use std::time::Duration;

use anyhow::Context;
use finsight_conversation::PipelineConfig;
use finsight_rag::RagConfig;

use crate::server::ServerConfig;

/// Everything the binary reads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: String,
    pub embedding_base_url: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: usize,
    /// PostgreSQL URL of the pgvector chunk store. In-memory when unset.
    pub database_url: Option<String>,
    /// SQLite URL for checkpoints. In-memory when unset.
    pub checkpoint_database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = RagConfig::default();
        let rag = RagConfig::builder()
            .top_k(parse_or(&var, "RAG_TOP_K", defaults.top_k)?)
            .similarity_threshold(parse_or(&var, "RAG_SIMILARITY_THRESHOLD", defaults.similarity_threshold)?)
            .max_context_chars(parse_or(&var, "RAG_MAX_CONTEXT_CHARS", defaults.max_context_chars)?)
            .build()?;

        let pipeline_defaults = PipelineConfig::default();
        let pipeline = PipelineConfig::builder()
            .rag(rag)
            .history_window(parse_or(&var, "HISTORY_WINDOW", pipeline_defaults.history_window)?)
            .generation_timeout(Duration::from_secs(parse_or(
                &var,
                "GENERATION_TIMEOUT_SECS",
                pipeline_defaults.generation_timeout.as_secs(),
            )?))
            .build()?;

        Ok(Self {
            server: ServerConfig {
                host: var("FINSIGHT_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_or(&var, "FINSIGHT_PORT", 8000)?,
            },
            pipeline,
            api_key: var("OPENAI_API_KEY"),
            llm_base_url: var("LLM_BASE_URL"),
            llm_model: var("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            embedding_base_url: var("EMBEDDING_BASE_URL"),
            embedding_model: var("EMBEDDING_MODEL"),
            embedding_dimensions: parse_or(&var, "EMBEDDING_DIMENSIONS", 1536)?,
            database_url: var("DATABASE_URL"),
            checkpoint_database_url: var("CHECKPOINT_DATABASE_URL"),
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse::<T>().with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.embedding_dimensions, 1536);
        assert_eq!(config.pipeline.rag.similarity_threshold, 0.7);
        assert_eq!(config.pipeline.history_window, 6);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("FINSIGHT_PORT", "9000"),
            ("RAG_TOP_K", "5"),
            ("RAG_SIMILARITY_THRESHOLD", "0.65"),
            ("GENERATION_TIMEOUT_SECS", "30"),
            ("LLM_MODEL", "solar-pro2"),
            ("DATABASE_URL", "  "),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pipeline.rag.top_k, 5);
        assert_eq!(config.pipeline.rag.similarity_threshold, 0.65);
        assert_eq!(config.pipeline.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.llm_model, "solar-pro2");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config_from(&[("FINSIGHT_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("FINSIGHT_PORT"));

        assert!(config_from(&[("RAG_SIMILARITY_THRESHOLD", "1.5")]).is_err());
    }
}
