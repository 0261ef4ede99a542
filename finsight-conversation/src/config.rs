//! Pipeline configuration.

use std::time::Duration;

use finsight_rag::RagConfig;
use thiserror::Error;

/// Rejected configuration or missing pipeline component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Tunables for one [`ConversationPipeline`](crate::ConversationPipeline).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub rag: RagConfig,
    /// Prior turns interpolated into the answer prompt, newest kept.
    pub history_window: usize,
    /// Per-turn character cap inside the history block.
    pub max_turn_chars: usize,
    /// Deadline for each embedder and generation call.
    pub generation_timeout: Duration,
    /// Context characters passed to the follow-up prompt.
    pub followup_context_chars: usize,
    /// Follow-up questions required for a successful turn.
    pub followup_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rag: RagConfig::default(),
            history_window: 6,
            max_turn_chars: 1_000,
            generation_timeout: Duration::from_secs(60),
            followup_context_chars: 300,
            followup_count: 3,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn rag(mut self, rag: RagConfig) -> Self {
        self.config.rag = rag;
        self
    }

    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    pub fn max_turn_chars(mut self, chars: usize) -> Self {
        self.config.max_turn_chars = chars;
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    pub fn followup_context_chars(mut self, chars: usize) -> Self {
        self.config.followup_context_chars = chars;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_turn_chars` is zero or the timeout is zero.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let config = self.config;
        if config.max_turn_chars == 0 {
            return Err(ConfigError("max_turn_chars must be greater than zero".to_string()));
        }
        if config.generation_timeout.is_zero() {
            return Err(ConfigError("generation_timeout must be greater than zero".to_string()));
        }
        Ok(config)
    }
}
