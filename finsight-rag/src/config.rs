//! Configuration for retrieval and context assembly.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Hard upper bound on `top_k`, keeps the assembled context small.
pub const MAX_TOP_K: usize = 20;

/// Configuration parameters for similarity search and the context assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of top results to request from the chunk store.
    pub top_k: usize,
    /// Requests above this are silently capped.
    pub max_top_k: usize,
    /// Minimum top score for retrieval to count as relevant (inclusive).
    pub similarity_threshold: f32,
    /// Character budget for the assembled context block.
    pub max_context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 3, max_top_k: MAX_TOP_K, similarity_threshold: 0.7, max_context_chars: 700 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The `top_k` actually sent to the store for a requested value.
    pub fn effective_top_k(&self, requested: usize) -> usize {
        requested.min(self.max_top_k)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of top results to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the cap applied to any requested `top_k`.
    pub fn max_top_k(mut self, k: usize) -> Self {
        self.config.max_top_k = k;
        self
    }

    /// Set the relevance threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the character budget for assembled context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0` or `max_top_k == 0`
    /// - `max_top_k > MAX_TOP_K`
    /// - `similarity_threshold` is outside `[-1.0, 1.0]`
    /// - `max_context_chars == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.max_top_k == 0 || config.max_top_k > MAX_TOP_K {
            return Err(RagError::ConfigError(format!(
                "max_top_k ({}) must be between 1 and {MAX_TOP_K}",
                config.max_top_k
            )));
        }
        if !(-1.0..=1.0).contains(&config.similarity_threshold) {
            return Err(RagError::ConfigError(format!(
                "similarity_threshold ({}) must be within [-1.0, 1.0]",
                config.similarity_threshold
            )));
        }
        if config.max_context_chars == 0 {
            return Err(RagError::ConfigError(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
