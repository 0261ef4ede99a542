//! The text generation seam used by the conversation pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }

    /// Sum two usage reports, e.g. the answer call and the follow-up call.
    pub fn combine(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

/// One completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    /// Model identifier as reported by the provider.
    pub model: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Generation {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self { text: text.into(), model: model.into(), usage: TokenUsage::default() }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { temperature: 0.2, max_tokens: 512 }
    }
}

/// A language model that completes a single prompt.
///
/// Implementations must be safe to share across concurrent turns.
///
/// # Example
///
/// ```rust,ignore
/// use finsight_model::{MockGenerator, TextGenerator};
///
/// let generator = MockGenerator::fixed("A P/E ratio compares price to earnings.");
/// let generation = generator.generate("What is a P/E ratio?").await?;
/// ```
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier of the backing model, recorded with each answer.
    fn name(&self) -> &str;

    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_combines_field_wise() {
        let total = TokenUsage::new(10, 5).combine(TokenUsage::new(3, 2));
        assert_eq!(total, TokenUsage { prompt_tokens: 13, completion_tokens: 7, total_tokens: 20 });
    }

    #[test]
    fn default_sampling_is_low_temperature() {
        let config = GenerationConfig::default();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 512);
    }
}
