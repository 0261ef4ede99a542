//! OpenAI-compatible chat completions client.
//!
//! Only available with the `openai` feature. Works against any endpoint that
//! implements `/v1/chat/completions` (OpenAI, Upstage Solar, Ollama, vLLM).
//!
//! # Example
//!
//! ```rust,ignore
//! use finsight_model::openai::{OpenAIChatClient, OpenAIChatConfig};
//!
//! let client = OpenAIChatClient::new(OpenAIChatConfig::new(
//!     std::env::var("OPENAI_API_KEY").unwrap(),
//!     "gpt-4o-mini",
//! ))?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::generator::{Generation, GenerationConfig, TextGenerator, TokenUsage};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "OpenAI";

/// Connection and sampling settings for [`OpenAIChatClient`].
#[derive(Debug, Clone)]
pub struct OpenAIChatConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub generation: GenerationConfig,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl OpenAIChatConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_BASE.to_string(),
            generation: GenerationConfig::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Config for an OpenAI-compatible API at `base_url`.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(api_key, model).with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A [`TextGenerator`] that sends each prompt as a single user message.
pub struct OpenAIChatClient {
    client: reqwest::Client,
    config: OpenAIChatConfig,
}

impl OpenAIChatClient {
    pub fn new(config: OpenAIChatConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Config("API key must not be empty".to_string()));
        }
        if config.model.is_empty() {
            return Err(ModelError::Config("model must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl TextGenerator for OpenAIChatClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        debug!(provider = PROVIDER, model = %self.config.model, prompt_len = prompt.len(), "chat completion");

        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.config.generation.temperature,
            max_tokens: self.config.generation.max_tokens,
        };

        let response =
            self.client.post(self.endpoint()).bearer_auth(&self.config.api_key).json(&body).send().await;
        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!(provider = PROVIDER, "request timed out");
                return Err(ModelError::Timeout {
                    provider: PROVIDER.to_string(),
                    elapsed: self.config.request_timeout,
                });
            }
            Err(e) => {
                error!(provider = PROVIDER, error = %e, "request failed");
                return Err(ModelError::Request {
                    provider: PROVIDER.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::Api {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ModelError::Request {
            provider: PROVIDER.to_string(),
            message: format!("failed to parse response: {e}"),
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::EmptyResponse { provider: PROVIDER.to_string() })?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        let model = parsed.model.unwrap_or_else(|| self.config.model.clone());

        Ok(Generation::new(text, model).with_usage(usage))
    }
}
