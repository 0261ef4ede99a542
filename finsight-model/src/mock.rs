//! Scriptable generator for tests and offline runs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::generator::{Generation, TextGenerator, TokenUsage};

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// A [`TextGenerator`] driven by a closure over the prompt.
///
/// Every prompt it receives is recorded and can be inspected with
/// [`prompts`](MockGenerator::prompts).
pub struct MockGenerator {
    name: String,
    responder: Arc<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self { name: "mock".to_string(), responder: Arc::new(responder), prompts: Mutex::default() }
    }

    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fail with a transient request error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| {
            Err(ModelError::Request { provider: "mock".to_string(), message: message.clone() })
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let text = (self.responder)(prompt)?;
        let usage = TokenUsage::new(word_count(prompt), word_count(&text));
        Ok(Generation::new(text, self.name.clone()).with_usage(usage))
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
