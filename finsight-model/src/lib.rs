//! # finsight-model
//!
//! Text generation backends for the FinSight conversation pipeline.
//!
//! - [`TextGenerator`] - the single-prompt completion trait
//! - `OpenAIChatClient` - OpenAI-compatible chat completions (`openai` feature)
//! - [`MockGenerator`] - scriptable generator for tests
//!
//! ## Supported Models
//!
//! | Model | Description |
//! |-------|-------------|
//! | `gpt-4o-mini` | Default, fast and cost-effective |
//! | `gpt-4o` | Most capable OpenAI model |
//! | `solar-pro2` | Upstage Solar via its OpenAI-compatible endpoint |

pub mod error;
pub mod generator;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
pub use generator::{Generation, GenerationConfig, TextGenerator, TokenUsage};
pub use mock::MockGenerator;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatClient, OpenAIChatConfig};
