//! # finsight-conversation
//!
//! The retrieval-augmented conversation pipeline.
//!
//! ## Overview
//!
//! Each user message runs through three stages on top of a loaded
//! [`ConversationState`](finsight_session::ConversationState):
//!
//! 1. **retrieve** - embed the question, search the chunk corpus (scoped to the
//!    conversation's document when it has one) and apply the relevance threshold
//! 2. **generate** - answer with a [`PromptBuilder`] prompt tuned to the user level
//! 3. **followup** - ask the model for exactly three follow-up questions
//!
//! The new user and assistant turns are committed together at the end, or not
//! at all.

pub mod config;
pub mod error;
pub mod followup;
pub mod pipeline;
pub mod prompt;
pub mod turn;

pub use config::{ConfigError, PipelineConfig, PipelineConfigBuilder};
pub use error::{ErrorKind, PipelineError, Result, Stage};
pub use followup::{build_followup_prompt, parse_follow_ups};
pub use pipeline::{ConversationPipeline, ConversationPipelineBuilder};
pub use prompt::{PromptBuilder, PromptInput, PromptTemplate, level_guide};
pub use turn::{Query, ReferenceContext, TurnOutcome, TurnRequest, TurnState};
