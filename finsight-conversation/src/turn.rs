//! Per-turn data threaded through the pipeline stages.

use finsight_model::{Generation, TokenUsage};
use finsight_rag::{AssembledContext, RelevanceDecision, RetrievalResult};
use finsight_session::UserLevel;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result, Stage};

/// What the caller submits for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub text: String,
    #[serde(default)]
    pub level: UserLevel,
    /// Scope for a conversation that does not have one yet.
    #[serde(default)]
    pub document_id: Option<String>,
}

impl TurnRequest {
    pub fn new(text: impl Into<String>, level: UserLevel) -> Self {
        Self { text: text.into(), level, document_id: None }
    }

    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }
}

/// A validated user question.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub document_id: Option<String>,
    pub level: UserLevel,
}

impl Query {
    /// # Errors
    ///
    /// A [`Validation`](crate::ErrorKind::Validation) error if `text` is blank.
    pub fn new(text: &str, level: UserLevel, document_id: Option<String>) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::validation(Stage::Start, "message text must not be empty"));
        }
        Ok(Self { text: text.to_string(), document_id, level })
    }
}

/// Scratch state for one turn. Folded into the conversation at commit.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub query: Query,
    pub retrieval: RetrievalResult,
    pub context: AssembledContext,
    pub answer: Option<Generation>,
    pub follow_ups: Vec<String>,
    pub usage: TokenUsage,
}

impl TurnState {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            retrieval: RetrievalResult::empty(),
            context: AssembledContext::none(),
            answer: None,
            follow_ups: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    /// Chunk ids the answer was grounded on. Empty unless the context was relevant.
    pub fn cited_chunks(&self) -> Vec<String> {
        if self.context.is_relevant { self.retrieval.chunk_ids() } else { Vec::new() }
    }
}

/// How the retrieval step shaped the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceContext {
    pub chunks_used: usize,
    pub document_id: Option<String>,
    pub max_similarity: f32,
    pub decision_reason: RelevanceDecision,
    pub user_level: UserLevel,
}

/// The result of a successful turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub answer: String,
    pub follow_up_questions: Vec<String>,
    pub cited_chunks: Vec<String>,
    pub reference_context: ReferenceContext,
    pub model: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
}
