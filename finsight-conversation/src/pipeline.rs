//! The retrieve, generate and follow-up orchestrator.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use finsight_model::{Generation, TextGenerator};
use finsight_rag::{ChunkStore, ContextAssembler, EmbeddingProvider, SimilaritySearch};
use finsight_session::{Checkpointer, ConversationLocks, ConversationState, Turn};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PipelineConfig};
use crate::error::{PipelineError, Result, Stage};
use crate::followup::{build_followup_prompt, parse_follow_ups};
use crate::prompt::{PromptBuilder, PromptInput};
use crate::turn::{Query, ReferenceContext, TurnOutcome, TurnRequest, TurnState};

/// Runs one conversation turn at a time per conversation id.
///
/// A turn moves through `start → retrieve → generate → followup → end`. All
/// changes are made on a private copy of the loaded state and committed in
/// the final stage; a failure anywhere earlier leaves the stored conversation
/// untouched.
///
/// # Example
///
/// ```rust,ignore
/// use finsight_conversation::{ConversationPipeline, TurnRequest};
/// use finsight_session::UserLevel;
///
/// let pipeline = ConversationPipeline::builder()
///     .embedder(embedder)
///     .chunk_store(store)
///     .generator(generator)
///     .checkpointer(checkpointer)
///     .build()?;
///
/// let outcome = pipeline
///     .run_turn("conv-1", TurnRequest::new("What is a P/E ratio?", UserLevel::Beginner))
///     .await?;
/// ```
pub struct ConversationPipeline {
    config: PipelineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    search: SimilaritySearch,
    assembler: ContextAssembler,
    prompts: PromptBuilder,
    generator: Arc<dyn TextGenerator>,
    checkpointer: Arc<dyn Checkpointer>,
    locks: ConversationLocks,
}

impl ConversationPipeline {
    pub fn builder() -> ConversationPipelineBuilder {
        ConversationPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Name of the generation model.
    pub fn model_name(&self) -> &str {
        self.generator.name()
    }

    /// The last committed state of a conversation. Does not wait for a
    /// running turn.
    pub async fn history(&self, conversation_id: &str) -> Result<ConversationState> {
        self.checkpointer
            .load(conversation_id)
            .await
            .map_err(|e| PipelineError::from_session(Stage::Start, e))
    }

    /// Run one turn and commit it.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the failed stage. Nothing is
    /// committed when an error is returned.
    pub async fn run_turn(
        &self,
        conversation_id: &str,
        request: TurnRequest,
    ) -> Result<TurnOutcome> {
        let started = Instant::now();

        // START
        let query = Query::new(&request.text, request.level, request.document_id)?;
        let _guard = self.locks.acquire(conversation_id).await;
        let mut state = self
            .checkpointer
            .load(conversation_id)
            .await
            .map_err(|e| PipelineError::from_session(Stage::Start, e))?;
        let scope = state.document_id.clone().or_else(|| query.document_id.clone());
        debug!(
            conversation_id,
            prior_turns = state.turns().len(),
            scope = scope.as_deref().unwrap_or("*"),
            level = %query.level,
            "turn started"
        );
        let mut turn = TurnState::new(query);

        // RETRIEVE
        let stage_start = Instant::now();
        self.retrieve(&mut turn, scope.as_deref()).await?;
        info!(
            conversation_id,
            stage = %Stage::Retrieve,
            elapsed_ms = elapsed_ms(stage_start),
            hits = turn.retrieval.len(),
            max_similarity = turn.context.max_similarity,
            decision = %turn.context.decision,
            "stage completed"
        );

        // GENERATE
        let stage_start = Instant::now();
        let prompt = self.prompts.build(&PromptInput {
            question: &turn.query.text,
            level: turn.query.level,
            context: turn.context.text.as_deref(),
            scoped: scope.is_some(),
            history: state.turns(),
        });
        let answer = self.generate(Stage::Generate, &prompt).await?;
        turn.usage = turn.usage.combine(answer.usage);
        info!(
            conversation_id,
            stage = %Stage::Generate,
            elapsed_ms = elapsed_ms(stage_start),
            model = %answer.model,
            completion_tokens = answer.usage.completion_tokens,
            "stage completed"
        );
        turn.answer = Some(answer);

        // FOLLOWUP
        let stage_start = Instant::now();
        self.follow_up(&mut turn).await?;
        info!(
            conversation_id,
            stage = %Stage::Followup,
            elapsed_ms = elapsed_ms(stage_start),
            "stage completed"
        );

        // END
        let Some(answer) = turn.answer.take() else {
            return Err(PipelineError::upstream(Stage::End, "turn finished without an answer"));
        };
        let cited_chunks = turn.cited_chunks();
        let now = Utc::now();
        state.push_turn(Turn::user(turn.query.text.clone(), now));
        state.push_turn(Turn::assistant(
            answer.text.clone(),
            now,
            cited_chunks.clone(),
            turn.follow_ups.clone(),
        ));
        state.document_id = scope.clone();
        state.last_context = turn.context.text.clone();
        state.user_level = turn.query.level;
        self.checkpointer.commit(&state).await.map_err(|e| {
            warn!(conversation_id, error = %e, "checkpoint commit failed");
            PipelineError::from_session(Stage::End, e)
        })?;

        let latency_ms = elapsed_ms(started);
        info!(conversation_id, latency_ms, turns = state.turns().len(), "turn committed");

        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            answer: answer.text,
            follow_up_questions: turn.follow_ups,
            reference_context: ReferenceContext {
                chunks_used: cited_chunks.len(),
                document_id: scope,
                max_similarity: turn.context.max_similarity,
                decision_reason: turn.context.decision,
                user_level: turn.query.level,
            },
            cited_chunks,
            model: answer.model,
            token_usage: turn.usage,
            latency_ms,
        })
    }

    async fn retrieve(&self, turn: &mut TurnState, scope: Option<&str>) -> Result<()> {
        let embedding = self
            .with_deadline(Stage::Retrieve, "embedding", self.embedder.embed(&turn.query.text))
            .await?
            .map_err(|e| PipelineError::from_rag(Stage::Retrieve, e))?;

        turn.retrieval = self
            .search
            .search(&embedding, scope, self.config.rag.top_k)
            .await
            .map_err(|e| PipelineError::from_rag(Stage::Retrieve, e))?;
        turn.context = self.assembler.assemble(&turn.retrieval);
        turn.retrieval.is_relevant = turn.context.is_relevant;
        Ok(())
    }

    async fn follow_up(&self, turn: &mut TurnState) -> Result<()> {
        let answer = turn.answer.as_ref().map(|a| a.text.as_str()).unwrap_or_default();
        let prompt = build_followup_prompt(
            turn.query.level,
            &turn.query.text,
            answer,
            turn.context.text.as_deref(),
            self.config.followup_context_chars,
            self.config.followup_count,
        );
        let generation = self.generate(Stage::Followup, &prompt).await?;
        turn.usage = turn.usage.combine(generation.usage);

        let questions = parse_follow_ups(&generation.text, self.config.followup_count);
        if questions.len() < self.config.followup_count {
            return Err(PipelineError::upstream(
                Stage::Followup,
                format!(
                    "expected {} follow-up questions, model returned {}",
                    self.config.followup_count,
                    questions.len()
                ),
            ));
        }
        turn.follow_ups = questions;
        Ok(())
    }

    async fn generate(&self, stage: Stage, prompt: &str) -> Result<Generation> {
        self.with_deadline(stage, "generation", self.generator.generate(prompt))
            .await?
            .map_err(|e| PipelineError::from_model(stage, e))
    }

    async fn with_deadline<T>(
        &self,
        stage: Stage,
        call: &str,
        fut: impl Future<Output = T>,
    ) -> Result<T> {
        let timeout = self.config.generation_timeout;
        tokio::time::timeout(timeout, fut).await.map_err(|_| {
            warn!(stage = %stage, call, timeout_secs = timeout.as_secs(), "call timed out");
            PipelineError::upstream(stage, format!("{call} timed out after {}", fmt_secs(timeout)))
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

fn fmt_secs(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f32())
}

/// Builder for [`ConversationPipeline`].
#[derive(Default)]
pub struct ConversationPipelineBuilder {
    config: Option<PipelineConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    chunk_store: Option<Arc<dyn ChunkStore>>,
    generator: Option<Arc<dyn TextGenerator>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
}

impl ConversationPipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn chunk_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.chunk_store = Some(store);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedder, chunk store, generator or
    /// checkpointer was not set.
    pub fn build(self) -> std::result::Result<ConversationPipeline, ConfigError> {
        let config = self.config.unwrap_or_default();
        let embedder = self.embedder.ok_or_else(|| ConfigError("embedder is required".into()))?;
        let chunk_store =
            self.chunk_store.ok_or_else(|| ConfigError("chunk_store is required".into()))?;
        let generator =
            self.generator.ok_or_else(|| ConfigError("generator is required".into()))?;
        let checkpointer =
            self.checkpointer.ok_or_else(|| ConfigError("checkpointer is required".into()))?;

        let search = SimilaritySearch::new(chunk_store, embedder.dimensions(), &config.rag);
        Ok(ConversationPipeline {
            assembler: ContextAssembler::from_config(&config.rag),
            prompts: PromptBuilder::new(config.history_window, config.max_turn_chars),
            search,
            embedder,
            generator,
            checkpointer,
            locks: ConversationLocks::new(),
            config,
        })
    }
}
