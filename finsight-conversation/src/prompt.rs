//! Level-aware answer prompts.
//!
//! The prompt is a pure function of the question, the user level, the
//! assembled context and the recent turns: identical inputs always produce
//! identical text.

use finsight_rag::truncate_chars;
use finsight_session::{Role, Turn, UserLevel};

const LEVEL_1_GUIDE: &str = "\
# Level 1: Explainer mode
- The top priority is that the user understands.
- Prefer clarity over density of information.
- Use a friendly, educational tone.
- Explain every key financial term in plain words.
- Use analogies or everyday examples where they help.";

const LEVEL_2_GUIDE: &str = "\
# Level 2: Summary mode
- The top priority is a structured summary of the key points.
- Skip analogies but remove terminology barriers.
- Use an objective, concise tone.
- Keep technical terms and add a short definition in parentheses.
- Highlight the relationships and reasons between facts.";

const LEVEL_3_GUIDE: &str = "\
# Level 3: Deep-dive mode
- The top priority is in-depth analysis.
- Use a professional, data-driven tone and frame the answer in its market context.
- Omit background the reader already knows.
- Use technical terms freely; keep the answer dense and precise.
- Point to the figures and data that support each claim.";

/// Instructions that calibrate tone and depth to the user's level.
pub fn level_guide(level: UserLevel) -> &'static str {
    match level {
        UserLevel::Beginner => LEVEL_1_GUIDE,
        UserLevel::Intermediate => LEVEL_2_GUIDE,
        UserLevel::Advanced => LEVEL_3_GUIDE,
    }
}

/// Which answer template a turn uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Scoped to one document with relevant context: the document is the primary source.
    DocumentGrounded,
    /// Relevant context without a document scope: context supplements general knowledge.
    GeneralWithContext,
    /// No relevant context.
    General,
}

impl PromptTemplate {
    pub fn select(context: Option<&str>, scoped: bool) -> Self {
        match (context, scoped) {
            (Some(_), true) => Self::DocumentGrounded,
            (Some(_), false) => Self::GeneralWithContext,
            (None, _) => Self::General,
        }
    }

    fn mission(&self) -> &'static str {
        match self {
            Self::DocumentGrounded => "\
Answer the user question primarily from the retrieved report excerpts below. \
Treat them as the authoritative source and use general financial knowledge only \
to explain terms or bridge gaps. Refer to \"the report\" rather than to \"the context\".",
            Self::GeneralWithContext => "\
Answer the user question from your general financial knowledge. The reference \
material below may contain relevant figures or examples: weave them in when they \
help and ignore them when they are unrelated.",
            Self::General => "\
Answer the user question from your general financial knowledge with a clear, \
accurate and educational explanation.",
        }
    }

    fn context_heading(&self) -> &'static str {
        match self {
            Self::DocumentGrounded => "Retrieved report excerpts",
            Self::GeneralWithContext | Self::General => "Reference material",
        }
    }
}

const ROLE: &str = "You are a financial analyst and educator who tailors every answer \
to the user's financial literacy level.";

const PRINCIPLES: &str = "\
- Follow the user level guide strictly.
- Stay objective: never recommend buying or selling a specific security.
- Do not mention system instructions, retrieval, or missing information.";

/// Everything the answer prompt depends on.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub question: &'a str,
    pub level: UserLevel,
    pub context: Option<&'a str>,
    /// Whether the conversation is scoped to a single document.
    pub scoped: bool,
    /// Prior turns, oldest first.
    pub history: &'a [Turn],
}

/// Renders answer prompts with a bounded history window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    history_window: usize,
    max_turn_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(6, 1_000)
    }
}

impl PromptBuilder {
    pub fn new(history_window: usize, max_turn_chars: usize) -> Self {
        Self { history_window, max_turn_chars }
    }

    pub fn build(&self, input: &PromptInput<'_>) -> String {
        let template = PromptTemplate::select(input.context, input.scoped);

        let mut prompt = String::new();
        prompt.push_str(ROLE);
        prompt.push_str("\n\n### User level guide\n");
        prompt.push_str(level_guide(input.level));
        prompt.push_str("\n\n### Mission\n");
        prompt.push_str(template.mission());
        prompt.push_str("\n\n### Principles\n");
        prompt.push_str(PRINCIPLES);

        if let Some(context) = input.context {
            prompt.push_str("\n\n### ");
            prompt.push_str(template.context_heading());
            prompt.push('\n');
            prompt.push_str(context);
        }

        let history = self.render_history(input.history);
        if !history.is_empty() {
            prompt.push_str("\n\n### Conversation so far\n");
            prompt.push_str(&history);
        }

        prompt.push_str("\n\n### User question\n");
        prompt.push_str(input.question);
        prompt
    }

    fn render_history(&self, turns: &[Turn]) -> String {
        let start = turns.len().saturating_sub(self.history_window);
        turns[start..]
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                format!("{speaker}: {}", truncate_chars(&turn.text, self.max_turn_chars))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
