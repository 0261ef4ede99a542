//! Relevance gating and context assembly.
//!
//! The [`ContextAssembler`] decides whether a retrieval is trustworthy enough
//! to ground an answer. Below the threshold the turn proceeds as general
//! conversation with no document context.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::document::RetrievalResult;

/// Separator placed between chunk texts in the assembled block.
const CHUNK_SEPARATOR: &str = "\n\n";

/// Why the assembler accepted or rejected a retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceDecision {
    /// The top score met the threshold.
    Relevant,
    /// Hits exist but the best one is below the threshold.
    BelowThreshold,
    /// The search returned nothing.
    NoResults,
}

impl RelevanceDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevant => "relevant",
            Self::BelowThreshold => "below_threshold",
            Self::NoResults => "no_results",
        }
    }
}

impl fmt::Display for RelevanceDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The assembler's verdict for one retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Concatenated chunk text, present only when relevant.
    pub text: Option<String>,
    pub is_relevant: bool,
    pub decision: RelevanceDecision,
    /// Best score seen, 0.0 when there were no hits.
    pub max_similarity: f32,
}

impl AssembledContext {
    /// The verdict for a turn that skipped retrieval entirely.
    pub fn none() -> Self {
        Self {
            text: None,
            is_relevant: false,
            decision: RelevanceDecision::NoResults,
            max_similarity: 0.0,
        }
    }
}

/// Applies the relevance threshold and the character budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextAssembler {
    threshold: f32,
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(threshold: f32, max_chars: usize) -> Self {
        Self { threshold, max_chars }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.similarity_threshold, config.max_context_chars)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify `result` and, if relevant, build the context block.
    ///
    /// Relevant means the top score is greater than or equal to the
    /// threshold. Chunk texts are joined in rank order and truncated to the
    /// character budget on a `char` boundary.
    pub fn assemble(&self, result: &RetrievalResult) -> AssembledContext {
        let Some(top_score) = result.top_score() else {
            return AssembledContext::none();
        };

        if top_score < self.threshold {
            return AssembledContext {
                text: None,
                is_relevant: false,
                decision: RelevanceDecision::BelowThreshold,
                max_similarity: top_score,
            };
        }

        let merged = result
            .hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);

        AssembledContext {
            text: Some(truncate_chars(&merged, self.max_chars)),
            is_relevant: true,
            decision: RelevanceDecision::Relevant,
            max_similarity: top_score,
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Keep at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentChunk, ScoredChunk};

    fn result_with(scores: &[(&str, f32)]) -> RetrievalResult {
        RetrievalResult::new(
            scores
                .iter()
                .map(|(id, score)| ScoredChunk {
                    chunk: DocumentChunk::new(*id, "doc", format!("text of {id}"), vec![], 0),
                    score: *score,
                })
                .collect(),
        )
    }

    #[test]
    fn score_equal_to_threshold_is_relevant() {
        let assembler = ContextAssembler::new(0.7, 700);
        let ctx = assembler.assemble(&result_with(&[("a", 0.7)]));
        assert!(ctx.is_relevant);
        assert_eq!(ctx.decision, RelevanceDecision::Relevant);
        assert_eq!(ctx.text.as_deref(), Some("text of a"));
    }

    #[test]
    fn score_just_below_threshold_is_not_relevant() {
        let assembler = ContextAssembler::new(0.7, 700);
        let ctx = assembler.assemble(&result_with(&[("a", 0.6999)]));
        assert!(!ctx.is_relevant);
        assert_eq!(ctx.text, None);
        assert_eq!(ctx.decision, RelevanceDecision::BelowThreshold);
        assert!((ctx.max_similarity - 0.6999).abs() < 1e-6);
    }

    #[test]
    fn empty_result_is_treated_as_below_threshold() {
        let ctx = ContextAssembler::default().assemble(&RetrievalResult::empty());
        assert!(!ctx.is_relevant);
        assert_eq!(ctx.text, None);
        assert_eq!(ctx.decision, RelevanceDecision::NoResults);
    }

    #[test]
    fn joins_in_rank_order_and_truncates() {
        let assembler = ContextAssembler::new(0.5, 15);
        let ctx = assembler.assemble(&result_with(&[("b", 0.6), ("a", 0.9)]));
        assert_eq!(ctx.text.as_deref(), Some("text of a\n\ntext"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("주가수익비율", 3), "주가수");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
