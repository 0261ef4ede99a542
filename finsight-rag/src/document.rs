//! Data types for document chunks and retrieval results.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A contiguous span of a source document with its precomputed embedding.
///
/// Chunks are produced at ingestion time and are read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Identifier, unique within the owning document.
    pub id: String,
    /// The ID of the owning document.
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Order of the chunk within its document.
    pub position: u32,
    /// Ingestion metadata such as content type or page numbers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl DocumentChunk {
    /// Create a chunk without metadata.
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
        position: u32,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            text: text.into(),
            embedding,
            position,
            metadata: HashMap::new(),
        }
    }
}

/// A retrieved [`DocumentChunk`] paired with its cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: DocumentChunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
}

impl ScoredChunk {
    /// Descending score, then ascending chunk id, then ascending document id.
    pub fn rank_order(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
    }
}

/// Sort hits into their canonical, deterministic order.
pub fn rank(hits: &mut [ScoredChunk]) {
    hits.sort_by(ScoredChunk::rank_order);
}

/// Outcome of a similarity search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Hits in canonical rank order.
    pub hits: Vec<ScoredChunk>,
    /// Set by the context assembler once the threshold policy has been applied.
    pub is_relevant: bool,
}

impl RetrievalResult {
    /// Wrap hits, putting them into canonical order.
    pub fn new(mut hits: Vec<ScoredChunk>) -> Self {
        rank(&mut hits);
        Self { hits, is_relevant: false }
    }

    /// An empty result, as returned for an empty corpus.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Score of the best hit, if any.
    pub fn top_score(&self) -> Option<f32> {
        self.hits.first().map(|hit| hit.score)
    }

    /// Chunk identifiers in rank order.
    pub fn chunk_ids(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.chunk.id.clone()).collect()
    }
}
