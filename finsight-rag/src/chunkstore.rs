//! Read interface over the pre-populated chunk corpus.

use async_trait::async_trait;

use crate::document::{DocumentChunk, ScoredChunk, rank};
use crate::error::Result;

/// Read-only access to the document chunks produced at ingestion time.
///
/// Stores that can rank by cosine distance natively (pgvector) override
/// [`nearest`](ChunkStore::nearest); the default implementation falls back to
/// a client-side scan over [`chunks_for`](ChunkStore::chunks_for).
///
/// # Example
///
/// ```rust,ignore
/// use finsight_rag::{ChunkStore, InMemoryChunkStore};
///
/// let store = InMemoryChunkStore::new();
/// let hits = store.nearest(&query_embedding, Some("report-2024"), 3).await?;
/// ```
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Return every chunk, or only the chunks belonging to `document_id`.
    async fn chunks_for(&self, document_id: Option<&str>) -> Result<Vec<DocumentChunk>>;

    /// Whether at least one chunk exists for `document_id`.
    async fn contains_document(&self, document_id: &str) -> Result<bool> {
        Ok(!self.chunks_for(Some(document_id)).await?.is_empty())
    }

    /// Return the `top_k` chunks closest to `embedding` by cosine similarity.
    ///
    /// Results are in canonical rank order (see [`rank`]).
    async fn nearest(
        &self,
        embedding: &[f32],
        document_id: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks_for(document_id).await?;
        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                ScoredChunk { chunk, score }
            })
            .collect();
        rank(&mut scored);
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. The result is clamped to
/// `[-1, 1]` to absorb floating point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
