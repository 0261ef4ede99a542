//! Similarity search over the chunk corpus.

use std::sync::Arc;

use tracing::debug;

use crate::chunkstore::ChunkStore;
use crate::config::RagConfig;
use crate::document::RetrievalResult;
use crate::error::{RagError, Result};

/// Ranks chunks against a query vector, optionally scoped to one document.
///
/// Wraps a [`ChunkStore`] with input validation, the `top_k` cap, and the
/// deterministic ordering contract.
///
/// # Example
///
/// ```rust,ignore
/// use finsight_rag::{InMemoryChunkStore, RagConfig, SimilaritySearch};
///
/// let search = SimilaritySearch::new(Arc::new(store), 1536, &RagConfig::default());
/// let result = search.search(&query_vector, Some("report-2024"), 3).await?;
/// ```
pub struct SimilaritySearch {
    store: Arc<dyn ChunkStore>,
    dimensions: usize,
    max_top_k: usize,
}

impl SimilaritySearch {
    /// Create a search over `store`, whose embeddings are `dimensions` long.
    pub fn new(store: Arc<dyn ChunkStore>, dimensions: usize, config: &RagConfig) -> Self {
        Self { store, dimensions, max_top_k: config.max_top_k }
    }

    /// Return a reference to the underlying chunk store.
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Return the corpus embedding dimension.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the `top_k` chunks most similar to `query`.
    ///
    /// Results are ordered by descending cosine similarity, ties broken by
    /// chunk id. An empty corpus yields an empty result.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length.
    /// - [`RagError::InvalidRequest`] if `top_k == 0`.
    /// - [`RagError::DocumentNotFound`] if `scope` names a document without chunks.
    /// - [`RagError::ChunkStoreError`] if the store fails.
    pub async fn search(
        &self,
        query: &[f32],
        scope: Option<&str>,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        if top_k == 0 {
            return Err(RagError::InvalidRequest("top_k must be greater than zero".to_string()));
        }
        let top_k = top_k.min(self.max_top_k);

        if let Some(document_id) = scope {
            if !self.store.contains_document(document_id).await? {
                return Err(RagError::DocumentNotFound { document_id: document_id.to_string() });
            }
        }

        let mut hits = self.store.nearest(query, scope, top_k).await?;
        if let Some(document_id) = scope {
            hits.retain(|hit| hit.chunk.document_id == document_id);
        }
        for hit in &mut hits {
            hit.score = hit.score.clamp(-1.0, 1.0);
        }

        let mut result = RetrievalResult::new(hits);
        result.hits.truncate(top_k);
        debug!(
            scope = scope.unwrap_or("*"),
            top_k,
            hit_count = result.len(),
            top_score = result.top_score().unwrap_or_default(),
            "similarity search completed"
        );
        Ok(result)
    }
}
