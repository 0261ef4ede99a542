//! Query embedding.

use async_trait::async_trait;

use crate::error::Result;

/// Turns a user question into a vector comparable with the stored chunks.
///
/// Only the query side is embedded here; chunk vectors are written by the
/// ingestion service with the same model. [`dimensions`](Self::dimensions)
/// must equal the corpus dimension or every search is rejected.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}
