//! In-memory chunk store using cosine similarity.
//!
//! [`InMemoryChunkStore`] keeps chunks in a `HashMap` keyed by document ID,
//! protected by a `tokio::sync::RwLock`. It is suitable for development,
//! tests, and small corpora loaded at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::chunkstore::ChunkStore;
use crate::document::DocumentChunk;
use crate::error::{RagError, Result};

/// An in-memory chunk store. Search uses the default client-side scan.
///
/// # Example
///
/// ```rust,ignore
/// use finsight_rag::{DocumentChunk, InMemoryChunkStore};
///
/// let store = InMemoryChunkStore::new();
/// store.insert(vec![DocumentChunk::new("c1", "report-2024", "Revenue grew 12%", emb, 0)]).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryChunkStore {
    documents: RwLock<HashMap<String, Vec<DocumentChunk>>>,
    dimensions: Option<usize>,
}

impl InMemoryChunkStore {
    /// Create a new empty store that accepts embeddings of any dimension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects chunks whose embedding is not `dimensions` long.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { documents: RwLock::default(), dimensions: Some(dimensions) }
    }

    /// Load chunks into the store, replacing any chunk with the same
    /// `(document_id, id)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkStoreError`] if a chunk's embedding has the
    /// wrong dimension.
    pub async fn insert(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        if let Some(expected) = self.dimensions {
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(RagError::ChunkStoreError {
                    backend: "InMemory".to_string(),
                    message: format!(
                        "chunk '{}' has {} dimensions, expected {expected}",
                        bad.id,
                        bad.embedding.len()
                    ),
                });
            }
        }

        let mut documents = self.documents.write().await;
        for chunk in chunks {
            let entries = documents.entry(chunk.document_id.clone()).or_default();
            match entries.iter_mut().find(|existing| existing.id == chunk.id) {
                Some(existing) => *existing = chunk,
                None => entries.push(chunk),
            }
        }
        Ok(())
    }

    /// Number of chunks across all documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn chunks_for(&self, document_id: Option<&str>) -> Result<Vec<DocumentChunk>> {
        let documents = self.documents.read().await;
        let chunks = match document_id {
            Some(id) => documents.get(id).cloned().unwrap_or_default(),
            None => documents.values().flatten().cloned().collect(),
        };
        Ok(chunks)
    }

    async fn contains_document(&self, document_id: &str) -> Result<bool> {
        let documents = self.documents.read().await;
        Ok(documents.get(document_id).is_some_and(|chunks| !chunks.is_empty()))
    }
}
