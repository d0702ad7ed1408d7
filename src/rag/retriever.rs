use anyhow::Result;

use crate::models::DocumentChunk;

use super::vector_store::VectorStore;

/// Number of chunks fetched per question.
pub const TOP_K: u64 = 3;
/// Minimum similarity a stored chunk must exceed to be returned.
pub const SCORE_THRESHOLD: f32 = 0.7;

/// Fixed-parameter similarity search over the vector store. No retries, no
/// query rewriting of its own.
pub struct Retriever {
    store: VectorStore,
}

impl Retriever {
    pub fn new(store: VectorStore) -> Self {
        Self { store }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>> {
        let hits = self.store.search(query, TOP_K, SCORE_THRESHOLD).await?;
        tracing::debug!("Retrieved {} chunks for query", hits.len());
        for hit in &hits {
            tracing::debug!("  score {:.3}: {:.60}", hit.score, hit.chunk.text);
        }
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }
}
