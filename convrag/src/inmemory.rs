//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexedFragment, ScoredFragment};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    records: Vec<IndexedFragment>,
}

/// An in-memory vector store using exhaustive cosine similarity search.
///
/// Records keep their insertion order, and equal scores are returned in that
/// order. Operations on different collections only contend on the lock.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("conversation_7", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn not_found(collection: &str) -> RagError {
    RagError::CollectionNotFound { collection: collection.to_string() }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, records: Vec::new() });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>> {
        let collections = self.collections.read().await;
        Ok(collections.get(name).map(|c| c.dimensions))
    }

    async fn insert(&self, collection: &str, fragments: &[IndexedFragment]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        if let Some(bad) = fragments.iter().find(|f| f.embedding.len() != store.dimensions) {
            return Err(RagError::DimensionMismatch {
                collection: collection.to_string(),
                expected: store.dimensions,
                actual: bad.embedding.len(),
            });
        }
        store.records.extend_from_slice(fragments);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredFragment>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| not_found(collection))?;

        let mut scored: Vec<ScoredFragment> = store
            .records
            .iter()
            .map(|record| ScoredFragment {
                text: record.text.clone(),
                score: cosine_similarity(&record.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(|c| c.records.len()).ok_or_else(|| not_found(collection))
    }
}
