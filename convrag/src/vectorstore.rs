//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{IndexedFragment, ScoredFragment};
use crate::error::Result;

/// A storage backend for vector embeddings with cosine similarity search.
///
/// Implementations manage named collections, each with a fixed vector
/// dimension declared at creation. Transport failures are reported as
/// [`RagError::IndexUnavailable`](crate::RagError::IndexUnavailable).
/// Only the [`IndexManager`](crate::IndexManager) talks to a store directly.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("conversation_1", 384).await?;
/// store.insert("conversation_1", &fragments).await?;
/// let hits = store.search("conversation_1", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Drop a named collection and all its data. No-op if it does not exist.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// The declared dimension of a collection, or `None` if it does not exist.
    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>>;

    /// Whether a collection exists.
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collection_dimensions(name).await?.is_some())
    }

    /// Append records to an existing collection.
    ///
    /// Fails with [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound)
    /// if the collection does not exist.
    async fn insert(&self, collection: &str, fragments: &[IndexedFragment]) -> Result<()>;

    /// Return the `limit` records most similar to `embedding`, ordered by
    /// descending cosine similarity.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredFragment>>;

    /// Number of records stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
