//! Conversation-scoped collection lifecycle.
//!
//! The [`IndexManager`] owns the mapping from a [`ConversationId`] to its
//! collection (`conversation_{id}`) and is the only component that calls the
//! [`VectorStore`]. It keeps at most one collection per conversation and
//! guarantees that no record with the wrong dimension reaches the store.
//!
//! Operations on different conversations may run concurrently. Overlapping
//! operations on the *same* conversation (for example ingesting while
//! querying) are not serialised here; callers must not overlap them.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::document::{ConversationId, IndexedFragment, ScoredFragment};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Manages one vector store collection per conversation.
#[derive(Clone)]
pub struct IndexManager {
    store: Arc<dyn VectorStore>,
}

impl IndexManager {
    /// Wrap a vector store.
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Return a reference to the underlying vector store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Make sure the conversation has a collection of the given dimension.
    ///
    /// An existing collection with the same dimension is kept. One with a
    /// different dimension is stale: it is dropped and recreated, never
    /// reused.
    pub async fn ensure_collection(
        &self,
        conversation_id: ConversationId,
        dimensions: usize,
    ) -> Result<()> {
        let collection = conversation_id.collection_name();
        match self.store.collection_dimensions(&collection).await? {
            Some(existing) if existing == dimensions => {
                debug!(
                    %conversation_id,
                    collection = %collection,
                    dimensions,
                    "collection already present"
                );
                return Ok(());
            }
            Some(existing) => {
                warn!(
                    %conversation_id,
                    collection = %collection,
                    existing,
                    dimensions,
                    "dropping collection with stale dimension"
                );
                self.store.drop_collection(&collection).await?;
            }
            None => {}
        }

        self.store.create_collection(&collection, dimensions).await.map_err(|e| {
            error!(
                %conversation_id,
                collection = %collection,
                error = %e,
                "failed to create collection"
            );
            e
        })?;
        debug!(%conversation_id, collection = %collection, dimensions, "created collection");
        Ok(())
    }

    /// Append fragments to the conversation's collection.
    ///
    /// # Errors
    ///
    /// - [`RagError::CollectionNotFound`] if
    ///   [`ensure_collection`](Self::ensure_collection) was not called first
    /// - [`RagError::DimensionMismatch`] if any embedding length differs from
    ///   the collection dimension; nothing is written in that case
    pub async fn insert(
        &self,
        conversation_id: ConversationId,
        fragments: &[IndexedFragment],
    ) -> Result<()> {
        let collection = conversation_id.collection_name();
        let dimensions = self
            .store
            .collection_dimensions(&collection)
            .await?
            .ok_or_else(|| RagError::CollectionNotFound { collection: collection.clone() })?;

        if let Some(bad) = fragments.iter().find(|f| f.embedding.len() != dimensions) {
            error!(
                %conversation_id,
                collection = %collection,
                expected = dimensions,
                actual = bad.embedding.len(),
                "rejecting fragment with wrong dimension"
            );
            return Err(RagError::DimensionMismatch {
                collection,
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }
        if fragments.is_empty() {
            return Ok(());
        }

        self.store.insert(&collection, fragments).await?;
        debug!(
            %conversation_id,
            collection = %collection,
            fragment_count = fragments.len(),
            "inserted fragments"
        );
        Ok(())
    }

    /// Return the `limit` fragments nearest to `query_embedding`.
    ///
    /// A conversation without a collection yields an empty result rather than
    /// an error, so querying before ingestion degrades gracefully.
    pub async fn search(
        &self,
        conversation_id: ConversationId,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredFragment>> {
        let collection = conversation_id.collection_name();
        let Some(dimensions) = self.store.collection_dimensions(&collection).await? else {
            warn!(%conversation_id, collection = %collection, "search on missing collection");
            return Ok(Vec::new());
        };
        if query_embedding.len() != dimensions {
            return Err(RagError::DimensionMismatch {
                collection,
                expected: dimensions,
                actual: query_embedding.len(),
            });
        }

        match self.store.search(&collection, query_embedding, limit).await {
            Ok(hits) => Ok(hits),
            // Dropped between the existence check and the search.
            Err(RagError::CollectionNotFound { .. }) => Ok(Vec::new()),
            Err(e) => {
                error!(
                    %conversation_id,
                    collection = %collection,
                    error = %e,
                    "vector store search failed"
                );
                Err(e)
            }
        }
    }

    /// Drop the conversation's collection. Removing a missing collection is a no-op.
    pub async fn remove(&self, conversation_id: ConversationId) -> Result<()> {
        let collection = conversation_id.collection_name();
        if !self.store.has_collection(&collection).await? {
            debug!(%conversation_id, collection = %collection, "nothing to remove");
            return Ok(());
        }
        self.store.drop_collection(&collection).await?;
        info!(%conversation_id, collection = %collection, "removed collection");
        Ok(())
    }

    /// Whether the conversation currently has a collection.
    pub async fn exists(&self, conversation_id: ConversationId) -> Result<bool> {
        self.store.has_collection(&conversation_id.collection_name()).await
    }

    /// Number of fragments stored for the conversation (0 if it has no collection).
    pub async fn count(&self, conversation_id: ConversationId) -> Result<usize> {
        let collection = conversation_id.collection_name();
        if !self.store.has_collection(&collection).await? {
            return Ok(0);
        }
        self.store.count(&collection).await
    }
}
