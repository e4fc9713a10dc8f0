//! Query-time retrieval: embed query → coarse search → rerank → select.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::Architecture;
use crate::document::ConversationId;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::IndexManager;
use crate::reranker::{CrossEncoder, rerank};

/// Two-stage retrieval over one conversation's index.
///
/// The coarse stage fetches `coarse_limit` nearest fragments by vector
/// similarity. Under [`Architecture::ClassicRag`] and
/// [`Architecture::BrainRag`] those candidates are scored by the
/// cross-encoder in a single call and the best `top_k` kept; under
/// [`Architecture::VectorOnly`] the first `top_k` coarse candidates are used
/// as they are.
#[derive(Clone)]
pub struct RetrievalPipeline {
    architecture: Architecture,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    cross_encoder: Arc<dyn CrossEncoder>,
    index: IndexManager,
    coarse_limit: usize,
    top_k: usize,
}

impl RetrievalPipeline {
    /// Create a retrieval pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` is zero or larger than
    /// `coarse_limit`.
    pub fn new(
        architecture: Architecture,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        cross_encoder: Arc<dyn CrossEncoder>,
        index: IndexManager,
        coarse_limit: usize,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if coarse_limit < top_k {
            return Err(RagError::ConfigError(format!(
                "coarse_limit ({coarse_limit}) must be at least top_k ({top_k})"
            )));
        }
        Ok(Self { architecture, embedding_provider, cross_encoder, index, coarse_limit, top_k })
    }

    /// The architecture this pipeline runs.
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Return the final contexts for `query`, most relevant first.
    ///
    /// A conversation that was never ingested yields an empty list. Embedding,
    /// search and reranking failures are returned as errors; there is no
    /// fallback to coarse order when the cross-encoder fails.
    pub async fn retrieve(
        &self,
        conversation_id: ConversationId,
        query: &str,
    ) -> Result<Vec<String>> {
        let query_embedding = self.embedding_provider.embed_query(query).await.map_err(|e| {
            error!(%conversation_id, error = %e, "embedding failed during query");
            e
        })?;

        let hits = self.index.search(conversation_id, &query_embedding, self.coarse_limit).await?;
        let candidates: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
        debug!(
            %conversation_id,
            architecture = %self.architecture,
            candidate_count = candidates.len(),
            "coarse search completed"
        );
        if candidates.is_empty() {
            return Ok(candidates);
        }

        if !self.architecture.reranks() {
            let mut contexts = candidates;
            contexts.truncate(self.top_k);
            return Ok(contexts);
        }

        rerank(self.cross_encoder.as_ref(), query, candidates, self.top_k).await.map_err(|e| {
            error!(
                %conversation_id,
                reranker = self.cross_encoder.name(),
                error = %e,
                "reranking failed"
            );
            e
        })
    }
}
