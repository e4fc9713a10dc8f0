//! Document ingestion: chunk → embed → pair → persist.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info, warn};

use crate::chunking::Chunker;
use crate::document::{ConversationId, IndexedFragment, IngestReport};
use crate::embedding::{EmbeddingProvider, validate_batch};
use crate::error::{RagError, Result};
use crate::generation::{Generator, question_prompt};
use crate::index::IndexManager;

/// Default number of fragments per embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default number of embedding calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Turns source text into a freshly built conversation index.
///
/// Every call rebuilds the conversation from scratch, so ingesting the same
/// document twice leaves the same number of fragments. Fragments are
/// embedded in batches of `batch_size`, with up to `concurrency` batches in
/// flight; results keep document order.
///
/// With a question generator set, each fragment is embedded as
/// `"{questions} {fragment}"`, where `questions` is what the generator
/// answers to [`question_prompt`]. The stored text is still the fragment.
#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    question_generator: Option<Arc<dyn Generator>>,
    index: IndexManager,
    batch_size: usize,
    concurrency: usize,
}

impl IngestionPipeline {
    /// Create a pipeline with default batching.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: IndexManager,
    ) -> Self {
        Self {
            chunker,
            embedding_provider,
            question_generator: None,
            index,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the batch size and the number of concurrent embedding calls.
    ///
    /// Zero values are treated as one.
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    /// Embed each fragment together with generated reader questions.
    pub fn with_question_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.question_generator = Some(generator);
        self
    }

    /// Chunk and embed `text` without touching the index.
    ///
    /// # Errors
    ///
    /// Returns the embedding or question generation failure for the whole
    /// document, or [`RagError::DimensionMismatch`] if the provider returned
    /// vectors of the wrong length.
    pub async fn prepare(&self, text: &str) -> Result<Vec<IndexedFragment>> {
        let fragments = self.chunker.chunk(text);
        debug!(
            chunker = self.chunker.name(),
            text_len = text.len(),
            fragment_count = fragments.len(),
            "chunked document"
        );
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        let embeddings = match &self.question_generator {
            Some(generator) => {
                let augmented = self.augment_with_questions(generator.as_ref(), &texts).await?;
                let augmented: Vec<&str> = augmented.iter().map(String::as_str).collect();
                self.embed_all(&augmented).await?
            }
            None => self.embed_all(&texts).await?,
        };

        Ok(fragments
            .into_iter()
            .zip(embeddings)
            .map(|(fragment, embedding)| IndexedFragment { text: fragment.text, embedding })
            .collect())
    }

    async fn augment_with_questions(
        &self,
        generator: &dyn Generator,
        texts: &[&str],
    ) -> Result<Vec<String>> {
        debug!(
            generator = generator.name(),
            fragment_count = texts.len(),
            "generating questions for fragments"
        );
        stream::iter(texts.iter().copied())
            .map(|text| async move {
                let questions = generator.generate(&question_prompt(text)).await?;
                Ok::<_, RagError>(format!("{questions} {text}"))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let provider = &self.embedding_provider;
        let batch_count = texts.len().div_ceil(self.batch_size);
        debug!(
            provider = provider.name(),
            fragment_count = texts.len(),
            batch_count,
            concurrency = self.concurrency,
            "embedding fragments"
        );

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| async move {
                let vectors = provider.embed_documents(batch).await?;
                validate_batch(provider.name(), provider.dimensions(), batch.len(), &vectors)?;
                Ok::<_, RagError>(vectors)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Rebuild the conversation's index from `text`.
    ///
    /// Runs chunking, question generation (if set) and embedding first; if
    /// any of them fails the existing index is left as it was. Then drops any
    /// previous collection, creates a new one and inserts the fragments. If the insert fails, the new collection
    /// is removed again so no partial index survives.
    pub async fn ingest(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<IngestReport> {
        let fragments = self.prepare(text).await.map_err(|e| {
            error!(%conversation_id, error = %e, "fragment preparation failed during ingestion");
            e
        })?;

        let dimensions = self.embedding_provider.dimensions();
        self.index.remove(conversation_id).await?;
        self.index.ensure_collection(conversation_id, dimensions).await?;

        if let Err(e) = self.index.insert(conversation_id, &fragments).await {
            error!(%conversation_id, error = %e, "insert failed during ingestion");
            if let Err(cleanup) = self.index.remove(conversation_id).await {
                warn!(%conversation_id, error = %cleanup, "failed to remove partial collection");
            }
            return Err(e);
        }

        let report = IngestReport {
            conversation_id,
            collection: conversation_id.collection_name(),
            fragment_count: fragments.len(),
            dimensions,
        };
        info!(
            %conversation_id,
            collection = %report.collection,
            fragment_count = report.fragment_count,
            "ingested document"
        );
        Ok(report)
    }
}
