//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] ties the [`IngestionPipeline`] and the
//! [`RetrievalPipeline`] to a named [`Architecture`], assembles the grounded
//! prompt and calls the [`Generator`].
//!
//! Per conversation the pipeline moves between two observable states:
//!
//! ```text
//!            process_document              remove_conversation
//!   Empty ───────────────────────▶ Indexed ───────────────────▶ Empty
//!                                   │  ▲
//!                                   └──┘ process_document (rebuild)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use convrag::{InMemoryVectorStore, RagConfig, RagPipeline, StrategyRegistry};
//!
//! let config = RagConfig::load("rag.toml")?;
//! let pipeline = RagPipeline::from_config(
//!     config,
//!     Arc::new(InMemoryVectorStore::new()),
//!     &StrategyRegistry::with_defaults(),
//! )?;
//!
//! pipeline.process_document(7.into(), &document).await?;
//! let response = pipeline.process_query(7.into(), "Where did the cat sit?").await?;
//! println!("{}", response.answer);
//! pipeline.close().await?;
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::config::{Architecture, RagConfig};
use crate::document::{ConversationId, ConversationState, IngestReport, QueryResponse};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{Generator, build_prompt};
use crate::index::IndexManager;
use crate::ingestion::IngestionPipeline;
use crate::registry::StrategyRegistry;
use crate::reranker::CrossEncoder;
use crate::retrieval::RetrievalPipeline;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Strategies are fixed at construction; to change any of them build a new
/// pipeline. Construct one via [`RagPipeline::builder()`] or
/// [`RagPipeline::from_config`].
pub struct RagPipeline {
    config: RagConfig,
    architecture: Architecture,
    index: IndexManager,
    ingestion: IngestionPipeline,
    retrieval: RetrievalPipeline,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    cross_encoder: Arc<dyn CrossEncoder>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Build a pipeline whose strategies are resolved by name from `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the configuration is invalid or
    /// names a strategy the registry does not know, or any error raised by a
    /// strategy constructor.
    pub fn from_config(
        config: RagConfig,
        vector_store: Arc<dyn VectorStore>,
        registry: &StrategyRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = registry.build_chunker(&config.chunker)?;
        let embedding_provider = registry.build_embedder(&config.embedder)?;
        let cross_encoder = registry.build_cross_encoder(&config.reranker)?;
        let generator = registry.build_generator(&config.generator)?;

        Self::builder()
            .config(config)
            .chunker(chunker)
            .embedding_provider(embedding_provider)
            .cross_encoder(cross_encoder)
            .generator(generator)
            .vector_store(vector_store)
            .build()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The architecture this pipeline runs.
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Return a reference to the Index Manager.
    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    /// Index `text` for the conversation, replacing anything indexed before.
    ///
    /// Ingesting the same document twice leaves the same fragments, never
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the call. No partial index is left behind:
    /// a failed insert removes the freshly created collection.
    pub async fn process_document(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<IngestReport> {
        self.ingestion.ingest(conversation_id, text).await
    }

    /// Retrieve the final contexts for `query` without generating an answer.
    pub async fn retrieve(
        &self,
        conversation_id: ConversationId,
        query: &str,
    ) -> Result<Vec<String>> {
        self.retrieval.retrieve(conversation_id, query).await
    }

    /// Answer `query` from the conversation's indexed document.
    ///
    /// A conversation without an index yields empty `contexts`; the generator
    /// is still asked, with a prompt that lists no documents.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as errors, never as an empty answer, so
    /// "nothing relevant found" stays distinguishable from "the backend
    /// failed".
    pub async fn process_query(
        &self,
        conversation_id: ConversationId,
        query: &str,
    ) -> Result<QueryResponse> {
        let contexts = self.retrieval.retrieve(conversation_id, query).await?;
        if contexts.is_empty() {
            warn!(%conversation_id, "no contexts retrieved for query");
        }

        let prompt = build_prompt(query, &contexts);
        let answer = self.generator.generate(&prompt).await.map_err(|e| {
            error!(
                %conversation_id,
                generator = self.generator.name(),
                error = %e,
                "generation failed"
            );
            e
        })?;

        info!(
            %conversation_id,
            architecture = %self.architecture,
            context_count = contexts.len(),
            answer_len = answer.len(),
            "query completed"
        );
        Ok(QueryResponse { query: query.to_string(), answer, contexts })
    }

    /// Drop the conversation's index. Idempotent.
    pub async fn remove_conversation(&self, conversation_id: ConversationId) -> Result<()> {
        self.index.remove(conversation_id).await
    }

    /// Report whether the conversation currently has an index.
    pub async fn conversation_state(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ConversationState> {
        if self.index.exists(conversation_id).await? {
            Ok(ConversationState::Indexed)
        } else {
            Ok(ConversationState::Empty)
        }
    }

    /// Release resources held by the strategies.
    ///
    /// Every strategy is closed even if an earlier one fails; the first error
    /// is returned.
    pub async fn close(&self) -> Result<()> {
        let results = [
            self.embedding_provider.close().await,
            self.cross_encoder.close().await,
            self.generator.close().await,
        ];
        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "failed to close strategy");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!("pipeline closed");
                Ok(())
            }
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields are required. Call [`build()`](RagPipelineBuilder::build) to
/// validate and produce the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .chunker(Arc::new(FixedSizeChunker::new(256, 0)?))
///     .embedding_provider(Arc::new(HashEmbeddingProvider::new(384)?))
///     .cross_encoder(Arc::new(KeywordOverlapCrossEncoder))
///     .generator(Arc::new(my_generator))
///     .vector_store(Arc::new(InMemoryVectorStore::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
    generator: Option<Arc<dyn Generator>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the cross-encoder used by the rerank stage.
    pub fn cross_encoder(mut self, cross_encoder: Arc<dyn CrossEncoder>) -> Self {
        self.cross_encoder = Some(cross_encoder);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any field is missing, the
    /// configuration is invalid, or the embedder's dimension differs from the
    /// configured one.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let cross_encoder = self
            .cross_encoder
            .ok_or_else(|| RagError::ConfigError("cross_encoder is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        if embedding_provider.dimensions() != config.embedder.dimensions {
            return Err(RagError::ConfigError(format!(
                "embedder '{}' produces {} dimensions but {} are configured",
                embedding_provider.name(),
                embedding_provider.dimensions(),
                config.embedder.dimensions
            )));
        }

        let architecture = config.architecture()?;
        let index = IndexManager::new(vector_store);
        let mut ingestion =
            IngestionPipeline::new(chunker, embedding_provider.clone(), index.clone())
                .with_batching(config.embedder.batch_size, config.embedder.concurrency);
        if architecture.augments_with_questions() {
            ingestion = ingestion.with_question_generator(generator.clone());
        }
        let retrieval = RetrievalPipeline::new(
            architecture,
            embedding_provider.clone(),
            cross_encoder.clone(),
            index.clone(),
            config.retrieval.coarse_limit,
            config.retrieval.top_k,
        )?;

        Ok(RagPipeline {
            config,
            architecture,
            index,
            ingestion,
            retrieval,
            embedding_provider,
            cross_encoder,
            generator,
        })
    }
}
