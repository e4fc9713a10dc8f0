//! Conversation-scoped retrieval-augmented generation.
//!
//! This crate indexes one document per conversation and answers questions
//! about it:
//! - Chunking strategies (fixed-size, recursive, markdown)
//! - Embedding providers behind one trait, embedded in ordered concurrent batches
//! - An Index Manager keeping exactly one vector collection per conversation
//! - Two-stage retrieval: coarse vector search, then cross-encoder rerank
//! - Prompt assembly and answer generation
//! - A registry resolving strategies by name from a TOML-loadable config
//!
//! Network backends sit behind features: `openai` (embeddings and chat
//! completions), `http-rerank` (cross-encoder `/rerank` API) and `qdrant`
//! (vector store).

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod ingestion;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod reranker;
pub mod retrieval;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "http-rerank")]
pub mod http_rerank;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, FixedSizeChunker, MarkdownChunker, RecursiveChunker};
pub use config::{
    Architecture, ChunkerConfig, EmbedderConfig, GeneratorConfig, RagConfig, RagConfigBuilder,
    RerankerConfig, RetrievalConfig,
};
pub use document::{
    ConversationId, ConversationState, Fragment, IndexedFragment, IngestReport, QueryResponse,
    ScoredFragment,
};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{Generator, build_prompt, question_prompt};
pub use index::IndexManager;
pub use inmemory::InMemoryVectorStore;
pub use ingestion::IngestionPipeline;
pub use parser::{DocumentParser, PlainTextParser};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use registry::StrategyRegistry;
pub use reranker::{CrossEncoder, KeywordOverlapCrossEncoder, rerank};
pub use retrieval::RetrievalPipeline;
pub use vectorstore::VectorStore;
