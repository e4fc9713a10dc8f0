//! Error types for the `convrag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error, raised when a pipeline or a
    /// strategy is constructed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while scoring (query, candidate) pairs.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The cross-encoder that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generator error ({generator}): {message}")]
    GeneratorError {
        /// The generator that produced the error.
        generator: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store could not be reached or rejected an operation.
    #[error("Index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An insert targeted a collection that was never created.
    #[error("Collection '{collection}' does not exist")]
    CollectionNotFound {
        /// The missing collection.
        collection: String,
    },

    /// An embedding does not match the dimension declared for its collection.
    #[error("Dimension mismatch in '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The collection (or provider) whose declared dimension was violated.
        collection: String,
        /// The declared dimension.
        expected: usize,
        /// The dimension actually observed.
        actual: usize,
    },

    /// The document collaborator could not produce text.
    #[error("Document error: {0}")]
    DocumentError(String),
}

impl RagError {
    /// Returns `true` when the error comes from a remote backend (embedding,
    /// reranking, generation or vector store) rather than from bad input.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingError { .. }
                | RagError::RerankerError { .. }
                | RagError::GeneratorError { .. }
                | RagError::IndexUnavailable { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
