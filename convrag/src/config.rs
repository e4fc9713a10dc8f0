//! Configuration for the RAG pipeline.
//!
//! A [`RagConfig`] names the architecture and one strategy per stage, each
//! with its own typed options record. It can be built in code through
//! [`RagConfig::builder()`] or loaded from TOML:
//!
//! ```toml
//! architecture = "classic-rag"
//!
//! [chunker]
//! strategy = "fixed-size"
//! chunk_size = 256
//!
//! [embedder]
//! strategy = "openai"
//! model = "text-embedding-3-small"
//! dimensions = 384
//!
//! [retrieval]
//! coarse_limit = 20
//! top_k = 4
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The named retrieval architectures a pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// Coarse vector search followed by cross-encoder reranking.
    ClassicRag,
    /// Classic retrieval over fragments embedded together with the reader
    /// questions the generator writes for them. Stored texts stay the plain
    /// fragments.
    BrainRag,
    /// Coarse vector search only; the first `top_k` candidates are used.
    VectorOnly,
}

impl Architecture {
    /// The configuration name of this architecture.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::ClassicRag => "classic-rag",
            Architecture::BrainRag => "brain-rag",
            Architecture::VectorOnly => "vector-only",
        }
    }

    /// Whether this architecture runs the cross-encoder stage.
    pub fn reranks(&self) -> bool {
        matches!(self, Architecture::ClassicRag | Architecture::BrainRag)
    }

    /// Whether ingestion embeds generated questions alongside each fragment.
    pub fn augments_with_questions(&self) -> bool {
        matches!(self, Architecture::BrainRag)
    }
}

impl FromStr for Architecture {
    type Err = RagError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "classic-rag" => Ok(Architecture::ClassicRag),
            "brain-rag" => Ok(Architecture::BrainRag),
            "vector-only" => Ok(Architecture::VectorOnly),
            other => Err(RagError::ConfigError(format!(
                "unsupported architecture '{other}' (expected 'classic-rag', 'brain-rag' or 'vector-only')"
            ))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the chunking strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Registered chunker name (`fixed-size`, `recursive`, `markdown`).
    pub strategy: String,
    /// Maximum fragment size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive fragments.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { strategy: "fixed-size".to_string(), chunk_size: 256, chunk_overlap: 0 }
    }
}

/// Options for the embedding strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Registered embedder name (`hash`, `openai`).
    pub strategy: String,
    /// Backend model identifier.
    pub model: String,
    /// Dimension of every vector this embedder returns.
    pub dimensions: usize,
    /// API credential, if the backend needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the backend endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum number of fragments sent in one embedding call.
    pub batch_size: usize,
    /// Maximum number of embedding calls in flight during ingestion.
    pub concurrency: usize,
    /// Per-request timeout for network backends.
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            strategy: "hash".to_string(),
            model: String::new(),
            dimensions: 384,
            api_key: None,
            base_url: None,
            batch_size: 64,
            concurrency: 4,
            timeout_secs: 30,
        }
    }
}

/// Options for the cross-encoder strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RerankerConfig {
    /// Registered cross-encoder name (`keyword-overlap`, `http`).
    pub strategy: String,
    /// Backend model identifier.
    pub model: String,
    /// API credential, if the backend needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint of the rerank service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout for network backends.
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            strategy: "keyword-overlap".to_string(),
            model: String::new(),
            api_key: None,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Options for the answer generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Registered generator name (`openai`).
    pub strategy: String,
    /// Backend model identifier.
    pub model: String,
    /// API credential, if the backend needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the backend endpoint (OpenAI-compatible services).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Instructions sent ahead of every prompt.
    pub system_prompt: String,
    /// Sampling temperature, `0.0..=2.0`.
    pub temperature: f32,
    /// Per-request timeout for network backends.
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            system_prompt: "You are a helpful assistant. Answer the question using only the \
                            relevant documents provided."
                .to_string(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Candidate limits for the two retrieval stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours fetched by the coarse vector search.
    pub coarse_limit: usize,
    /// Number of contexts kept after reranking.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { coarse_limit: 20, top_k: 4 }
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Architecture name, see [`Architecture`].
    pub architecture: String,
    /// Chunking stage.
    pub chunker: ChunkerConfig,
    /// Embedding stage.
    pub embedder: EmbedderConfig,
    /// Rerank stage.
    pub reranker: RerankerConfig,
    /// Generation stage.
    pub generator: GeneratorConfig,
    /// Candidate limits.
    pub retrieval: RetrievalConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::ClassicRag.as_str().to_string(),
            chunker: ChunkerConfig::default(),
            embedder: EmbedderConfig::default(),
            reranker: RerankerConfig::default(),
            generator: GeneratorConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse and validate a TOML configuration.
    ///
    /// Missing sections and fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: RagConfig = toml::from_str(source)
            .map_err(|e| RagError::ConfigError(format!("invalid TOML configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            RagError::ConfigError(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// The parsed architecture.
    pub fn architecture(&self) -> Result<Architecture> {
        self.architecture.parse()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - the architecture name is unknown
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `dimensions`, `batch_size` or `concurrency` is zero
    /// - `top_k == 0` or `coarse_limit < top_k`
    /// - `temperature` is outside `0.0..=2.0`
    pub fn validate(&self) -> Result<()> {
        self.architecture()?;

        let chunker = &self.chunker;
        if chunker.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunker.chunk_overlap >= chunker.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunker.chunk_overlap, chunker.chunk_size
            )));
        }

        let embedder = &self.embedder;
        if embedder.dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        if embedder.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if embedder.concurrency == 0 {
            return Err(RagError::ConfigError("concurrency must be greater than zero".to_string()));
        }

        let retrieval = &self.retrieval;
        if retrieval.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if retrieval.coarse_limit < retrieval.top_k {
            return Err(RagError::ConfigError(format!(
                "coarse_limit ({}) must be at least top_k ({})",
                retrieval.coarse_limit, retrieval.top_k
            )));
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.generator.temperature
            )));
        }

        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the architecture by name.
    pub fn architecture(mut self, name: impl Into<String>) -> Self {
        self.config.architecture = name.into();
        self
    }

    /// Replace the whole chunker section.
    pub fn chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.config.chunker = chunker;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunker.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunker.chunk_overlap = overlap;
        self
    }

    /// Replace the whole embedder section.
    pub fn embedder(mut self, embedder: EmbedderConfig) -> Self {
        self.config.embedder = embedder;
        self
    }

    /// Set the embedding dimension.
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.config.embedder.dimensions = dimensions;
        self
    }

    /// Replace the whole reranker section.
    pub fn reranker(mut self, reranker: RerankerConfig) -> Self {
        self.config.reranker = reranker;
        self
    }

    /// Replace the whole generator section.
    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.config.generator = generator;
        self
    }

    /// Set the number of coarse candidates fetched before reranking.
    pub fn coarse_limit(mut self, limit: usize) -> Self {
        self.config.retrieval.coarse_limit = limit;
        self
    }

    /// Set the number of contexts kept after reranking.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.retrieval.top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
