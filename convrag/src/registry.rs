//! Name → constructor registry for pipeline strategies.
//!
//! Each strategy kind has its own map from a registered name to a factory
//! closure taking that kind's typed config record. The registry is consulted
//! once, when [`RagPipeline::from_config`](crate::RagPipeline::from_config)
//! builds a pipeline; strategies are never swapped afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use convrag::{StrategyRegistry, Generator};
//!
//! let mut registry = StrategyRegistry::with_defaults();
//! registry.register_generator("echo", |_config| Ok(Arc::new(EchoGenerator) as Arc<dyn Generator>));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::chunking::{Chunker, FixedSizeChunker, MarkdownChunker, RecursiveChunker};
use crate::config::{ChunkerConfig, EmbedderConfig, GeneratorConfig, RerankerConfig};
use crate::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::reranker::{CrossEncoder, KeywordOverlapCrossEncoder};

/// Builds a [`Chunker`] from its config record.
pub type ChunkerFactory = Arc<dyn Fn(&ChunkerConfig) -> Result<Arc<dyn Chunker>> + Send + Sync>;

/// Builds an [`EmbeddingProvider`] from its config record.
pub type EmbedderFactory =
    Arc<dyn Fn(&EmbedderConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// Builds a [`CrossEncoder`] from its config record.
pub type CrossEncoderFactory =
    Arc<dyn Fn(&RerankerConfig) -> Result<Arc<dyn CrossEncoder>> + Send + Sync>;

/// Builds a [`Generator`] from its config record.
pub type GeneratorFactory =
    Arc<dyn Fn(&GeneratorConfig) -> Result<Arc<dyn Generator>> + Send + Sync>;

/// Maps strategy names to constructors, one map per strategy kind.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    chunkers: HashMap<String, ChunkerFactory>,
    embedders: HashMap<String, EmbedderFactory>,
    cross_encoders: HashMap<String, CrossEncoderFactory>,
    generators: HashMap<String, GeneratorFactory>,
}

fn unknown(kind: &str, name: &str, known: Vec<&String>) -> RagError {
    let mut known: Vec<&str> = known.into_iter().map(String::as_str).collect();
    known.sort_unstable();
    RagError::ConfigError(format!(
        "unknown {kind} strategy '{name}' (registered: {})",
        if known.is_empty() { "none".to_string() } else { known.join(", ") }
    ))
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in strategy enabled by the crate features.
    ///
    /// Always present: chunkers `fixed-size`, `recursive` and `markdown`,
    /// embedder `hash`, cross-encoder `keyword-overlap`. With `openai`: the
    /// `openai` embedder and generator. With `http-rerank`: the `http`
    /// cross-encoder.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register_chunker("fixed-size", |c| {
            Ok(Arc::new(FixedSizeChunker::new(c.chunk_size, c.chunk_overlap)?) as Arc<dyn Chunker>)
        });
        registry.register_chunker("recursive", |c| {
            Ok(Arc::new(RecursiveChunker::new(c.chunk_size, c.chunk_overlap)?) as Arc<dyn Chunker>)
        });
        registry.register_chunker("markdown", |c| {
            Ok(Arc::new(MarkdownChunker::new(c.chunk_size, c.chunk_overlap)?) as Arc<dyn Chunker>)
        });

        registry.register_embedder("hash", |c| {
            Ok(Arc::new(HashEmbeddingProvider::new(c.dimensions)?) as Arc<dyn EmbeddingProvider>)
        });

        registry.register_cross_encoder("keyword-overlap", |_| {
            Ok(Arc::new(KeywordOverlapCrossEncoder) as Arc<dyn CrossEncoder>)
        });

        #[cfg(feature = "openai")]
        {
            use crate::openai::{OpenAIEmbeddingProvider, OpenAIGenerator};

            registry.register_embedder("openai", |c| {
                Ok(Arc::new(OpenAIEmbeddingProvider::from_config(c)?)
                    as Arc<dyn EmbeddingProvider>)
            });
            registry.register_generator("openai", |c| {
                Ok(Arc::new(OpenAIGenerator::from_config(c)?) as Arc<dyn Generator>)
            });
        }

        #[cfg(feature = "http-rerank")]
        registry.register_cross_encoder("http", |c| {
            Ok(Arc::new(crate::http_rerank::HttpCrossEncoder::from_config(c)?)
                as Arc<dyn CrossEncoder>)
        });

        registry
    }

    /// Register (or replace) a chunker constructor.
    pub fn register_chunker<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ChunkerConfig) -> Result<Arc<dyn Chunker>> + Send + Sync + 'static,
    {
        self.chunkers.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register (or replace) an embedder constructor.
    pub fn register_embedder<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&EmbedderConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        self.embedders.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register (or replace) a cross-encoder constructor.
    pub fn register_cross_encoder<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&RerankerConfig) -> Result<Arc<dyn CrossEncoder>> + Send + Sync + 'static,
    {
        self.cross_encoders.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register (or replace) a generator constructor.
    pub fn register_generator<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&GeneratorConfig) -> Result<Arc<dyn Generator>> + Send + Sync + 'static,
    {
        self.generators.insert(name.into(), Arc::new(factory));
        self
    }

    /// Construct the chunker named in `config`.
    pub fn build_chunker(&self, config: &ChunkerConfig) -> Result<Arc<dyn Chunker>> {
        let factory = self
            .chunkers
            .get(&config.strategy)
            .ok_or_else(|| unknown("chunker", &config.strategy, self.chunkers.keys().collect()))?;
        factory(config)
    }

    /// Construct the embedder named in `config`.
    pub fn build_embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        let factory = self
            .embedders
            .get(&config.strategy)
            .ok_or_else(|| unknown("embedder", &config.strategy, self.embedders.keys().collect()))?;
        factory(config)
    }

    /// Construct the cross-encoder named in `config`.
    pub fn build_cross_encoder(&self, config: &RerankerConfig) -> Result<Arc<dyn CrossEncoder>> {
        let factory = self.cross_encoders.get(&config.strategy).ok_or_else(|| {
            unknown("reranker", &config.strategy, self.cross_encoders.keys().collect())
        })?;
        factory(config)
    }

    /// Construct the generator named in `config`.
    pub fn build_generator(&self, config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
        let factory = self.generators.get(&config.strategy).ok_or_else(|| {
            unknown("generator", &config.strategy, self.generators.keys().collect())
        })?;
        factory(config)
    }

    /// Whether a generator with this name is registered.
    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_lists_registered_strategies() {
        let registry = StrategyRegistry::with_defaults();
        let config = ChunkerConfig { strategy: "semantic".to_string(), ..Default::default() };
        match registry.build_chunker(&config) {
            Err(RagError::ConfigError(message)) => {
                assert!(message.contains("semantic"));
                assert!(message.contains("fixed-size, markdown, recursive"));
            }
            other => panic!("expected ConfigError, got {:?}", other.err()),
        }
    }

    #[test]
    fn empty_registry_reports_none() {
        let registry = StrategyRegistry::new();
        let err = registry.build_embedder(&EmbedderConfig::default()).err().unwrap();
        assert!(err.to_string().contains("registered: none"));
    }
}
