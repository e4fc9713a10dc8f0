//! Configuration loading and registry-driven pipeline construction.

mod common;

use std::sync::Arc;

use common::RecordingGenerator;
use convrag::{
    Architecture, ConversationId, Generator, InMemoryVectorStore, RagConfig, RagError,
    RagPipeline, StrategyRegistry,
};

const TOML: &str = r#"
architecture = "vector-only"

[chunker]
strategy = "recursive"
chunk_size = 64
chunk_overlap = 8

[embedder]
strategy = "hash"
dimensions = 128
batch_size = 16

[retrieval]
coarse_limit = 12
top_k = 3
"#;

#[test]
fn toml_overrides_only_named_fields() {
    let config = RagConfig::from_toml_str(TOML).unwrap();
    assert_eq!(config.architecture().unwrap(), Architecture::VectorOnly);
    assert_eq!(config.chunker.strategy, "recursive");
    assert_eq!(config.chunker.chunk_size, 64);
    assert_eq!(config.chunker.chunk_overlap, 8);
    assert_eq!(config.embedder.dimensions, 128);
    assert_eq!(config.embedder.batch_size, 16);
    assert_eq!(config.embedder.concurrency, 4);
    assert_eq!(config.reranker.strategy, "keyword-overlap");
    assert_eq!(config.retrieval.coarse_limit, 12);
    assert_eq!(config.retrieval.top_k, 3);
}

#[test]
fn empty_toml_gives_defaults() {
    let config = RagConfig::from_toml_str("").unwrap();
    assert_eq!(config, RagConfig::default());
    assert_eq!(config.architecture().unwrap(), Architecture::ClassicRag);
    assert_eq!(config.retrieval.coarse_limit, 20);
    assert_eq!(config.retrieval.top_k, 4);
}

#[test]
fn invalid_values_are_configuration_errors() {
    let cases = [
        "[chunker]\nchunk_size = 0",
        "[chunker]\nchunk_size = 10\nchunk_overlap = 10",
        "[embedder]\ndimensions = 0",
        "[retrieval]\ntop_k = 0",
        "[retrieval]\ncoarse_limit = 2\ntop_k = 5",
        "[generator]\ntemperature = 3.5",
        "architecture = \"graph-rag\"",
        "architecture = [",
    ];
    for source in cases {
        let result = RagConfig::from_toml_str(source);
        assert!(matches!(result, Err(RagError::ConfigError(_))), "accepted: {source}");
    }
}

#[test]
fn builder_validates() {
    let result = RagConfig::builder().chunk_size(0).build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let config = RagConfig::builder().architecture("vector-only").top_k(2).build().unwrap();
    assert_eq!(config.architecture, "vector-only");
}

#[test]
fn config_round_trips_through_toml() {
    let config = RagConfig::from_toml_str(TOML).unwrap();
    let rendered = toml::to_string(&config).unwrap();
    assert_eq!(RagConfig::from_toml_str(&rendered).unwrap(), config);
}

#[test]
fn load_reports_missing_file() {
    let result = RagConfig::load("/nonexistent/convrag/rag.toml");
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

fn registry_with_recording_generator() -> StrategyRegistry {
    let mut registry = StrategyRegistry::with_defaults();
    registry.register_generator("recording", |_| {
        Ok(Arc::new(RecordingGenerator::default()) as Arc<dyn Generator>)
    });
    registry
}

#[test]
fn unknown_strategy_is_rejected_at_construction() {
    let registry = registry_with_recording_generator();
    let store = Arc::new(InMemoryVectorStore::new());

    let mut config = RagConfig::default();
    config.generator.strategy = "recording".to_string();
    config.embedder.strategy = "word2vec".to_string();
    let result = RagPipeline::from_config(config, store.clone(), &registry);
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let mut config = RagConfig::default();
    config.generator.strategy = "oracle".to_string();
    let result = RagPipeline::from_config(config, store, &registry);
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

#[test]
fn default_registry_knows_local_strategies() {
    let registry = StrategyRegistry::with_defaults();
    let config = RagConfig::default();
    for chunker in ["fixed-size", "recursive", "markdown"] {
        let mut chunker_config = config.chunker.clone();
        chunker_config.strategy = chunker.to_string();
        assert_eq!(registry.build_chunker(&chunker_config).unwrap().name(), chunker);
    }
    assert_eq!(registry.build_embedder(&config.embedder).unwrap().dimensions(), 384);
    assert_eq!(registry.build_cross_encoder(&config.reranker).unwrap().name(), "keyword-overlap");
}

#[tokio::test]
async fn pipeline_from_config_answers_queries() {
    let config = RagConfig::from_toml_str(
        r#"
        [chunker]
        strategy = "recursive"
        chunk_size = 40

        [embedder]
        strategy = "hash"
        dimensions = 64

        [generator]
        strategy = "recording"

        [retrieval]
        coarse_limit = 5
        top_k = 1
        "#,
    )
    .unwrap();

    let pipeline = RagPipeline::from_config(
        config,
        Arc::new(InMemoryVectorStore::new()),
        &registry_with_recording_generator(),
    )
    .unwrap();

    let document = "Rust has ownership.\n\nPython has a garbage collector.";
    let report = pipeline.process_document(ConversationId(5), document).await.unwrap();
    assert_eq!(report.fragment_count, 2);
    assert_eq!(report.dimensions, 64);

    let response = pipeline.process_query(ConversationId(5), "rust ownership").await.unwrap();
    assert_eq!(response.contexts, vec!["Rust has ownership.\n\n"]);
    assert_eq!(response.answer, "grounded answer");
    pipeline.close().await.unwrap();
}
