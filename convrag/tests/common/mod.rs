//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use convrag::{
    CrossEncoder, EmbeddingProvider, FixedSizeChunker, Generator, InMemoryVectorStore,
    IndexedFragment, KeywordOverlapCrossEncoder, RagConfig, RagError, RagPipeline, Result,
    ScoredFragment, VectorStore,
};

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Embeds text as word counts over a fixed vocabulary, one dimension per word.
///
/// Collision free, so similarity rankings are predictable.
pub struct VocabEmbedder {
    vocabulary: Vec<String>,
    pub document_calls: AtomicUsize,
}

impl VocabEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            document_calls: AtomicUsize::new(0),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for word in words(text) {
            if let Some(i) = self.vocabulary.iter().position(|v| *v == word) {
                vector[i] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for VocabEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn name(&self) -> &str {
        "vocab"
    }
}

/// Claims one dimension but returns vectors of another.
pub struct WrongDimensionEmbedder {
    pub declared: usize,
    pub actual: usize,
}

#[async_trait]
impl EmbeddingProvider for WrongDimensionEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; self.actual]).collect())
    }

    fn dimensions(&self) -> usize {
        self.declared
    }

    fn name(&self) -> &str {
        "wrong-dimension"
    }
}

/// Fails every call as an unreachable backend would.
pub struct FailingEmbedder {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_documents(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::EmbeddingError {
            provider: "failing".to_string(),
            message: "connection refused".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Scores candidates from a fixed text → score table; unknown texts score 0.
pub struct ScriptedCrossEncoder {
    scores: HashMap<String, f32>,
    pub calls: AtomicUsize,
}

impl ScriptedCrossEncoder {
    pub fn new(scores: &[(&str, f32)]) -> Self {
        Self {
            scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CrossEncoder for ScriptedCrossEncoder {
    async fn compare(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pairs.iter().map(|(_, c)| self.scores.get(*c).copied().unwrap_or(0.0)).collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub struct FailingCrossEncoder;

#[async_trait]
impl CrossEncoder for FailingCrossEncoder {
    async fn compare(&self, _pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        Err(RagError::RerankerError {
            reranker: "failing".to_string(),
            message: "model not loaded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Records every prompt and answers with a fixed string.
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub closed: AtomicUsize,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("grounded answer".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Answers every prompt with the same list of reader questions.
pub struct QuestionGenerator {
    pub questions: String,
    pub prompts: Mutex<Vec<String>>,
}

impl QuestionGenerator {
    pub fn new(questions: &str) -> Self {
        Self { questions: questions.to_string(), prompts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Generator for QuestionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.questions.clone())
    }

    fn name(&self) -> &str {
        "questions"
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GeneratorError {
            generator: "failing".to_string(),
            message: "quota exceeded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Wraps an in-memory store, counting inserts and optionally failing them.
#[derive(Default)]
pub struct InstrumentedStore {
    inner: InMemoryVectorStore,
    pub fail_inserts: bool,
    pub inserts: AtomicUsize,
}

impl InstrumentedStore {
    pub fn failing_inserts() -> Self {
        Self { fail_inserts: true, ..Default::default() }
    }
}

#[async_trait]
impl VectorStore for InstrumentedStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.inner.drop_collection(name).await
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>> {
        self.inner.collection_dimensions(name).await
    }

    async fn insert(&self, collection: &str, fragments: &[IndexedFragment]) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(RagError::IndexUnavailable {
                backend: "instrumented".to_string(),
                message: "write timed out".to_string(),
            });
        }
        self.inner.insert(collection, fragments).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredFragment>> {
        self.inner.search(collection, embedding, limit).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }
}

/// Vocabulary covering the cat/dog scenario.
pub const ANIMAL_VOCABULARY: [&str; 5] = ["the", "cat", "dog", "ran", "sat"];

pub const ANIMAL_DOCUMENT: &str = "The cat sat. The dog ran.";

pub fn animal_config(chunk_size: usize) -> RagConfig {
    RagConfig::builder()
        .chunk_size(chunk_size)
        .dimensions(ANIMAL_VOCABULARY.len())
        .coarse_limit(10)
        .top_k(2)
        .build()
        .unwrap()
}

/// Assemble a pipeline from explicit parts, bypassing the registry.
pub fn build_pipeline(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    cross_encoder: Arc<dyn CrossEncoder>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn VectorStore>,
) -> RagPipeline {
    let chunker =
        FixedSizeChunker::new(config.chunker.chunk_size, config.chunker.chunk_overlap).unwrap();
    RagPipeline::builder()
        .config(config)
        .chunker(Arc::new(chunker))
        .embedding_provider(embedder)
        .cross_encoder(cross_encoder)
        .generator(generator)
        .vector_store(store)
        .build()
        .unwrap()
}

/// The cat/dog pipeline over an in-memory store with keyword-overlap reranking.
pub fn animal_pipeline(chunk_size: usize) -> (RagPipeline, Arc<RecordingGenerator>) {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = build_pipeline(
        animal_config(chunk_size),
        Arc::new(VocabEmbedder::new(&ANIMAL_VOCABULARY)),
        Arc::new(KeywordOverlapCrossEncoder),
        generator.clone(),
        Arc::new(InMemoryVectorStore::new()),
    );
    (pipeline, generator)
}
