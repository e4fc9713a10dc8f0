//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. A call either embeds every input or fails as a whole; there is
/// no partial-batch success. Every vector returned by one instance has
/// [`dimensions()`](EmbeddingProvider::dimensions) elements.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let vectors = provider.embed_documents(&["hello", "world"]).await?;
/// assert_eq!(vectors[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one embedding per input text, in input order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single query.
    ///
    /// The default implementation forwards to
    /// [`embed_documents`](EmbeddingProvider::embed_documents). Override it
    /// for backends that embed queries differently from documents.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingError {
                provider: self.name().to_string(),
                message: "backend returned no embedding for the query".to_string(),
            }
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// The registered name of this provider.
    fn name(&self) -> &str;

    /// Release held network or model resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Check that a batch has one vector per input and that each has the
/// provider's declared dimension.
pub(crate) fn validate_batch(
    provider: &str,
    expected_dimensions: usize,
    expected_count: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(RagError::EmbeddingError {
            provider: provider.to_string(),
            message: format!("expected {expected_count} embeddings, got {}", vectors.len()),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dimensions) {
        return Err(RagError::DimensionMismatch {
            collection: provider.to_string(),
            expected: expected_dimensions,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// A local, deterministic embedder based on feature hashing.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimensions` buckets with a hash-derived sign, and the resulting vector is
/// L2-normalised. Texts sharing words land close together, which is enough
/// for demos and tests without any API key or model download.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` elements.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `dimensions == 0`.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        Ok(Self { dimensions })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}
