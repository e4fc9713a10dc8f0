//! Cross-encoder trait and the rerank stage of retrieval.
//!
//! A cross-encoder scores `(query, candidate)` pairs jointly. Scores are only
//! comparable within one [`compare`](CrossEncoder::compare) call, so the
//! rerank stage orders by relative score and never applies an absolute
//! threshold.

use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RagError, Result};

/// A pairwise relevance model.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score each `(query, candidate)` pair; higher is more relevant.
    ///
    /// Returns exactly one score per pair, in input order.
    async fn compare(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>>;

    /// The registered name of this cross-encoder.
    fn name(&self) -> &str;

    /// Release held network or model resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Score `candidates` against `query` in one call and return the `top_k`
/// best, most relevant first.
///
/// The sort is stable: candidates with equal scores keep their coarse order.
/// NaN scores rank below every number.
///
/// # Errors
///
/// Propagates the cross-encoder failure, and returns
/// [`RagError::RerankerError`] if it does not return one score per candidate.
pub async fn rerank(
    cross_encoder: &dyn CrossEncoder,
    query: &str,
    candidates: Vec<String>,
    top_k: usize,
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let pairs: Vec<(&str, &str)> = candidates.iter().map(|c| (query, c.as_str())).collect();
    let scores = cross_encoder.compare(&pairs).await?;
    if scores.len() != candidates.len() {
        return Err(RagError::RerankerError {
            reranker: cross_encoder.name().to_string(),
            message: format!("expected {} scores, got {}", candidates.len(), scores.len()),
        });
    }
    debug!(reranker = cross_encoder.name(), candidate_count = candidates.len(), "scored candidates");

    let mut ranked: Vec<(String, f32)> = candidates.into_iter().zip(scores).collect();
    ranked.sort_by(|(_, a), (_, b)| compare_desc(*a, *b));
    ranked.truncate(top_k);
    Ok(ranked.into_iter().map(|(text, _)| text).collect())
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
    key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal)
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A local cross-encoder scoring lexical overlap.
///
/// The score is the fraction of distinct query words that also occur in the
/// candidate, in `0.0..=1.0`. Useful when no model endpoint is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlapCrossEncoder;

#[async_trait]
impl CrossEncoder for KeywordOverlapCrossEncoder {
    async fn compare(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        Ok(pairs
            .iter()
            .map(|(query, candidate)| {
                let query_tokens = tokens(query);
                if query_tokens.is_empty() {
                    return 0.0;
                }
                let candidate_tokens = tokens(candidate);
                let hits = query_tokens.intersection(&candidate_tokens).count();
                hits as f32 / query_tokens.len() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "keyword-overlap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_sorts_last() {
        let mut scores = vec![f32::NAN, 0.1, 0.7];
        scores.sort_by(|a, b| compare_desc(*a, *b));
        assert_eq!(scores[0], 0.7);
        assert_eq!(scores[1], 0.1);
        assert!(scores[2].is_nan());
    }

    #[tokio::test]
    async fn keyword_overlap_scores_fraction_of_query_words() {
        let scores = KeywordOverlapCrossEncoder
            .compare(&[("red fox", "The red car"), ("red fox", "a fox, red"), ("red fox", "")])
            .await
            .unwrap();
        assert_eq!(scores, vec![0.5, 1.0, 0.0]);
    }
}
