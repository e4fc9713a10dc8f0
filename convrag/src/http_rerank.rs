//! Cross-encoder backed by a hosted `/rerank` API.
//!
//! Speaks the request shape shared by Cohere, Jina and self-hosted
//! text-embeddings-inference style services:
//!
//! ```text
//! POST {base_url}/rerank
//! { "model": "...", "query": "...", "documents": ["...", ...] }
//! → { "results": [ { "index": 0, "relevance_score": 0.93 }, ... ] }
//! ```
//!
//! This module is only available when the `http-rerank` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RerankerConfig;
use crate::error::{RagError, Result};
use crate::reranker::CrossEncoder;

const API_KEY_ENV: &str = "RERANK_API_KEY";

/// A [`CrossEncoder`] calling a remote rerank service.
///
/// Pairs are grouped by query (in practice there is one query per
/// [`compare`](CrossEncoder::compare) call) and each group is scored in a
/// single request. Scores are mapped back to input order through the
/// returned `index`.
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpCrossEncoder {
    /// Create a cross-encoder from a [`RerankerConfig`].
    ///
    /// `base_url` is required. The API key is optional (self-hosted services
    /// often need none) and falls back to `RERANK_API_KEY`.
    pub fn from_config(config: &RerankerConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            RagError::ConfigError("the http reranker requires base_url".to_string())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            url: format!("{}/rerank", base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    fn failure(&self, message: String) -> RagError {
        RagError::RerankerError { reranker: "http".to_string(), message }
    }

    async fn score_group(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let body = RerankRequest {
            model: (!self.model.is_empty()).then_some(self.model.as_str()),
            query,
            documents,
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(reranker = "http", error = %e, "request failed");
            self.failure(format!("request failed: {e}"))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!(reranker = "http", %status, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let parsed: RerankResponse = response.json().await.map_err(|e| {
            error!(reranker = "http", error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        let mut scores = vec![None; documents.len()];
        for result in parsed.results {
            let slot = scores.get_mut(result.index).ok_or_else(|| {
                self.failure(format!("result index {} out of range", result.index))
            })?;
            *slot = Some(result.relevance_score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| score.ok_or_else(|| self.failure(format!("no score for document {i}"))))
            .collect()
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    query: &'a str,
    documents: &'a [&'a str],
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Group pair positions by query, keeping first-seen query order.
fn group_by_query<'a>(pairs: &[(&'a str, &'a str)]) -> Vec<(&'a str, Vec<usize>)> {
    let mut groups: Vec<(&'a str, Vec<usize>)> = Vec::new();
    for (i, &(query, _)) in pairs.iter().enumerate() {
        match groups.iter_mut().find(|group| group.0 == query) {
            Some(group) => group.1.push(i),
            None => groups.push((query, vec![i])),
        }
    }
    groups
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    async fn compare(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        let mut scores = vec![0.0; pairs.len()];
        for (query, positions) in group_by_query(pairs) {
            let documents: Vec<&str> = positions.iter().map(|&i| pairs[i].1).collect();
            debug!(reranker = "http", candidate_count = documents.len(), "scoring candidates");
            let group_scores = self.score_group(query, &documents).await?;
            for (position, score) in positions.into_iter().zip(group_scores) {
                scores[position] = score;
            }
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_pairs_by_query_in_order() {
        let pairs = [("q1", "a"), ("q2", "b"), ("q1", "c")];
        let groups = group_by_query(&pairs);
        assert_eq!(groups, vec![("q1", vec![0, 2]), ("q2", vec![1])]);
    }

    #[test]
    fn requires_base_url() {
        let config = RerankerConfig { strategy: "http".to_string(), ..Default::default() };
        assert!(matches!(HttpCrossEncoder::from_config(&config), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn parses_rerank_response() {
        let body = r#"{"results":[{"index":1,"relevance_score":0.9},{"index":0,"relevance_score":0.2}]}"#;
        let parsed: RerankResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].index, 1);
    }
}
