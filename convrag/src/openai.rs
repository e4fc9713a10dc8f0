//! OpenAI-compatible embedding provider and chat generator.
//!
//! Both talk to any service exposing the OpenAI `/embeddings` and
//! `/chat/completions` endpoints; point `base_url` elsewhere (OpenRouter, a
//! local gateway) to switch vendors.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{EmbedderConfig, GeneratorConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Embedding models with a fixed output size that reject the `dimensions`
/// request parameter.
const FIXED_SIZE_EMBEDDING_MODELS: [(&str, usize); 1] = [("text-embedding-ada-002", 1536)];

/// The output size of `model` if it cannot be changed per request.
fn fixed_output_size(model: &str) -> Option<usize> {
    FIXED_SIZE_EMBEDDING_MODELS.iter().find(|(name, _)| *name == model).map(|(_, size)| *size)
}

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const API_KEY_ENV: &str = "OPENAI_API_KEY";

fn resolve_api_key(configured: Option<&str>) -> Result<String> {
    let key = match configured {
        Some(key) => key.to_string(),
        None => std::env::var(API_KEY_ENV).map_err(|_| {
            RagError::ConfigError(format!(
                "OpenAI API key missing: set it in the config or via {API_KEY_ENV}"
            ))
        })?,
    };
    if key.is_empty() {
        return Err(RagError::ConfigError("OpenAI API key must not be empty".to_string()));
    }
    Ok(key)
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))
}

fn endpoint(base_url: Option<&str>, path: &str) -> String {
    format!("{}/{path}", base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/'))
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – requested from the API (Matryoshka truncation), so every
///   returned vector has the configured length. Fixed-size models such as
///   `text-embedding-ada-002` are sent no `dimensions` and must be configured
///   with their native size.
/// - `api_key` – from the config or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use convrag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...", 384)?;
/// let embedding = provider.embed_query("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, dimensions: usize) -> Result<Self> {
        let config = EmbedderConfig {
            strategy: "openai".to_string(),
            api_key: Some(api_key.into()),
            dimensions,
            ..Default::default()
        };
        Self::from_config(&config)
    }

    /// Create a provider from an [`EmbedderConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no API key is available,
    /// `dimensions` is zero, or the model has a fixed output size other than
    /// `dimensions`.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        if config.dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        let model = if config.model.is_empty() {
            DEFAULT_EMBEDDING_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let requested_dimensions = match fixed_output_size(&model) {
            Some(size) if size != config.dimensions => {
                return Err(RagError::ConfigError(format!(
                    "embedding model '{model}' always returns {size} dimensions, \
                     but {} are configured",
                    config.dimensions
                )));
            }
            Some(_) => None,
            None => Some(config.dimensions),
        };
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(config.base_url.as_deref(), "embeddings"),
            api_key: resolve_api_key(config.api_key.as_deref())?,
            model,
            dimensions: config.dimensions,
            requested_dimensions,
        })
    }

    /// The model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingProvider {
    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingError { provider: "openai".to_string(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "openai", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "openai", error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "openai", %message, "API error");
            return Err(self.failure(message));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "openai", error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// A [`Generator`] backed by an OpenAI-compatible chat-completions endpoint.
///
/// Sends the configured system prompt followed by the grounded prompt as a
/// user message, and returns the first choice's content.
pub struct OpenAIGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a generator from a [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no API key is available or the
    /// temperature is outside `0.0..=2.0`.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                config.temperature
            )));
        }
        let model = if config.model.is_empty() {
            DEFAULT_CHAT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(config.base_url.as_deref(), "chat/completions"),
            api_key: resolve_api_key(config.api_key.as_deref())?,
            model,
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
        })
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GeneratorError { generator: "openai".to_string(), message }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// The first choice's content, unless it is missing or blank.
fn first_answer(chat: ChatResponse) -> Option<String> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(generator = "openai", model = %self.model, prompt_len = prompt.len(), "generating");

        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage { role: "system", content: &self.system_prompt });
        }
        messages.push(ChatMessage { role: "user", content: prompt });
        let request_body =
            ChatRequest { model: &self.model, messages, temperature: self.temperature };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(generator = "openai", error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(generator = "openai", %message, "API error");
            return Err(self.failure(message));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(generator = "openai", error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        first_answer(chat).ok_or_else(|| {
            error!(generator = "openai", "response contained no answer");
            self.failure("response contained no answer".to_string())
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint(Some("https://openrouter.ai/api/v1/"), "chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(endpoint(None, "embeddings"), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn configured_key_wins_and_empty_key_is_rejected() {
        assert_eq!(resolve_api_key(Some("sk-test")).unwrap(), "sk-test");
        assert!(matches!(resolve_api_key(Some("")), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn generator_rejects_out_of_range_temperature() {
        let config = GeneratorConfig {
            api_key: Some("sk-test".to_string()),
            temperature: 2.5,
            ..Default::default()
        };
        assert!(matches!(OpenAIGenerator::from_config(&config), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn blank_completion_is_not_an_answer() {
        let parse = |body: &str| first_answer(serde_json::from_str(body).unwrap());
        assert_eq!(
            parse(r#"{"choices":[{"message":{"content":"Paris."}}]}"#),
            Some("Paris.".to_string())
        );
        assert_eq!(parse(r#"{"choices":[{"message":{"content":""}}]}"#), None);
        assert_eq!(parse(r#"{"choices":[{"message":{"content":" \n "}}]}"#), None);
        assert_eq!(parse(r#"{"choices":[{"message":{"content":null}}]}"#), None);
        assert_eq!(parse(r#"{"choices":[]}"#), None);
    }

    #[test]
    fn fixed_size_models_omit_dimensions() {
        let ada = EmbedderConfig {
            strategy: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = OpenAIEmbeddingProvider::from_config(&ada).unwrap();
        let body = EmbeddingRequest {
            model: provider.model(),
            input: &["hello"],
            dimensions: provider.requested_dimensions,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("dimensions").is_none());

        let small = OpenAIEmbeddingProvider::new("sk-test", 384).unwrap();
        assert_eq!(small.requested_dimensions, Some(384));
    }

    #[test]
    fn fixed_size_model_rejects_other_dimensions() {
        let config = EmbedderConfig {
            model: "text-embedding-ada-002".to_string(),
            dimensions: 384,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            OpenAIEmbeddingProvider::from_config(&config),
            Err(RagError::ConfigError(_))
        ));
    }
}
