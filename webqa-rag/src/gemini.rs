//! Gemini embedding and generation over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationError, GenerationErrorKind, Generator};

/// The default Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";

/// The default dimensionality for `text-embedding-004`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "models/gemini-1.5-flash";

const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const PROVIDER: &str = "Gemini";

// Single texts are questions; batches are the chunks being indexed.
const QUERY_TASK: &str = "RETRIEVAL_QUERY";
const DOCUMENT_TASK: &str = "RETRIEVAL_DOCUMENT";

/// Read the API key from `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
///
/// # Errors
///
/// Returns [`RagError::Embedding`] if neither variable is set.
pub fn api_key_from_env() -> Result<String> {
    std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY")).map_err(|_| {
        RagError::Embedding {
            provider: PROVIDER.into(),
            message: "GOOGLE_API_KEY or GEMINI_API_KEY environment variable not set".into(),
        }
    })
}

fn normalize_model(model: impl Into<String>) -> String {
    let model = model.into();
    if model.starts_with("models/") { model } else { format!("models/{model}") }
}

fn http_client(timeout: Duration) -> std::result::Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the API's error message from a failed response body.
async fn error_detail(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// [`embed`](EmbeddingProvider::embed) sends its text as a retrieval query and
/// [`embed_batch`](EmbeddingProvider::embed_batch) as retrieval documents.
///
/// # Configuration
///
/// - `model` – defaults to `models/text-embedding-004`.
/// - `dimensions` – must match what the model returns; defaults to 768.
/// - `api_key` – from the constructor or [`api_key_from_env`].
///
/// # Example
///
/// ```rust,ignore
/// use webqa_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider with the given API key and the default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the key is empty or the HTTP client
    /// cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Embedding {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
            });
        }

        let client = http_client(DEFAULT_TIMEOUT).map_err(|e| RagError::Embedding {
            provider: PROVIDER.into(),
            message: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    /// Create a new provider using [`api_key_from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name (e.g. `models/embedding-001`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = normalize_model(model);
        self
    }

    /// Set the expected output dimensionality.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Point the provider at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content { role: None, parts: vec![Part { text }] },
            task_type,
        }
    }

    fn failure(&self, message: String) -> RagError {
        error!(provider = PROVIDER, model = %self.model, error = %message, "embedding request failed");
        RagError::Embedding { provider: PROVIDER.into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let body = self.request(text, QUERY_TASK);
        let url = format!("{}/{}:embedContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response).await;
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("failed to parse response: {e}")))?;
        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let body = BatchEmbedContentsRequest {
            requests: texts.iter().map(|&text| self.request(text, DOCUMENT_TASK)).collect(),
        };
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response).await;
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let parsed: BatchEmbedContentsResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("failed to parse response: {e}")))?;
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`Generator`] backed by the Gemini `generateContent` API.
///
/// HTTP 429 maps to [`GenerationErrorKind::RateLimited`], 400/404 to
/// [`GenerationErrorKind::InvalidRequest`]; timeouts and everything else to
/// [`GenerationErrorKind::Other`].
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiGenerator {
    /// Create a generator with the default model, temperature and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if the key is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Configuration("Gemini API key must not be empty".into()));
        }
        let client = http_client(DEFAULT_TIMEOUT).map_err(|e| {
            RagError::Configuration(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Set the model name (e.g. `gemini-2.5-flash`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = normalize_model(model);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout).map_err(|e| {
            RagError::Configuration(format!("failed to create HTTP client: {e}"))
        })?;
        Ok(self)
    }

    /// Point the generator at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let body = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() { "request timed out" } else { "request failed" };
                GenerationError::new(GenerationErrorKind::Other, format!("{detail}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response).await;
            return Err(GenerationError::new(
                GenerationErrorKind::from_status(status.as_u16()),
                format!("API returned {status}: {detail}"),
            ));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            GenerationError::new(
                GenerationErrorKind::Other,
                format!("failed to parse response: {e}"),
            )
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::new(
                GenerationErrorKind::Other,
                "response contained no text candidates",
            ));
        }
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_gain_prefix() {
        assert_eq!(normalize_model("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(normalize_model("models/text-embedding-004"), "models/text-embedding-004");
    }

    #[test]
    fn empty_key_is_a_configuration_failure() {
        assert!(matches!(GeminiEmbeddingProvider::new(""), Err(RagError::Embedding { .. })));
        assert!(matches!(GeminiGenerator::new("  "), Err(RagError::Configuration(_))));
    }

    #[test]
    fn queries_and_documents_use_distinct_task_types() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap().with_model("embedding-001");

        let query = serde_json::to_value(provider.request("what?", QUERY_TASK)).unwrap();
        assert_eq!(query["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(query["model"], "models/embedding-001");
        assert_eq!(query["content"]["parts"][0]["text"], "what?");

        let batch = BatchEmbedContentsRequest {
            requests: ["a", "b"].iter().map(|&t| provider.request(t, DOCUMENT_TASK)).collect(),
        };
        let batch = serde_json::to_value(&batch).unwrap();
        assert_eq!(batch["requests"][1]["taskType"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn generate_request_uses_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: "hi" }] }],
            generation_config: GenerationConfig { temperature: 0.2 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["temperature"].as_f64().unwrap() as f32, 0.2);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
