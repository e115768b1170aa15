//! Ollama Provider Implementation
//!
//! Local Ollama API integration for text generation and embeddings.
//!
//! # Features
//!
//! - Async HTTP communication with Ollama API
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use veritas_llm::{OllamaEmbedder, OllamaProvider};
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3").unwrap();
//! let embedder = OllamaEmbedder::new("http://localhost:11434", "nomic-embed-text", 768).unwrap();
//! ```

use crate::retry::RetryPolicy;
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use veritas_domain::{EmbeddingModel, LlmProvider, ServiceError};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ollama API provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

async fn status_error(response: reqwest::Response) -> LlmError {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimitExceeded;
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    if status.is_server_error() {
        LlmError::Communication(format!("HTTP {}: {}", status, error_text))
    } else {
        LlmError::InvalidResponse(format!("HTTP {}: {}", status, error_text))
    }
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, prompt: &str, format: Option<&str>) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
        };

        self.retry
            .run("ollama generate", || async {
                let response = self
                    .client
                    .post(&url)
                    .json(&request_body)
                    .send()
                    .await
                    .map_err(LlmError::from_reqwest)?;

                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotAvailable(self.model.clone()));
                }
                if !response.status().is_success() {
                    return Err(status_error(response).await);
                }

                let body: OllamaGenerateResponse = response.json().await.map_err(|e| {
                    LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                debug!("ollama returned {} chars", body.response.len());
                Ok(body.response)
            })
            .await
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        Ok(self.call(prompt, None).await?)
    }

    async fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, ServiceError> {
        // Ollama's JSON mode constrains output to valid JSON, not to a schema
        Ok(self.call(prompt, Some("json")).await?)
    }
}

/// Ollama embeddings endpoint
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create an embedder for `model`, which produces `dimension`-length vectors
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}/api/embeddings", self.endpoint);
        let request_body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let embedding = self
            .retry
            .run("ollama embed", || async {
                let response = self
                    .client
                    .post(&url)
                    .json(&request_body)
                    .send()
                    .await
                    .map_err(LlmError::from_reqwest)?;

                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotAvailable(self.model.clone()));
                }
                if !response.status().is_success() {
                    return Err(status_error(response).await);
                }

                let body: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
                    LlmError::InvalidResponse(format!("Failed to parse embedding: {}", e))
                })?;
                Ok(body.embedding)
            })
            .await?;

        if embedding.len() != self.dimension {
            return Err(ServiceError::InvalidResponse(format!(
                "Expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model, "llama3");
        assert_eq!(provider.retry, RetryPolicy::default());
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral").unwrap();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "mistral");
    }

    #[test]
    fn test_request_serialization() {
        let body = OllamaGenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Nothing listens on port 9
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3")
            .unwrap()
            .with_retry(RetryPolicy::none());

        let result = provider.generate("test").await;
        assert!(matches!(
            result,
            Err(ServiceError::Unavailable(_)) | Err(ServiceError::Timeout(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_embed_integration() {
        let embedder = OllamaEmbedder::new(DEFAULT_ENDPOINT, "nomic-embed-text", 768).unwrap();
        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector.len(), 768);
    }
}
