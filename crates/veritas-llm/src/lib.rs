//! Veritas LLM Provider Layer
//!
//! Implementations of the generation and embedding capability traits from
//! `veritas-domain`, plus deterministic test doubles.
//!
//! # Providers
//!
//! - `OllamaProvider` / `OllamaEmbedder`: local Ollama API (generation and embeddings)
//! - `GroqProvider`: remote OpenAI-compatible chat completions
//! - `MockProvider`: scripted responses, no network
//! - `MockEmbeddingModel`: feature-hashing embeddings, no network
//! - `ScriptedJudge`: scripted verdicts for any `Judge`
//!
//! # Examples
//!
//! ```
//! use veritas_llm::MockProvider;
//! use veritas_domain::LlmProvider;
//!
//! # async fn demo() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod groq;
pub mod judge;
pub mod mock;
pub mod ollama;
pub mod retry;

use thiserror::Error;
use veritas_domain::ServiceError;

pub use embedding::{cosine_similarity, MockEmbeddingModel};
pub use groq::GroqProvider;
pub use judge::ScriptedJudge;
pub use mock::MockProvider;
pub use ollama::{OllamaEmbedder, OllamaProvider};
pub use retry::RetryPolicy;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider misconfigured (missing key, bad endpoint)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether a retry with backoff is worthwhile
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::Timeout(_) | LlmError::RateLimitExceeded
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else {
            LlmError::Communication(format!("Request failed: {}", e))
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(msg) => ServiceError::Timeout(msg),
            LlmError::InvalidResponse(msg) => ServiceError::InvalidResponse(msg),
            LlmError::ModelNotAvailable(model) => ServiceError::NotFound(model),
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}
