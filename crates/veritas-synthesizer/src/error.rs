//! Synthesizer error types

use thiserror::Error;
use veritas_domain::ServiceError;
use veritas_graph::GraphError;

/// Errors that fail answer generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesizerError {
    /// Claim could not be embedded
    #[error("Embedding service failed: {0}")]
    EmbeddingUnavailable(ServiceError),

    /// Generation endpoint failed
    #[error("Generation service failed: {0}")]
    GenerationUnavailable(ServiceError),

    /// Model kept citing articles that were not in its context
    #[error("Answer cites sources outside the context: {}", .cited.join(", "))]
    GroundingViolation {
        /// References that matched no context article
        cited: Vec<String>,
    },

    /// Model kept answering in an unusable format
    #[error("Invalid generation response: {0}")]
    InvalidResponse(String),

    /// Graph retrieval failed
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SynthesizerError> for ServiceError {
    fn from(e: SynthesizerError) -> Self {
        match e {
            SynthesizerError::EmbeddingUnavailable(inner)
            | SynthesizerError::GenerationUnavailable(inner) => inner,
            SynthesizerError::Graph(inner) => inner.into(),
            other => ServiceError::InvalidResponse(other.to_string()),
        }
    }
}
