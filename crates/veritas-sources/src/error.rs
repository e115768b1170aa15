//! Error types for source clients

use thiserror::Error;
use veritas_domain::ServiceError;

/// Errors raised by the source clients
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// URL could not be parsed or has no host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials rejected or token unavailable
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response body did not match the expected format
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Http(e.to_string())
    }
}

impl From<SourceError> for ServiceError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Parse(msg) => ServiceError::InvalidResponse(msg),
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}
