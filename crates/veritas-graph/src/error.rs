//! Graph error types

use thiserror::Error;
use veritas_domain::ServiceError;

/// Errors raised by graph stores and the builder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Database unreachable
    #[error("Graph connection error: {0}")]
    Connection(String),

    /// Query rejected or failed mid-flight
    #[error("Graph query error: {0}")]
    Query(String),

    /// Relationship endpoint does not exist
    #[error("Missing {label} node '{key}'")]
    MissingNode {
        /// Node label
        label: &'static str,
        /// Node key (URL or name)
        key: String,
    },

    /// Data rejected by the store
    #[error("Malformed graph data: {0}")]
    Malformed(String),

    /// Embedding endpoint failed while ingesting
    #[error("Embedding failed: {0}")]
    Embedding(ServiceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GraphError {
    /// Whether this failure only affects one record
    ///
    /// Record-level failures are skipped during ingestion; anything else
    /// aborts it.
    pub fn is_record_level(&self) -> bool {
        matches!(self, GraphError::MissingNode { .. } | GraphError::Malformed(_))
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        GraphError::Query(e.to_string())
    }
}

impl From<GraphError> for ServiceError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Embedding(inner) => inner,
            GraphError::Connection(msg) | GraphError::Query(msg) => ServiceError::Unavailable(msg),
            other => ServiceError::InvalidResponse(other.to_string()),
        }
    }
}
