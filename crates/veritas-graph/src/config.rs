//! Graph configuration

use crate::GraphError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which store backs the claim graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    /// Process-local graph
    #[default]
    Memory,
    /// Neo4j over Bolt
    Neo4j,
}

/// Configuration for graph storage and ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Store implementation
    pub backend: GraphBackend,

    /// Bolt URI, used by the Neo4j backend
    pub neo4j_uri: String,

    /// Neo4j user
    pub neo4j_user: String,

    /// Environment variable holding the Neo4j password
    pub neo4j_password_env: String,

    /// Characters of topic + title + body embedded per article
    pub embed_chars: usize,

    /// Timeout for one embedding call
    pub embed_timeout_ms: u64,

    /// Timeout for the alias resolution call
    pub resolve_timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::Memory,
            neo4j_uri: "127.0.0.1:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password_env: "NEO4J_PASSWORD".to_string(),
            embed_chars: 2_000,
            embed_timeout_ms: 30_000,
            resolve_timeout_ms: 60_000,
        }
    }
}

impl GraphConfig {
    /// Reject nonsensical settings
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.embed_chars == 0 {
            return Err(GraphError::Config("embed_chars must be positive".to_string()));
        }
        if self.backend == GraphBackend::Neo4j && self.neo4j_uri.trim().is_empty() {
            return Err(GraphError::Config(
                "neo4j_uri is required for the neo4j backend".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub(crate) fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        let config = GraphConfig::default();
        assert_eq!(config.backend, GraphBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_from_toml() {
        let config: GraphConfig = toml::from_str(
            r#"
            backend = "neo4j"
            neo4j_uri = "db:7687"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, GraphBackend::Neo4j);
        assert_eq!(config.neo4j_user, "neo4j");
    }

    #[test]
    fn test_validate() {
        let config = GraphConfig {
            embed_chars: 0,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GraphConfig {
            backend: GraphBackend::Neo4j,
            neo4j_uri: " ".to_string(),
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
