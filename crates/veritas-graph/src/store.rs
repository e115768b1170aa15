//! Graph store abstraction

use crate::config::{GraphBackend, GraphConfig};
use crate::memory::InMemoryGraph;
use crate::model::{ArticleNode, GraphCounts, Neighbourhood, Relation};
use crate::neo4j::Neo4jGraph;
use crate::GraphError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use veritas_domain::Entity;

/// Node/edge CRUD and pattern retrieval over the claim graph
///
/// Upserts are keyed (URL for articles, name for everything else) so
/// repeating an ingest never duplicates nodes. `relate` fails with
/// [`GraphError::MissingNode`] when either endpoint is absent.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Delete every Article, Site, Entity and Topic node; returns how many
    async fn reset(&self) -> Result<usize, GraphError>;

    /// Create or update an article
    async fn upsert_article(&self, article: &ArticleNode) -> Result<(), GraphError>;

    /// Create a site if absent
    async fn upsert_site(&self, domain: &str) -> Result<(), GraphError>;

    /// Create or update an entity with its aliases
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), GraphError>;

    /// Create a topic if absent
    async fn upsert_topic(&self, label: &str) -> Result<(), GraphError>;

    /// Link an article to a Site, Entity or Topic node named `target`
    async fn relate(&self, article_url: &str, relation: Relation, target: &str) -> Result<(), GraphError>;

    /// Node and relationship totals
    async fn counts(&self) -> Result<GraphCounts, GraphError>;

    /// Every article, embeddings included
    async fn articles(&self) -> Result<Vec<ArticleNode>, GraphError>;

    /// Nodes one hop from an article
    async fn neighbours(&self, article_url: &str) -> Result<Neighbourhood, GraphError>;
}

/// Open the store selected by `config`
pub async fn open_store(config: &GraphConfig) -> Result<Arc<dyn GraphStore>, GraphError> {
    config.validate()?;
    match config.backend {
        GraphBackend::Memory => {
            info!("Using in-memory graph");
            Ok(Arc::new(InMemoryGraph::new()))
        }
        GraphBackend::Neo4j => {
            let password = std::env::var(&config.neo4j_password_env).map_err(|_| {
                GraphError::Config(format!(
                    "environment variable {} is not set",
                    config.neo4j_password_env
                ))
            })?;
            let graph = Neo4jGraph::connect(&config.neo4j_uri, &config.neo4j_user, &password).await?;
            info!("Connected to Neo4j at {}", config.neo4j_uri);
            Ok(Arc::new(graph))
        }
    }
}
