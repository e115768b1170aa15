//! Process-local graph store

use crate::model::{ArticleNode, GraphCounts, NodeLabel, Neighbourhood, Relation};
use crate::store::GraphStore;
use crate::GraphError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use veritas_domain::Entity;

#[derive(Debug, Default)]
struct Graph {
    articles: BTreeMap<String, ArticleNode>,
    sites: BTreeSet<String>,
    entities: BTreeMap<String, Entity>,
    topics: BTreeSet<String>,
    edges: BTreeSet<(String, Relation, String)>,
    // relationship targets that fail as malformed, for fault injection
    rejected: HashSet<String>,
}

impl Graph {
    fn has_node(&self, label: NodeLabel, key: &str) -> bool {
        match label {
            NodeLabel::Article => self.articles.contains_key(key),
            NodeLabel::Site => self.sites.contains(key),
            NodeLabel::Entity => self.entities.contains_key(key),
            NodeLabel::Topic => self.topics.contains(key),
        }
    }
}

/// Graph held in memory; clones share the same data
///
/// # Examples
///
/// ```
/// use veritas_graph::{GraphStore, InMemoryGraph, Relation};
///
/// # async fn demo() -> Result<(), veritas_graph::GraphError> {
/// let graph = InMemoryGraph::new();
/// graph.upsert_site("news.example").await?;
/// assert!(graph.relate("https://news.example/a", Relation::PublishedOn, "news.example").await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    inner: Arc<Mutex<Graph>>,
}

impl InMemoryGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every relationship pointing at `target` fail as malformed
    pub fn reject_target(&self, target: impl Into<String>) {
        self.graph().rejected.insert(target.into());
    }

    /// Entity by canonical name
    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.graph().entities.get(name).cloned()
    }

    /// Whether a relationship exists
    pub fn has_edge(&self, article_url: &str, relation: Relation, target: &str) -> bool {
        self.graph()
            .edges
            .contains(&(article_url.to_string(), relation, target.to_string()))
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn reset(&self) -> Result<usize, GraphError> {
        let mut graph = self.graph();
        let removed = graph.articles.len() + graph.sites.len() + graph.entities.len() + graph.topics.len();
        graph.articles.clear();
        graph.sites.clear();
        graph.entities.clear();
        graph.topics.clear();
        graph.edges.clear();
        Ok(removed)
    }

    async fn upsert_article(&self, article: &ArticleNode) -> Result<(), GraphError> {
        if article.url.trim().is_empty() {
            return Err(GraphError::Malformed("article without URL".to_string()));
        }
        self.graph().articles.insert(article.url.clone(), article.clone());
        Ok(())
    }

    async fn upsert_site(&self, domain: &str) -> Result<(), GraphError> {
        self.graph().sites.insert(domain.to_string());
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), GraphError> {
        let mut graph = self.graph();
        graph
            .entities
            .entry(entity.canonical.clone())
            .and_modify(|e| e.aliases.extend(entity.aliases.iter().cloned()))
            .or_insert_with(|| entity.clone());
        Ok(())
    }

    async fn upsert_topic(&self, label: &str) -> Result<(), GraphError> {
        self.graph().topics.insert(label.to_string());
        Ok(())
    }

    async fn relate(&self, article_url: &str, relation: Relation, target: &str) -> Result<(), GraphError> {
        let mut graph = self.graph();
        if graph.rejected.contains(target) {
            return Err(GraphError::Malformed(format!(
                "{} -[{}]-> {} rejected",
                article_url, relation, target
            )));
        }
        if !graph.has_node(NodeLabel::Article, article_url) {
            return Err(GraphError::MissingNode {
                label: NodeLabel::Article.as_str(),
                key: article_url.to_string(),
            });
        }
        if !graph.has_node(relation.target(), target) {
            return Err(GraphError::MissingNode {
                label: relation.target().as_str(),
                key: target.to_string(),
            });
        }
        graph
            .edges
            .insert((article_url.to_string(), relation, target.to_string()));
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let graph = self.graph();
        Ok(GraphCounts {
            articles: graph.articles.len(),
            sites: graph.sites.len(),
            entities: graph.entities.len(),
            topics: graph.topics.len(),
            relationships: graph.edges.len(),
        })
    }

    async fn articles(&self) -> Result<Vec<ArticleNode>, GraphError> {
        Ok(self.graph().articles.values().cloned().collect())
    }

    async fn neighbours(&self, article_url: &str) -> Result<Neighbourhood, GraphError> {
        let graph = self.graph();
        let mut neighbourhood = Neighbourhood::default();
        for (_, relation, target) in graph.edges.iter().filter(|(url, _, _)| url == article_url) {
            match relation {
                Relation::PublishedOn => neighbourhood.site = Some(target.clone()),
                Relation::Mentions => neighbourhood.entities.push(target.clone()),
                Relation::HasTopic => neighbourhood.topics.push(target.clone()),
            }
        }
        Ok(neighbourhood)
    }
}
