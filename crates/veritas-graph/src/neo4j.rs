//! Neo4j graph store

use crate::model::{ArticleNode, GraphCounts, NodeLabel, Neighbourhood, Relation};
use crate::store::GraphStore;
use crate::GraphError;
use async_trait::async_trait;
use neo4rs::{query, Graph};
use tracing::debug;
use veritas_domain::Entity;

/// Claim graph stored in Neo4j
///
/// Articles are keyed by `url`; Site, Entity and Topic nodes by `name`.
#[derive(Clone)]
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    /// Connect over Bolt
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        Ok(Self { graph })
    }

    /// Wrap an existing connection
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    async fn upsert_named(&self, label: NodeLabel, name: &str) -> Result<(), GraphError> {
        if name.trim().is_empty() {
            return Err(GraphError::Malformed(format!("{} without a name", label)));
        }
        let q = query(&format!("MERGE (n:{} {{name: $name}})", label)).param("name", name);
        self.graph.run(q).await?;
        Ok(())
    }

    async fn count(&self, pattern: &str) -> Result<usize, GraphError> {
        let q = query(&format!("MATCH {} RETURN count(*) AS total", pattern));
        let total = match self.graph.execute(q).await?.next().await? {
            Some(row) => row.get::<i64>("total").unwrap_or(0),
            None => 0,
        };
        Ok(usize::try_from(total).unwrap_or(0))
    }
}

fn embedding_to_f64(embedding: &[f32]) -> Vec<f64> {
    embedding.iter().map(|&v| f64::from(v)).collect()
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn reset(&self) -> Result<usize, GraphError> {
        let q = query(
            "MATCH (n)
             WHERE n:Article OR n:Site OR n:Entity OR n:Topic
             DETACH DELETE n
             RETURN count(n) AS deleted",
        );
        let deleted = match self.graph.execute(q).await?.next().await? {
            Some(row) => row.get::<i64>("deleted").unwrap_or(0),
            None => 0,
        };
        debug!("Deleted {} nodes", deleted);
        Ok(usize::try_from(deleted).unwrap_or(0))
    }

    async fn upsert_article(&self, article: &ArticleNode) -> Result<(), GraphError> {
        if article.url.trim().is_empty() {
            return Err(GraphError::Malformed("article without URL".to_string()));
        }
        let q = query(
            "MERGE (a:Article {url: $url})
             SET a.title = $title,
                 a.body = $body,
                 a.domain = $domain,
                 a.topic = $topic,
                 a.embedding = $embedding",
        )
        .param("url", article.url.as_str())
        .param("title", article.title.as_str())
        .param("body", article.body.as_str())
        .param("domain", article.domain.as_str())
        .param("topic", article.topic.as_str())
        .param("embedding", embedding_to_f64(&article.embedding));
        self.graph.run(q).await?;
        Ok(())
    }

    async fn upsert_site(&self, domain: &str) -> Result<(), GraphError> {
        self.upsert_named(NodeLabel::Site, domain).await
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), GraphError> {
        if entity.canonical.trim().is_empty() {
            return Err(GraphError::Malformed("entity without a name".to_string()));
        }
        let aliases: Vec<String> = entity.aliases.iter().cloned().collect();
        let q = query(
            "MERGE (e:Entity {name: $name})
             SET e.aliases = CASE
                 WHEN e.aliases IS NULL THEN $aliases
                 ELSE e.aliases + [x IN $aliases WHERE NOT x IN e.aliases]
             END",
        )
        .param("name", entity.canonical.as_str())
        .param("aliases", aliases);
        self.graph.run(q).await?;
        Ok(())
    }

    async fn upsert_topic(&self, label: &str) -> Result<(), GraphError> {
        self.upsert_named(NodeLabel::Topic, label).await
    }

    async fn relate(&self, article_url: &str, relation: Relation, target: &str) -> Result<(), GraphError> {
        let q = query(&format!(
            "MATCH (a:Article {{url: $url}})
             MATCH (t:{} {{name: $target}})
             MERGE (a)-[:{}]->(t)
             RETURN count(*) AS linked",
            relation.target(),
            relation
        ))
        .param("url", article_url)
        .param("target", target);

        let linked = match self.graph.execute(q).await?.next().await? {
            Some(row) => row.get::<i64>("linked").unwrap_or(0),
            None => 0,
        };
        if linked == 0 {
            return Err(GraphError::MissingNode {
                label: relation.target().as_str(),
                key: target.to_string(),
            });
        }
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        Ok(GraphCounts {
            articles: self.count("(n:Article)").await?,
            sites: self.count("(n:Site)").await?,
            entities: self.count("(n:Entity)").await?,
            topics: self.count("(n:Topic)").await?,
            relationships: self.count("(:Article)-[r]->()").await?,
        })
    }

    async fn articles(&self) -> Result<Vec<ArticleNode>, GraphError> {
        let q = query(
            "MATCH (a:Article)
             RETURN a.url AS url, a.title AS title, a.body AS body,
                    a.domain AS domain, a.topic AS topic, a.embedding AS embedding",
        );
        let mut stream = self.graph.execute(q).await?;
        let mut articles = Vec::new();
        while let Some(row) = stream.next().await? {
            let embedding: Vec<f64> = row.get("embedding").unwrap_or_default();
            articles.push(ArticleNode {
                url: row.get("url").unwrap_or_default(),
                title: row.get("title").unwrap_or_default(),
                body: row.get("body").unwrap_or_default(),
                domain: row.get("domain").unwrap_or_default(),
                topic: row.get("topic").unwrap_or_default(),
                embedding: embedding.into_iter().map(|v| v as f32).collect(),
            });
        }
        Ok(articles)
    }

    async fn neighbours(&self, article_url: &str) -> Result<Neighbourhood, GraphError> {
        let q = query(
            "MATCH (a:Article {url: $url})
             OPTIONAL MATCH (a)-[:PUBLISHED_ON]->(s:Site)
             OPTIONAL MATCH (a)-[:MENTIONS]->(e:Entity)
             OPTIONAL MATCH (a)-[:HAS_TOPIC]->(t:Topic)
             RETURN collect(DISTINCT s.name) AS sites,
                    collect(DISTINCT e.name) AS entities,
                    collect(DISTINCT t.name) AS topics",
        )
        .param("url", article_url);

        let Some(row) = self.graph.execute(q).await?.next().await? else {
            return Ok(Neighbourhood::default());
        };
        let sites: Vec<String> = row.get("sites").unwrap_or_default();
        let mut entities: Vec<String> = row.get("entities").unwrap_or_default();
        let mut topics: Vec<String> = row.get("topics").unwrap_or_default();
        entities.sort();
        topics.sort();
        Ok(Neighbourhood {
            site: sites.into_iter().next(),
            entities,
            topics,
        })
    }
}
