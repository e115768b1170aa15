//! Node and relationship types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node labels held by the claim graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    /// One accepted source
    Article,
    /// Publishing domain
    Site,
    /// Canonical named entity
    Entity,
    /// Topic label
    Topic,
}

impl NodeLabel {
    /// Cypher label
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Article => "Article",
            NodeLabel::Site => "Site",
            NodeLabel::Entity => "Entity",
            NodeLabel::Topic => "Topic",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types; every relationship starts at an Article
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Article → Site
    PublishedOn,
    /// Article → Entity
    Mentions,
    /// Article → Topic
    HasTopic,
}

impl Relation {
    /// Cypher relationship type
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::PublishedOn => "PUBLISHED_ON",
            Relation::Mentions => "MENTIONS",
            Relation::HasTopic => "HAS_TOPIC",
        }
    }

    /// Label of the node the relationship points to
    pub fn target(&self) -> NodeLabel {
        match self {
            Relation::PublishedOn => NodeLabel::Site,
            Relation::Mentions => NodeLabel::Entity,
            Relation::HasTopic => NodeLabel::Topic,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleNode {
    /// Source URL, the node key
    pub url: String,
    /// Extracted title
    pub title: String,
    /// Extracted body
    pub body: String,
    /// Publishing domain
    pub domain: String,
    /// Topic label
    pub topic: String,
    /// Embedding of topic, title and body
    pub embedding: Vec<f32>,
}

/// Node and relationship totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    /// Article nodes
    pub articles: usize,
    /// Site nodes
    pub sites: usize,
    /// Entity nodes
    pub entities: usize,
    /// Topic nodes
    pub topics: usize,
    /// Relationships of any type
    pub relationships: usize,
}

impl GraphCounts {
    /// Total nodes across all labels
    pub fn nodes(&self) -> usize {
        self.articles + self.sites + self.entities + self.topics
    }

    /// Whether the graph holds nothing
    pub fn is_empty(&self) -> bool {
        self.nodes() == 0 && self.relationships == 0
    }
}

/// Nodes directly attached to one article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbourhood {
    /// Site it was published on
    pub site: Option<String>,
    /// Entities it mentions, sorted
    pub entities: Vec<String>,
    /// Topics it carries, sorted
    pub topics: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_targets() {
        assert_eq!(Relation::PublishedOn.target(), NodeLabel::Site);
        assert_eq!(Relation::Mentions.target(), NodeLabel::Entity);
        assert_eq!(Relation::HasTopic.target(), NodeLabel::Topic);
        assert_eq!(Relation::HasTopic.to_string(), "HAS_TOPIC");
    }

    #[test]
    fn test_counts() {
        let counts = GraphCounts {
            articles: 2,
            sites: 1,
            entities: 3,
            topics: 1,
            relationships: 7,
        };
        assert_eq!(counts.nodes(), 7);
        assert!(!counts.is_empty());
        assert!(GraphCounts::default().is_empty());
    }
}
