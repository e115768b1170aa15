//! Veritas Graph
//!
//! The claim-scoped knowledge graph: Article, Site, Entity and Topic nodes
//! linked by PUBLISHED_ON, MENTIONS and HAS_TOPIC.
//!
//! # Architecture
//!
//! ```text
//! GraphLock ──acquire──▶ ActiveClaim ──store()──▶ dyn GraphStore
//!                              │                   ├─ InMemoryGraph
//!                              │                   └─ Neo4jGraph
//!                              ├─ GraphBuilder::reset / ingest
//!                              └─ retrieve → RetrievedContext → render_dot
//! ```
//!
//! The graph holds one claim at a time. Every run resets it before
//! ingesting, so a run that failed half-way is cleaned up by the next one.
//!
//! # Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use veritas_graph::{GraphLock, GraphStore, InMemoryGraph};
//! use veritas_domain::ClaimId;
//!
//! # async fn demo() -> Result<(), veritas_graph::GraphError> {
//! let lock = GraphLock::new(Arc::new(InMemoryGraph::new()));
//! let active = lock.acquire(ClaimId::new()).await;
//! active.store().reset().await?;
//! assert!(active.store().counts().await?.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod config;
pub mod diagram;
mod error;
mod lock;
mod memory;
mod model;
mod neo4j;
mod retrieval;
mod store;

pub use builder::{GraphBuilder, IngestReport};
pub use config::{GraphBackend, GraphConfig};
pub use diagram::render_dot;
pub use error::GraphError;
pub use lock::{ActiveClaim, GraphLock};
pub use memory::InMemoryGraph;
pub use model::{ArticleNode, GraphCounts, Neighbourhood, NodeLabel, Relation};
pub use neo4j::Neo4jGraph;
pub use retrieval::{retrieve, ContextArticle, RetrievedContext};
pub use store::{open_store, GraphStore};
