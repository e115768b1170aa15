//! Claim graph ingestion

use crate::config::GraphConfig;
use crate::model::{ArticleNode, Relation};
use crate::store::GraphStore;
use crate::GraphError;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use veritas_domain::{AliasGroup, AliasJudge, Claim, EmbeddingModel, EntityRegistry, ServiceError, Source};

/// What one ingestion wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Article nodes written
    pub articles: usize,
    /// Distinct Site nodes written
    pub sites: usize,
    /// Canonical Entity nodes written
    pub entities: usize,
    /// Distinct Topic nodes written
    pub topics: usize,
    /// Relationships written
    pub relationships: usize,
    /// Relationship inserts that failed and were skipped
    pub skipped: usize,
    /// Wall time
    pub elapsed: Duration,
}

/// Loads accepted sources into the graph
///
/// Alias merging runs before any node is written, so two sources naming the
/// same entity differently share one Entity node.
#[derive(Clone)]
pub struct GraphBuilder {
    resolver: Arc<dyn AliasJudge>,
    embedder: Arc<dyn EmbeddingModel>,
    config: GraphConfig,
}

impl GraphBuilder {
    /// Create a builder
    pub fn new(
        resolver: Arc<dyn AliasJudge>,
        embedder: Arc<dyn EmbeddingModel>,
        config: GraphConfig,
    ) -> Result<Self, GraphError> {
        config.validate()?;
        Ok(Self {
            resolver,
            embedder,
            config,
        })
    }

    /// Remove whatever a previous claim left behind
    pub async fn reset(&self, store: &dyn GraphStore) -> Result<usize, GraphError> {
        let removed = store.reset().await?;
        debug!("Graph reset removed {} nodes", removed);
        Ok(removed)
    }

    /// Write `sources` for `claim`
    ///
    /// Embeddings and alias groups are computed before anything is written.
    /// A failing relationship insert is logged and counted in
    /// [`IngestReport::skipped`]; node failures and embedding failures abort.
    pub async fn ingest(
        &self,
        store: &dyn GraphStore,
        claim: &Claim,
        sources: &[Source],
    ) -> Result<IngestReport, GraphError> {
        let started = Instant::now();
        let mut report = IngestReport::default();
        info!("Ingesting {} sources for claim {}", sources.len(), claim.id);
        if sources.is_empty() {
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let registry = self.resolve_entities(sources).await;
        let embeddings = try_join_all(sources.iter().map(|s| self.embed_source(s))).await?;

        let sites: BTreeSet<&str> = sources.iter().map(|s| s.domain.as_str()).collect();
        for site in &sites {
            store.upsert_site(site).await?;
        }
        report.sites = sites.len();

        let topics: BTreeSet<&str> = sources.iter().map(Source::topic_label).collect();
        for topic in &topics {
            store.upsert_topic(topic).await?;
        }
        report.topics = topics.len();

        for entity in registry.entities() {
            store.upsert_entity(entity).await?;
        }
        report.entities = registry.len();

        for (source, embedding) in sources.iter().zip(embeddings) {
            let article = ArticleNode {
                url: source.url.clone(),
                title: source.title.clone(),
                body: source.body.clone(),
                domain: source.domain.clone(),
                topic: source.topic_label().to_string(),
                embedding,
            };
            match store.upsert_article(&article).await {
                Ok(()) => report.articles += 1,
                Err(e) if e.is_record_level() => {
                    warn!("Skipping article {}: {}", source.url, e);
                    continue;
                }
                Err(e) => return Err(e),
            }

            let mentions: BTreeSet<&str> = source
                .entities
                .iter()
                .filter_map(|surface| registry.resolve(surface))
                .collect();
            let mut edges = vec![
                (Relation::PublishedOn, source.domain.as_str()),
                (Relation::HasTopic, source.topic_label()),
            ];
            edges.extend(mentions.into_iter().map(|e| (Relation::Mentions, e)));

            for (relation, target) in edges {
                match store.relate(&source.url, relation, target).await {
                    Ok(()) => report.relationships += 1,
                    Err(e) if e.is_record_level() => {
                        warn!("Skipping {} -[{}]-> {}: {}", source.url, relation, target, e);
                        report.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Ingested {} articles, {} sites, {} entities, {} topics, {} relationships ({} skipped) in {:?}",
            report.articles,
            report.sites,
            report.entities,
            report.topics,
            report.relationships,
            report.skipped,
            report.elapsed
        );
        Ok(report)
    }

    async fn resolve_entities(&self, sources: &[Source]) -> EntityRegistry {
        let names: Vec<String> = sources
            .iter()
            .flat_map(|s| s.entities.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut registry = EntityRegistry::new();
        if names.is_empty() {
            return registry;
        }

        match tokio::time::timeout(self.config.resolve_timeout(), self.resolver.judge(names.as_slice())).await {
            Ok(Ok(groups)) => registry.merge_all(&groups),
            Ok(Err(e)) => warn!("Alias resolution failed: {}", e),
            Err(_) => warn!("Alias resolution timed out"),
        }
        // Names the resolver left out become their own entity
        for name in &names {
            if registry.resolve(name).is_none() {
                registry.merge(&AliasGroup::identity(name));
            }
        }
        debug!("{} entity names resolved to {} entities", names.len(), registry.len());
        registry
    }

    async fn embed_source(&self, source: &Source) -> Result<Vec<f32>, GraphError> {
        let text: String = format!("{} {} {}", source.topic_label(), source.title, source.body)
            .chars()
            .take(self.config.embed_chars)
            .collect();
        match tokio::time::timeout(self.config.embed_timeout(), self.embedder.embed(&text)).await {
            Ok(result) => result.map_err(GraphError::Embedding),
            Err(_) => Err(GraphError::Embedding(ServiceError::Timeout(format!(
                "embedding {}",
                source.url
            )))),
        }
    }
}
