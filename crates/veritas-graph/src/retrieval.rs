//! Embedding-ranked subgraph retrieval

use crate::store::GraphStore;
use crate::GraphError;
use serde::{Deserialize, Serialize};
use tracing::debug;
use veritas_llm::cosine_similarity;

/// One article in the generation context, with its neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextArticle {
    /// Article URL
    pub url: String,
    /// Article title
    pub title: String,
    /// Site it was published on
    pub site: Option<String>,
    /// Topics it carries
    pub topics: Vec<String>,
    /// Entities it mentions
    pub entities: Vec<String>,
    /// Leading part of the body
    pub excerpt: String,
    /// Cosine similarity to the claim
    pub score: f32,
}

/// Bounded context handed to generation, best match first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Selected articles
    pub articles: Vec<ContextArticle>,
}

impl RetrievedContext {
    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Number of articles
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Article a citation refers to, by URL or by title
    ///
    /// URLs match ignoring a trailing slash; titles match ignoring case.
    pub fn find(&self, reference: &str) -> Option<&ContextArticle> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let url = reference.trim_end_matches('/');
        self.articles
            .iter()
            .find(|a| a.url.trim_end_matches('/') == url)
            .or_else(|| {
                self.articles
                    .iter()
                    .find(|a| a.title.trim().eq_ignore_ascii_case(reference))
            })
    }
}

/// Rank articles against `query` and expand the best `top_k` one hop
pub async fn retrieve(
    store: &dyn GraphStore,
    query: &[f32],
    top_k: usize,
    excerpt_chars: usize,
) -> Result<RetrievedContext, GraphError> {
    let mut scored: Vec<_> = store
        .articles()
        .await?
        .into_iter()
        .map(|article| (cosine_similarity(query, &article.embedding), article))
        .collect();
    scored.sort_by(|(a, x), (b, y)| b.total_cmp(a).then_with(|| x.url.cmp(&y.url)));
    scored.truncate(top_k);

    let mut articles = Vec::with_capacity(scored.len());
    for (score, article) in scored {
        let neighbourhood = store.neighbours(&article.url).await?;
        articles.push(ContextArticle {
            excerpt: article.body.chars().take(excerpt_chars).collect(),
            url: article.url,
            title: article.title,
            site: neighbourhood.site,
            topics: neighbourhood.topics,
            entities: neighbourhood.entities,
            score,
        });
    }

    debug!("Retrieved {} articles (top_k = {})", articles.len(), top_k);
    Ok(RetrievedContext { articles })
}
