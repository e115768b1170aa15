//! Trait definitions for external interactions
//!
//! These traits define the boundaries between pipeline logic and the
//! network. Implementations live in other crates; test doubles live in
//! `veritas-llm` and `veritas-graph`.

use crate::answer::Answer;
use crate::claim::{Claim, ClaimId};
use crate::entity::AliasGroup;
use crate::rating::Rating;
use crate::source::{ExtractedPage, ExtractionFailure, Source};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Failure of an external collaborator, shared by every capability trait
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Service unreachable or returned a server error
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Service answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Whether retrying the same call later might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Text generation backend
///
/// Implemented by the infrastructure layer (veritas-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text completion
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    /// Generate output that should conform to a JSON schema
    async fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, ServiceError>;
}

/// Text embedding backend
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Vector length produced by `embed`
    fn dimension(&self) -> usize;
}

/// An LLM-backed decision over some input
///
/// Correlation (is this article about the claim?) and alias merging (which
/// names refer to the same thing?) are both judges, so pipeline logic can be
/// exercised with scripted verdicts.
#[async_trait]
pub trait Judge<I: ?Sized + Sync>: Send + Sync {
    /// Decision type
    type Verdict: Send;

    /// Decide on `input`
    async fn judge(&self, input: &I) -> Result<Self::Verdict, ServiceError>;
}

/// Input to the correlation judge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceQuery {
    /// Claim statement
    pub claim: String,
    /// Article title
    pub title: String,
    /// Article body
    pub body: String,
}

/// Output of the correlation judge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    /// Article discusses the claim
    Relevant,
    /// Article is off-topic
    Irrelevant,
}

/// Judge deciding whether an article is about a claim
pub trait CorrelationJudge: Judge<RelevanceQuery, Verdict = Relevance> {}
impl<T: Judge<RelevanceQuery, Verdict = Relevance>> CorrelationJudge for T {}

/// Judge grouping surface forms into canonical entities
pub trait AliasJudge: Judge<[String], Verdict = Vec<AliasGroup>> {}
impl<T: Judge<[String], Verdict = Vec<AliasGroup>>> AliasJudge for T {}

/// Domain reliability rating service
#[async_trait]
pub trait RatingService: Send + Sync {
    /// Rate a bare domain; unknown domains are `Rating::Unrated`
    async fn rate(&self, domain: &str) -> Result<Rating, ServiceError>;
}

/// Crawl permission check
#[async_trait]
pub trait CrawlPolicy: Send + Sync {
    /// Whether our crawler may fetch `url`
    async fn is_allowed(&self, url: &str) -> Result<bool, ServiceError>;

    /// A view of this policy for one claim, free to cache answers until it
    /// is dropped
    ///
    /// `None` means the policy keeps no state and is used directly.
    fn session(&self) -> Option<Arc<dyn CrawlPolicy>> {
        None
    }
}

/// Page download and main-content extraction
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url` and extract its article
    async fn fetch(&self, url: &str) -> Result<ExtractedPage, ExtractionFailure>;
}

/// Candidate URLs from a search, consumable exactly once
#[derive(Debug)]
pub struct CandidateStream {
    urls: std::vec::IntoIter<String>,
}

impl CandidateStream {
    /// Wrap a list of URLs
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls: urls.into_iter(),
        }
    }

    /// Stream with no candidates
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for CandidateStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.urls.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.urls.size_hint()
    }
}

/// Web search for candidate articles
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for up to `max_results` URLs matching `query`
    async fn search(&self, query: &str, max_results: usize) -> Result<CandidateStream, ServiceError>;
}

/// A verified claim as kept in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Claim id
    pub claim_id: ClaimId,
    /// Claim text as submitted
    pub claim: String,
    /// Search title derived from the claim
    #[serde(default)]
    pub title: String,
    /// Sources the answer was built from
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Answer delivered
    pub answer: Answer,
}

impl HistoryEntry {
    /// Entry for a finished claim
    pub fn from_claim(claim: &Claim, answer: Answer) -> Self {
        Self {
            claim_id: claim.id,
            claim: claim.text.clone(),
            title: claim.title.clone(),
            sources: claim.sources().to_vec(),
            answer,
        }
    }
}

/// Trait for persisting verified claims
///
/// Implemented by the infrastructure layer (veritas-store)
pub trait HistoryStore {
    /// Error type for store operations
    type Error;

    /// Record a finished verification
    fn record(&mut self, entry: &HistoryEntry) -> Result<(), Self::Error>;

    /// Most recent entries, newest first
    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, Self::Error>;

    /// Remove every entry, returning how many were deleted
    fn clear(&mut self) -> Result<usize, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysRelevant;

    #[async_trait]
    impl Judge<RelevanceQuery> for AlwaysRelevant {
        type Verdict = Relevance;

        async fn judge(&self, _input: &RelevanceQuery) -> Result<Relevance, ServiceError> {
            Ok(Relevance::Relevant)
        }
    }

    fn assert_correlation_judge<J: CorrelationJudge>(_j: &J) {}

    #[tokio::test]
    async fn test_judge_blanket_impl() {
        let judge = AlwaysRelevant;
        assert_correlation_judge(&judge);

        let query = RelevanceQuery {
            claim: "c".into(),
            title: "t".into(),
            body: "b".into(),
        };
        assert_eq!(judge.judge(&query).await.unwrap(), Relevance::Relevant);
    }

    #[test]
    fn test_candidate_stream_consumed_once() {
        let mut stream = CandidateStream::new(vec!["a".into(), "b".into()]);
        assert_eq!(stream.size_hint(), (2, Some(2)));
        let all: Vec<String> = stream.by_ref().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_retryable() {
        assert!(ServiceError::Timeout("x".into()).is_retryable());
        assert!(ServiceError::Unavailable("x".into()).is_retryable());
        assert!(!ServiceError::InvalidResponse("x".into()).is_retryable());
        assert!(!ServiceError::NotFound("x".into()).is_retryable());
    }
}
