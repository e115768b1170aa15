//! In-memory source clients
//!
//! Scripted ratings, robots decisions, pages and search results, used by
//! tests across the workspace.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use veritas_domain::{
    CandidateStream, ContentFetcher, CrawlPolicy, ExtractedPage, ExtractionFailure, Rating,
    RatingService, SearchProvider, ServiceError,
};

use crate::domain_of;

/// Ratings from a fixed table; unknown domains are unrated
#[derive(Debug, Clone, Default)]
pub struct StaticRatings {
    ratings: HashMap<String, Rating>,
    unavailable: bool,
    lookups: Arc<AtomicUsize>,
}

impl StaticRatings {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate `domain`
    pub fn with(mut self, domain: impl Into<String>, rank: impl Into<String>, score: f64) -> Self {
        self.ratings.insert(
            domain.into(),
            Rating::Rated {
                rank: rank.into(),
                score,
            },
        );
        self
    }

    /// Every lookup fails as if the service were down
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of `rate` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingService for StaticRatings {
    async fn rate(&self, domain: &str) -> Result<Rating, ServiceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ServiceError::Unavailable("rating service down".to_string()));
        }
        Ok(self.ratings.get(domain).cloned().unwrap_or(Rating::Unrated))
    }
}

/// Crawl policy denying a fixed set of URLs
#[derive(Debug, Clone, Default)]
pub struct StaticCrawlPolicy {
    denied: HashSet<String>,
}

impl StaticCrawlPolicy {
    /// Allow everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Deny `url`
    pub fn deny(mut self, url: impl Into<String>) -> Self {
        self.denied.insert(url.into());
        self
    }
}

#[async_trait]
impl CrawlPolicy for StaticCrawlPolicy {
    async fn is_allowed(&self, url: &str) -> Result<bool, ServiceError> {
        Ok(!self.denied.contains(url))
    }
}

/// Pages served from memory; unknown URLs are HTTP 404
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, Result<ExtractedPage, ExtractionFailure>>,
    fetches: Arc<AtomicUsize>,
}

impl StaticPages {
    /// No pages
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a page with the given title and body
    pub fn page(mut self, url: &str, title: &str, body: &str) -> Self {
        let domain = domain_of(url).unwrap_or_else(|_| url.to_string());
        self.pages.insert(
            url.to_string(),
            Ok(ExtractedPage {
                url: url.to_string(),
                domain,
                title: title.to_string(),
                body: body.to_string(),
            }),
        );
        self
    }

    /// Fail fetches of `url`
    pub fn failing(mut self, url: &str, failure: ExtractionFailure) -> Self {
        self.pages.insert(url.to_string(), Err(failure));
        self
    }

    /// Number of fetches so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for StaticPages {
    async fn fetch(&self, url: &str) -> Result<ExtractedPage, ExtractionFailure> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(Err(ExtractionFailure::Http { status: 404 }))
    }
}

/// Search returning the same URLs for every query
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    urls: Vec<String>,
    unavailable: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticSearch {
    /// Always return `urls`
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every search fails as if the provider were down
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<CandidateStream, ServiceError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
        if self.unavailable {
            return Err(ServiceError::Unavailable("search provider down".to_string()));
        }
        Ok(CandidateStream::new(
            self.urls.iter().take(max_results).cloned().collect(),
        ))
    }
}
