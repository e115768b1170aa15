//! The four-stage source funnel

use crate::config::FilterConfig;
use crate::error::GatekeeperError;
use crate::rejection::{FunnelReport, Rejection, RejectionReason, Stage};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use veritas_domain::{
    ContentFetcher, CorrelationJudge, CrawlPolicy, ExtractionFailure, Rating, RatingService,
    Relevance, RelevanceQuery, ServiceError, Source, SourceKey,
};
use veritas_sources::domain_of;

/// Accepted sources plus the funnel report
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Sources that passed every stage, unique by domain and URL
    pub sources: Vec<Source>,
    /// Per-stage counts and rejections
    pub report: FunnelReport,
}

struct Candidate {
    url: String,
    domain: String,
    rating: Rating,
}

/// The Gatekeeper filters candidate URLs down to accepted sources
pub struct Gatekeeper {
    config: FilterConfig,
    rating: Arc<dyn RatingService>,
    crawl: Arc<dyn CrawlPolicy>,
    fetcher: Arc<dyn ContentFetcher>,
    judge: Arc<dyn CorrelationJudge>,
    permits: Arc<Semaphore>,
}

impl Gatekeeper {
    /// Create a Gatekeeper from its four collaborators
    pub fn new(
        config: FilterConfig,
        rating: Arc<dyn RatingService>,
        crawl: Arc<dyn CrawlPolicy>,
        fetcher: Arc<dyn ContentFetcher>,
        judge: Arc<dyn CorrelationJudge>,
    ) -> Result<Self, GatekeeperError> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        Ok(Self {
            config,
            rating,
            crawl,
            fetcher,
            judge,
            permits,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// The limiter every outbound funnel call holds a permit from
    pub fn limiter(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    /// Run every candidate through rating, crawl policy, extraction and
    /// correlation against `claim`
    ///
    /// Zero survivors is a normal outcome. Only an unreachable rating service
    /// or cancellation returns an error; in-flight calls are abandoned then.
    pub async fn filter_sources<I>(
        &self,
        claim: &str,
        candidates: I,
        cancel: &CancellationToken,
    ) -> Result<FilterOutcome, GatekeeperError>
    where
        I: IntoIterator<Item = String>,
    {
        let started = Instant::now();
        let mut report = FunnelReport::default();

        let unique = self.intake(candidates, &mut report);
        report.after_intake = unique.len();
        info!("Filtering {} candidates ({} unique)", report.candidates, unique.len());

        let rated = self.rating_stage(unique, &mut report, cancel).await?;
        report.after_rating = rated.len();
        info!("{} candidates passed rating", rated.len());

        // Crawl answers are cached for this run only
        let session = self.crawl.session();
        let crawl: &dyn CrawlPolicy = session.as_deref().unwrap_or(self.crawl.as_ref());
        let per_candidate = rated
            .into_iter()
            .map(|candidate| self.process_candidate(claim, candidate, crawl));
        let mut stream = stream::iter(per_candidate).buffer_unordered(self.config.max_concurrency);

        let mut sources = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Source filtering cancelled with requests in flight");
                    return Err(GatekeeperError::Cancelled);
                }
                next = stream.next() => match next {
                    Some(Ok(source)) => sources.push(source),
                    Some(Err(rejection)) => {
                        debug!("Dropped {} at {:?}: {}", rejection.url, rejection.stage, rejection.reason);
                        report.rejections.push(rejection);
                    }
                    None => break,
                },
            }
        }

        report.after_crawl_policy = report.after_rating - report.rejected_at(Stage::CrawlPolicy);
        report.after_extraction = report.after_crawl_policy - report.rejected_at(Stage::Extraction);
        report.after_correlation = sources.len();
        report.elapsed = started.elapsed();

        info!(
            "Funnel {:?} -> {} accepted in {:?}",
            report.counts(),
            sources.len(),
            report.elapsed
        );
        Ok(FilterOutcome { sources, report })
    }

    fn intake<I>(&self, candidates: I, report: &mut FunnelReport) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for url in candidates {
            report.candidates += 1;
            let url = url.trim().to_string();
            let domain = match domain_of(&url) {
                Ok(domain) => domain,
                Err(e) => {
                    report.rejections.push(Rejection {
                        url,
                        stage: Stage::Intake,
                        reason: RejectionReason::InvalidUrl(e.to_string()),
                    });
                    continue;
                }
            };
            let key = SourceKey {
                domain: domain.clone(),
                url: url.clone(),
            };
            if !seen.insert(key) {
                report.rejections.push(Rejection {
                    url,
                    stage: Stage::Intake,
                    reason: RejectionReason::Duplicate,
                });
                continue;
            }
            unique.push((url, domain));
        }
        unique
    }

    async fn rating_stage(
        &self,
        unique: Vec<(String, String)>,
        report: &mut FunnelReport,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candidate>, GatekeeperError> {
        if !self.config.rating_enabled {
            debug!("Rating disabled; skipping rating stage");
            return Ok(unique
                .into_iter()
                .map(|(url, domain)| Candidate {
                    url,
                    domain,
                    rating: Rating::Unrated,
                })
                .collect());
        }

        // One lookup per domain, however many URLs share it
        let domains: Vec<String> = unique
            .iter()
            .map(|(_, domain)| domain.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let lookups = domains.into_iter().map(|domain| async move {
            let result = self
                .bounded(self.config.rating_timeout(), self.rating.rate(&domain))
                .await;
            (domain, result)
        });
        let mut stream = stream::iter(lookups).buffer_unordered(self.config.max_concurrency);

        let mut ratings = HashMap::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatekeeperError::Cancelled),
                next = stream.next() => match next {
                    Some((domain, Ok(rating))) => {
                        ratings.insert(domain, rating);
                    }
                    Some((domain, Err(e))) => {
                        warn!("Rating lookup for {} failed: {}", domain, e);
                        return Err(GatekeeperError::RatingService(e));
                    }
                    None => break,
                },
            }
        }

        let mut passed = Vec::new();
        for (url, domain) in unique {
            let rating = ratings.get(&domain).cloned().unwrap_or(Rating::Unrated);
            if rating.passes(&self.config.accepted_ranks, self.config.min_score) {
                passed.push(Candidate {
                    url,
                    domain,
                    rating,
                });
                continue;
            }
            let reason = match rating {
                Rating::Rated { rank, score } => RejectionReason::BelowThreshold { rank, score },
                Rating::Unrated => RejectionReason::Unrated,
            };
            info!("Excluded {}: {}", domain, reason);
            report.rejections.push(Rejection {
                url,
                stage: Stage::Rating,
                reason,
            });
        }
        Ok(passed)
    }

    async fn process_candidate(
        &self,
        claim: &str,
        candidate: Candidate,
        crawl: &dyn CrawlPolicy,
    ) -> Result<Source, Rejection> {
        let reject = |stage, reason| Rejection {
            url: candidate.url.clone(),
            stage,
            reason,
        };

        // A policy that cannot be read imposes no restriction
        match self
            .bounded(self.config.crawl_timeout(), crawl.is_allowed(&candidate.url))
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(reject(Stage::CrawlPolicy, RejectionReason::CrawlDisallowed)),
            Err(e) => debug!("Crawl policy check for {} failed ({}); allowing", candidate.url, e),
        }

        let page = match self
            .bounded(self.config.fetch_timeout(), async {
                Ok(self.fetcher.fetch(&candidate.url).await)
            })
            .await
        {
            Ok(Ok(page)) => page,
            Ok(Err(failure)) => {
                return Err(reject(Stage::Extraction, RejectionReason::Extraction(failure)))
            }
            Err(_) => {
                return Err(reject(
                    Stage::Extraction,
                    RejectionReason::Extraction(ExtractionFailure::Timeout),
                ))
            }
        };

        let query = RelevanceQuery {
            claim: claim.to_string(),
            title: page.title.clone(),
            body: page.body.clone(),
        };
        match self
            .bounded(self.config.correlation_timeout(), self.judge.judge(&query))
            .await
        {
            Ok(Relevance::Relevant) => {}
            Ok(Relevance::Irrelevant) => {
                return Err(reject(Stage::Correlation, RejectionReason::Irrelevant))
            }
            Err(e) => {
                return Err(reject(
                    Stage::Correlation,
                    RejectionReason::JudgeFailed(e.to_string()),
                ))
            }
        }

        let mut source = Source::from_page(page, candidate.rating);
        // Keep the funnel's domain so sources group consistently by site
        source.domain = candidate.domain;
        Ok(source)
    }

    /// One outbound call: holds a concurrency permit and honours `timeout`
    async fn bounded<T, F>(&self, timeout: Duration, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ServiceError::Unavailable("concurrency limiter closed".to_string()))?;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ServiceError::Timeout(format!("no response within {:?}", timeout)))?
    }
}
