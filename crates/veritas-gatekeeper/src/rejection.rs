//! Why candidates were dropped, and how many survived each stage

use std::fmt;
use std::time::Duration;
use veritas_domain::ExtractionFailure;

/// Funnel stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// URL parsing and duplicate removal
    Intake,
    /// Reliability rating filter
    Rating,
    /// robots.txt check
    CrawlPolicy,
    /// Page fetch and parse
    Extraction,
    /// LLM relevance check
    Correlation,
}

/// Reasons a candidate is dropped
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// URL could not be parsed
    InvalidUrl(String),

    /// Same domain and URL seen earlier in this run
    Duplicate,

    /// Rating service has no rating for the domain
    Unrated,

    /// Rated, but below the accepted tier or score
    BelowThreshold {
        /// Reported rank
        rank: String,
        /// Reported score
        score: f64,
    },

    /// robots.txt disallows the path
    CrawlDisallowed,

    /// Page could not be extracted
    Extraction(ExtractionFailure),

    /// Judge said the article is off-topic
    Irrelevant,

    /// Judge failed or timed out
    JudgeFailed(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            RejectionReason::Duplicate => write!(f, "duplicate"),
            RejectionReason::Unrated => write!(f, "no rating"),
            RejectionReason::BelowThreshold { rank, score } => {
                write!(f, "rating {} / {} below threshold", rank, score)
            }
            RejectionReason::CrawlDisallowed => write!(f, "disallowed by robots.txt"),
            RejectionReason::Extraction(failure) => write!(f, "extraction failed: {}", failure),
            RejectionReason::Irrelevant => write!(f, "judged irrelevant"),
            RejectionReason::JudgeFailed(msg) => write!(f, "judge failed: {}", msg),
        }
    }
}

/// One dropped candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Candidate URL
    pub url: String,
    /// Stage that dropped it
    pub stage: Stage,
    /// Why
    pub reason: RejectionReason,
}

/// Survivor counts per stage
///
/// Counts never increase from one stage to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunnelReport {
    /// Raw candidates received
    pub candidates: usize,
    /// Unique, parseable candidates
    pub after_intake: usize,
    /// Passed the rating filter
    pub after_rating: usize,
    /// Allowed by robots.txt
    pub after_crawl_policy: usize,
    /// Extracted successfully
    pub after_extraction: usize,
    /// Judged relevant: the accepted set
    pub after_correlation: usize,
    /// Every dropped candidate
    pub rejections: Vec<Rejection>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl FunnelReport {
    /// Counts in stage order
    pub fn counts(&self) -> [usize; 6] {
        [
            self.candidates,
            self.after_intake,
            self.after_rating,
            self.after_crawl_policy,
            self.after_extraction,
            self.after_correlation,
        ]
    }

    /// Whether every stage kept at most as many candidates as it received
    pub fn is_monotonic(&self) -> bool {
        self.counts().windows(2).all(|w| w[1] <= w[0])
    }

    /// Rejections recorded at `stage`
    pub fn rejected_at(&self, stage: Stage) -> usize {
        self.rejections.iter().filter(|r| r.stage == stage).count()
    }
}
