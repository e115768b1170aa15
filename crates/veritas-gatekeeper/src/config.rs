//! Gatekeeper configuration

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the source funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Consult the rating service; when false the rating stage is skipped
    pub rating_enabled: bool,

    /// Rank tiers accepted (case-insensitive), e.g. "T" for trusted
    pub accepted_ranks: Vec<String>,

    /// Minimum score, inclusive
    pub min_score: f64,

    /// Maximum simultaneous outbound requests across all runs
    pub max_concurrency: usize,

    /// Timeout for one rating lookup, including the client's own retries
    pub rating_timeout_ms: u64,

    /// Timeout for one robots.txt check
    pub crawl_timeout_ms: u64,

    /// Timeout for one page fetch
    pub fetch_timeout_ms: u64,

    /// Timeout for one correlation judgement, including provider retries
    pub correlation_timeout_ms: u64,

    /// Characters of article body shown to the correlation judge
    pub correlation_body_chars: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rating_enabled: true,
            accepted_ranks: vec!["T".to_string()],
            min_score: 70.0,
            max_concurrency: 8,
            rating_timeout_ms: 20_000,
            crawl_timeout_ms: 5_000,
            fetch_timeout_ms: 5_000,
            correlation_timeout_ms: 60_000,
            correlation_body_chars: 2_000,
        }
    }
}

impl FilterConfig {
    /// Rating stage off; everything else default
    pub fn permissive() -> Self {
        Self {
            rating_enabled: false,
            ..Self::default()
        }
    }

    /// Higher score floor
    pub fn strict() -> Self {
        Self {
            min_score: 85.0,
            ..Self::default()
        }
    }

    /// Reject nonsensical settings
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if self.max_concurrency == 0 {
            return Err(GatekeeperError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_score) {
            return Err(GatekeeperError::Config(format!(
                "min_score must be within 0-100, got {}",
                self.min_score
            )));
        }
        if self.rating_enabled && self.accepted_ranks.iter().all(|r| r.trim().is_empty()) {
            return Err(GatekeeperError::Config(
                "accepted_ranks is empty while rating is enabled".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn rating_timeout(&self) -> Duration {
        Duration::from_millis(self.rating_timeout_ms)
    }

    pub(crate) fn crawl_timeout(&self) -> Duration {
        Duration::from_millis(self.crawl_timeout_ms)
    }

    pub(crate) fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub(crate) fn correlation_timeout(&self) -> Duration {
        Duration::from_millis(self.correlation_timeout_ms)
    }
}
