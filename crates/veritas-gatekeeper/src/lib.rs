//! Veritas Gatekeeper
//!
//! The source funnel: every candidate URL must pass, in order,
//!
//! 1. the reliability rating filter (skipped when rating is disabled),
//! 2. the robots.txt crawl policy,
//! 3. content extraction,
//! 4. the LLM correlation judge,
//!
//! before it becomes a [`veritas_domain::Source`]. A candidate failing any
//! stage is dropped with a [`RejectionReason`]; only an unreachable rating
//! service or cancellation fails the whole run.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use veritas_gatekeeper::{FilterConfig, Gatekeeper, LlmCorrelationJudge};
//! use veritas_llm::MockProvider;
//! use veritas_sources::fixtures::{StaticCrawlPolicy, StaticPages, StaticRatings};
//!
//! # async fn demo() -> Result<(), veritas_gatekeeper::GatekeeperError> {
//! let gatekeeper = Gatekeeper::new(
//!     FilterConfig::default(),
//!     Arc::new(StaticRatings::new().with("example.com", "T", 90.0)),
//!     Arc::new(StaticCrawlPolicy::allow_all()),
//!     Arc::new(StaticPages::new().page("https://example.com/a", "Title", "Body")),
//!     Arc::new(LlmCorrelationJudge::new(Arc::new(MockProvider::new("YES")))),
//! )?;
//!
//! let outcome = gatekeeper
//!     .filter_sources("The sky is blue", vec!["https://example.com/a".to_string()], &CancellationToken::new())
//!     .await?;
//! assert_eq!(outcome.sources.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod correlation;
mod error;
mod funnel;
mod rejection;

pub use config::FilterConfig;
pub use correlation::{build_correlation_prompt, parse_relevance, LlmCorrelationJudge};
pub use error::GatekeeperError;
pub use funnel::{FilterOutcome, Gatekeeper};
pub use rejection::{FunnelReport, Rejection, RejectionReason, Stage};
