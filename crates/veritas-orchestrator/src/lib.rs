//! Veritas Orchestrator
//!
//! Runs a claim through the full verification pipeline:
//!
//! ```text
//! Received → Preprocessed → SourcesFiltered → GraphBuilt → Answered → Done
//!     └──────────────┴──────────────┴──────────────┴───────────┴──▶ Failed
//! ```
//!
//! - **Preprocessed**: search title and summary derived by the LLM
//! - **SourcesFiltered**: search results run through the rating, crawl
//!   policy, extraction and correlation funnel, then annotated
//! - **GraphBuilt**: graph reset and rebuilt under the single-claim lock
//! - **Answered**: grounded verdict, or an abstention when nothing survived
//! - **Done**: history recorded (best effort)
//!
//! Failures are classified by [`PipelineError::kind`] so callers can tell
//! "try again later" from bad input.

#![warn(missing_docs)]

mod config;
mod error;
mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::{ErrorKind, PipelineError};
pub use orchestrator::{Orchestrator, SharedHistory, Verification};
