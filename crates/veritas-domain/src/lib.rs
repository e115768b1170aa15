//! Veritas Domain Layer
//!
//! Core value objects and capability traits for claim verification.
//! Everything that talks to the network lives in other crates; this crate
//! only names the shapes they exchange and the contracts they implement.
//!
//! ## Key Concepts
//!
//! - **Claim**: the user-submitted statement under verification
//! - **Source**: a web article that survived every filter stage
//! - **Rating**: tagged reliability result, `Rated { rank, score }` or `Unrated`
//! - **Entity**: canonical name plus the surface forms merged into it
//! - **Answer**: verdict, citations and optional relationship diagram
//! - **PipelineState**: the strictly sequential per-claim state machine
//!
//! ## Capability traits
//!
//! LLM decisions (correlation, alias merging) are modelled as [`traits::Judge`]
//! so pipeline logic can be tested against scripted verdicts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answer;
pub mod claim;
pub mod entity;
pub mod rating;
pub mod source;
pub mod state;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use answer::{Answer, Citation, Outcome, Verdict};
pub use claim::{Claim, ClaimError, ClaimId};
pub use entity::{AliasGroup, Entity, EntityRegistry};
pub use rating::Rating;
pub use source::{ExtractedPage, ExtractionFailure, Source, SourceKey};
pub use state::{PipelineState, StateMachine, TransitionError};
pub use traits::{
    AliasJudge, CandidateStream, ContentFetcher, CorrelationJudge, CrawlPolicy, EmbeddingModel,
    HistoryEntry, HistoryStore, Judge, LlmProvider, RatingService, Relevance, RelevanceQuery,
    SearchProvider, ServiceError,
};
pub use validation::{ClaimText, InputError};
