//! Veritas Synthesizer
//!
//! Retrieval-augmented verdict generation over the claim graph.
//!
//! # Architecture
//!
//! ```text
//! claim ─embed─▶ query vector ─retrieve(top_k)─▶ RetrievedContext
//!                                                   │
//!                    VerdictPromptBuilder ◀─────────┘
//!                            │
//!                      generation LLM ─▶ parse ─▶ ground ─▶ Answer
//!                            ▲                      │
//!                            └──── one re-prompt ◀──┘ (stray citation / bad JSON)
//! ```
//!
//! Embedding or generation outages are errors, never degraded answers.

#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod parser;
mod prompt;

pub use config::SynthesizerConfig;
pub use engine::{ground, QueryEngine};
pub use error::SynthesizerError;
pub use parser::{parse_verdict, GeneratedVerdict};
pub use prompt::{VerdictPromptBuilder, VERDICT_SCHEMA};
