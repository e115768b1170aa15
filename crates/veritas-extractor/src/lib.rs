//! Veritas Extractor
//!
//! LLM-driven text understanding around the funnel:
//!
//! - **Claim preprocessing**: a search-keyword title and a one-sentence
//!   summary for the submitted claim
//! - **Source annotation**: topic and named entities per accepted source,
//!   optionally summarizing long bodies first
//! - **Entity resolution**: grouping surface forms ("USA", "United States")
//!   under one canonical name
//!
//! # Architecture
//!
//! ```text
//! claim text → Preprocessor → (title, summary)
//! sources    → Preprocessor → topic + entities per source
//! entities   → LlmEntityResolver → alias groups → EntityRegistry
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use veritas_extractor::{PreprocessConfig, Preprocessor};
//! use veritas_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = Arc::new(MockProvider::new("city x plastic bag ban 2024"));
//! let preprocessor = Preprocessor::new(llm, PreprocessConfig::default());
//!
//! let claim = preprocessor.preprocess_claim("City X banned plastic bags in 2024").await?;
//! println!("search for: {}", claim.title);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod parser;
mod preprocessor;
mod prompt;
mod resolver;

#[cfg(test)]
mod tests;

pub use config::PreprocessConfig;
pub use error::ExtractorError;
pub use parser::{clean_title, extract_json, parse_alias_map, parse_annotation, Annotation};
pub use preprocessor::{AnnotationReport, PreprocessedClaim, Preprocessor};
pub use resolver::LlmEntityResolver;
