//! Configuration for claim and source preprocessing

use crate::ExtractorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Preprocessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Generate title and summary for claims; when false both are the raw text
    pub summarize_claims: bool,

    /// Maximum title length (characters)
    pub max_title_chars: usize,

    /// Maximum claim summary length (characters)
    pub max_summary_chars: usize,

    /// Replace each source body with an LLM summary before NER
    pub summarize_sources: bool,

    /// Maximum source summary length (characters)
    pub max_source_summary_chars: usize,

    /// Run topic and entity extraction on sources
    pub ner_enabled: bool,

    /// Characters of source body sent to NER
    pub ner_input_chars: usize,

    /// Sources annotated concurrently within one claim; calls across claims
    /// are further capped by a shared limiter when one is attached
    pub annotate_concurrency: usize,

    /// Timeout for one LLM call (seconds)
    pub llm_timeout_secs: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            summarize_claims: true,
            max_title_chars: 150,
            max_summary_chars: 300,
            summarize_sources: false,
            max_source_summary_chars: 1024,
            ner_enabled: true,
            ner_input_chars: 4_000,
            annotate_concurrency: 4,
            llm_timeout_secs: 60,
        }
    }
}

impl PreprocessConfig {
    /// No LLM calls at all: titles are the raw claim, sources get the default topic
    pub fn passthrough() -> Self {
        Self {
            summarize_claims: false,
            summarize_sources: false,
            ner_enabled: false,
            ..Self::default()
        }
    }

    /// Get the LLM timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_title_chars == 0 {
            return Err(ExtractorError::Config(
                "max_title_chars must be greater than 0".to_string(),
            ));
        }
        if self.annotate_concurrency == 0 {
            return Err(ExtractorError::Config(
                "annotate_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.llm_timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "llm_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
