//! Synthesizer configuration

use crate::SynthesizerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for verdict generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Articles placed in the generation context
    pub top_k: usize,

    /// Body characters shown per article
    pub excerpt_chars: usize,

    /// Extra generation attempts after an ungrounded or unparseable answer
    pub max_reprompts: u32,

    /// Attach a DOT diagram of the retrieved subgraph
    pub render_diagram: bool,

    /// Timeout for embedding the claim
    pub embed_timeout_ms: u64,

    /// Timeout for one generation call
    pub generation_timeout_ms: u64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            excerpt_chars: 1_200,
            max_reprompts: 1,
            render_diagram: true,
            embed_timeout_ms: 30_000,
            generation_timeout_ms: 120_000,
        }
    }
}

impl SynthesizerConfig {
    /// Reject nonsensical settings
    pub fn validate(&self) -> Result<(), SynthesizerError> {
        if self.top_k == 0 {
            return Err(SynthesizerError::Config("top_k must be at least 1".to_string()));
        }
        if self.excerpt_chars == 0 {
            return Err(SynthesizerError::Config(
                "excerpt_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub(crate) fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}
