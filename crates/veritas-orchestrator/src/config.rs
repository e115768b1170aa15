//! Orchestrator configuration

use crate::PipelineError;
use serde::{Deserialize, Serialize};
use veritas_domain::validation::DEFAULT_MAX_CLAIM_CHARS;

/// Per-claim pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Longest accepted claim, in characters
    pub max_claim_chars: usize,

    /// Candidate URLs requested from the search provider
    pub search_results: usize,

    /// Persist finished claims when a history store is attached
    pub record_history: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_claim_chars: DEFAULT_MAX_CLAIM_CHARS,
            search_results: 10,
            record_history: true,
        }
    }
}

impl OrchestratorConfig {
    /// Reject nonsensical settings
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_claim_chars == 0 {
            return Err(PipelineError::Config(
                "max_claim_chars must be positive".to_string(),
            ));
        }
        if self.search_results == 0 {
            return Err(PipelineError::Config(
                "search_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
