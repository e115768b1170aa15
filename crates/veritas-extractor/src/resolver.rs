//! LLM-assisted entity resolution

use crate::parser::parse_alias_map;
use crate::prompt::alias_prompt;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use veritas_domain::{AliasGroup, Judge, LlmProvider, ServiceError};

/// Groups entity surface forms that name the same thing
///
/// Never fails: when the model is unreachable or answers nonsense every
/// name becomes its own canonical entity.
#[derive(Clone)]
pub struct LlmEntityResolver {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl LlmEntityResolver {
    /// Resolver backed by `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(60),
        }
    }

    /// Timeout for the resolution call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn identity(names: &[String]) -> Vec<AliasGroup> {
        names.iter().map(AliasGroup::identity).collect()
    }
}

#[async_trait]
impl Judge<[String]> for LlmEntityResolver {
    type Verdict = Vec<AliasGroup>;

    async fn judge(&self, input: &[String]) -> Result<Vec<AliasGroup>, ServiceError> {
        let names: Vec<String> = input
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if names.len() < 2 {
            return Ok(Self::identity(&names));
        }

        let prompt = alias_prompt(&names);
        let response = match tokio::time::timeout(self.timeout, self.llm.generate(&prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Entity resolution failed: {}; keeping names as-is", e);
                return Ok(Self::identity(&names));
            }
            Err(_) => {
                warn!("Entity resolution timed out; keeping names as-is");
                return Ok(Self::identity(&names));
            }
        };

        match parse_alias_map(&response, &names) {
            Ok(groups) => {
                debug!("Resolved {} names into {} entities", names.len(), groups.len());
                Ok(groups)
            }
            Err(e) => {
                warn!("Unparseable entity resolution: {}; keeping names as-is", e);
                Ok(Self::identity(&names))
            }
        }
    }
}
