//! Mock LLM provider for deterministic testing

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use veritas_domain::{LlmProvider, ServiceError};

/// Response text that makes the mock return an error
const ERROR_MARKER: &str = "ERROR";

#[derive(Debug, Default)]
struct Script {
    exact: HashMap<String, String>,
    containing: Vec<(String, String)>,
    queue: VecDeque<String>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Lookup order: queued responses (FIFO), exact prompt match, first fragment
/// match, then the default response.
///
/// # Examples
///
/// ```
/// use veritas_llm::MockProvider;
/// use veritas_domain::LlmProvider;
///
/// # async fn demo() {
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_response_containing("Claim:", "YES");
/// assert_eq!(provider.generate("prompt1").await.unwrap(), "response1");
/// assert_eq!(provider.generate("Claim: sky is blue").await.unwrap(), "YES");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    script: Arc<Mutex<Script>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.script().exact.insert(prompt.into(), response.into());
    }

    /// Respond to any prompt containing `fragment`
    pub fn add_response_containing(
        &mut self,
        fragment: impl Into<String>,
        response: impl Into<String>,
    ) {
        self.script()
            .containing
            .push((fragment.into(), response.into()));
    }

    /// Queue a one-shot response; queued responses are used in order
    pub fn queue_response(&mut self, response: impl Into<String>) {
        self.script().queue.push_back(response.into());
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.add_response(prompt, ERROR_MARKER);
    }

    /// Configure to return an error for any prompt containing `fragment`
    pub fn add_error_containing(&mut self, fragment: impl Into<String>) {
        self.add_response_containing(fragment, ERROR_MARKER);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.script().prompts.len()
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> Vec<String> {
        self.script().prompts.clone()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.script().prompts.clear();
    }

    fn respond(&self, prompt: &str) -> Result<String, ServiceError> {
        let mut script = self.script();
        script.prompts.push(prompt.to_string());

        let response = script
            .queue
            .pop_front()
            .or_else(|| script.exact.get(prompt).cloned())
            .or_else(|| {
                script
                    .containing
                    .iter()
                    .find(|(fragment, _)| prompt.contains(fragment.as_str()))
                    .map(|(_, response)| response.clone())
            })
            .unwrap_or_else(|| self.default_response.clone());

        if response == ERROR_MARKER {
            return Err(ServiceError::Unavailable("Mock error".to_string()));
        }
        Ok(response)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.respond(prompt)
    }

    async fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, ServiceError> {
        self.respond(prompt)
    }
}
