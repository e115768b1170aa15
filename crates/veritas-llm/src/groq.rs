//! Remote generation via an OpenAI-compatible chat completions API
//!
//! Defaults target Groq; any compatible endpoint works.

use crate::retry::RetryPolicy;
use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use veritas_domain::{LlmProvider, ServiceError};

/// Default chat completions base URL
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Chat completions client
#[derive(Debug, Clone)]
pub struct GroqProvider {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl GroqProvider {
    /// Create a client for `model` authenticated with `api_key`
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration("API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: 0.0,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Read the API key from the environment variable `key_var`
    pub fn from_env(
        base_url: impl Into<String>,
        model: impl Into<String>,
        key_var: &str,
    ) -> Result<Self, LlmError> {
        let key = std::env::var(key_var)
            .map_err(|_| LlmError::Configuration(format!("{} is not set", key_var)))?;
        Self::new(base_url, model, key)
    }

    /// Sampling temperature, 0.0 by default
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        self.retry
            .run("chat completion", || async {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(LlmError::from_reqwest)?;

                let status = response.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(LlmError::RateLimitExceeded);
                }
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotAvailable(self.model.clone()));
                }
                if status.is_server_error() {
                    return Err(LlmError::Communication(format!("HTTP {}", status)));
                }
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(LlmError::InvalidResponse(format!("HTTP {}: {}", status, text)));
                }

                let body: ChatResponse = response.json().await.map_err(|e| {
                    LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                let content = body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| LlmError::InvalidResponse("No choices returned".to_string()))?;
                debug!("chat completion returned {} chars", content.len());
                Ok(content)
            })
            .await
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        Ok(self.complete(prompt, false).await?)
    }

    async fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, ServiceError> {
        Ok(self.complete(prompt, true).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let result = GroqProvider::new(DEFAULT_BASE_URL, "llama-3.1-8b-instant", "  ");
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_missing_env_key() {
        let result = GroqProvider::from_env(DEFAULT_BASE_URL, "m", "VERITAS_TEST_UNSET_KEY_VAR");
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_json_mode_serialization() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"YES"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("YES"));
    }
}
