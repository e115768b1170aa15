//! Tavily web search client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use veritas_domain::{CandidateStream, SearchProvider, ServiceError};

use crate::error::SourceError;

/// Default search endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily API client for web search
#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

/// Tavily API request
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

/// Tavily API response
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

/// Individual search result from Tavily
#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
}

impl TavilySearch {
    /// Create a new Tavily client
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_SEARCH_URL.to_string(),
            client,
        })
    }

    /// Read the API key from the named environment variable
    pub fn from_env(key_var: &str, timeout: Duration) -> Result<Self, SourceError> {
        let key = std::env::var(key_var)
            .map_err(|_| SourceError::Configuration(format!("{} is not set", key_var)))?;
        Self::new(key, timeout)
    }

    /// Override the search endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<CandidateStream, ServiceError> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(format!("search: {}", e))
                } else {
                    ServiceError::Unavailable(format!("Failed to send search request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Search API error {}: {}", status, body);
            return Err(ServiceError::Unavailable(format!(
                "Search API error {}",
                status
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("search response: {}", e)))?;

        let urls: Vec<String> = parsed
            .results
            .into_iter()
            .map(|r| r.url)
            .take(max_results)
            .collect();
        info!("Search for {:?} returned {} candidates", query, urls.len());
        Ok(CandidateStream::new(urls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = TavilyRequest {
            api_key: "k",
            query: "plastic bag ban",
            search_depth: "basic",
            max_results: 5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "plastic bag ban");
        assert_eq!(json["max_results"], 5);
    }

    #[test]
    fn test_response_parsing_ignores_extra_fields() {
        let raw = r#"{"query":"q","results":[
            {"title":"A","url":"https://a.com/1","content":"...","score":0.9},
            {"title":"B","url":"https://b.com/2","content":"...","score":0.5}
        ]}"#;
        let parsed: TavilyResponse = serde_json::from_str(raw).unwrap();
        let urls: Vec<_> = parsed.results.into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[tokio::test]
    async fn test_unreachable_search_is_service_error() {
        let search = TavilySearch::new("k", Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/search");
        let result = search.search("q", 5).await;
        assert!(matches!(
            result,
            Err(ServiceError::Unavailable(_)) | Err(ServiceError::Timeout(_))
        ));
    }
}
