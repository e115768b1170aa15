//! NewsGuard-style reliability rating client
//!
//! OAuth2 client-credentials: a token is fetched on first use and reused until
//! the API rejects it with 401, at which point it is dropped and fetched again
//! once. Ratings come from `GET {api}/v3/check/?url=<domain>`.

use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use veritas_domain::{Rating, RatingService, ServiceError};

/// Default token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://account.newsguardtech.com/account-auth/oauth2/token";

/// Default API base
pub const DEFAULT_API_URL: &str = "https://api.newsguardtech.com";

/// Default number of attempts per lookup
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the second check attempt; doubles afterwards
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

fn backoff(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Longest one lookup can take when every HTTP request is capped at
/// `request_timeout`
///
/// Covers the token request and every check attempt with its backoff,
/// twice over when a rejected token forces re-authentication.
pub fn lookup_budget(request_timeout: Duration, max_attempts: u32) -> Duration {
    let attempts = max_attempts.max(1);
    let total_backoff: Duration = (1..attempts).map(backoff).sum();
    (request_timeout * (attempts + 1) + total_backoff) * 2
}

/// Reliability rating client
#[derive(Debug)]
pub struct NewsGuardClient {
    client: reqwest::Client,
    token_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<String>>,
    max_retries: u32,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Body of a `/v3/check` response
#[derive(Debug, Deserialize)]
pub struct CheckResponse {
    /// Domain as known to the service
    #[serde(default)]
    pub identifier: Option<String>,
    /// Trust tier, e.g. "T" for trusted
    #[serde(default)]
    pub rank: Option<String>,
    /// Score from 0 to 100
    #[serde(default)]
    pub score: Option<f64>,
}

impl CheckResponse {
    /// Missing rank or score means the domain has not been rated
    pub fn into_rating(self) -> Rating {
        match (self.rank, self.score) {
            (Some(rank), Some(score)) if !rank.trim().is_empty() => Rating::Rated {
                rank: rank.trim().to_string(),
                score,
            },
            _ => Rating::Unrated,
        }
    }
}

impl NewsGuardClient {
    /// Create a client with explicit credentials
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: RwLock::new(None),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Read credentials from the named environment variables
    pub fn from_env(id_var: &str, secret_var: &str, timeout: Duration) -> Result<Self, SourceError> {
        let id = std::env::var(id_var)
            .map_err(|_| SourceError::Configuration(format!("{} is not set", id_var)))?;
        let secret = std::env::var(secret_var)
            .map_err(|_| SourceError::Configuration(format!("{} is not set", secret_var)))?;
        Self::new(id, secret, timeout)
    }

    /// Override the token and API endpoints
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the number of attempts per lookup
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another lookup may have authenticated while we waited
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.request_token().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn request_token(&self) -> Result<String, SourceError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Auth(format!(
                "token endpoint returned HTTP {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("token response: {}", e)))?;
        info!("Rating service authentication succeeded");
        Ok(token.access_token)
    }

    /// Forget `stale` unless a concurrent lookup already replaced it
    async fn invalidate(&self, stale: &str) {
        let mut slot = self.token.write().await;
        if slot.as_deref() == Some(stale) {
            *slot = None;
        }
    }

    async fn check(&self, domain: &str) -> Result<Rating, SourceError> {
        let token = self.access_token().await?;
        if let Some(rating) = self.check_with(domain, &token).await? {
            return Ok(rating);
        }

        info!("Rating token rejected; re-authenticating");
        self.invalidate(&token).await;
        let token = self.access_token().await?;
        self.check_with(domain, &token).await?.ok_or_else(|| {
            SourceError::Auth("check returned HTTP 401 Unauthorized with a fresh token".to_string())
        })
    }

    /// One lookup with retries; `None` when the API rejects `token`
    async fn check_with(&self, domain: &str, token: &str) -> Result<Option<Rating>, SourceError> {
        let url = format!("{}/v3/check/", self.api_url);

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self
                .client
                .get(&url)
                .query(&[("url", domain)])
                .bearer_auth(token)
                .send()
                .await
            {
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Ok(Some(Rating::Unrated));
                }
                Ok(response) if response.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Ok(None);
                }
                Ok(response) if response.status().is_success() => {
                    let body: CheckResponse = response
                        .json()
                        .await
                        .map_err(|e| SourceError::Parse(format!("check response: {}", e)))?;
                    return Ok(Some(body.into_rating()));
                }
                Ok(response) if response.status().is_client_error() => {
                    return Err(SourceError::Auth(format!(
                        "check returned HTTP {}",
                        response.status()
                    )));
                }
                Ok(response) => {
                    last_error = Some(SourceError::Http(format!("HTTP {}", response.status())));
                }
                Err(e) => {
                    last_error = Some(SourceError::from(e));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = backoff(attempts);
                warn!("Rating lookup for {} failed, retrying in {:?}", domain, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Http("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl RatingService for NewsGuardClient {
    async fn rate(&self, domain: &str) -> Result<Rating, ServiceError> {
        let rating = self.check(domain).await?;
        debug!("Rating for {}: {:?}", domain, rating);
        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_response_rated() {
        let body: CheckResponse =
            serde_json::from_str(r#"{"identifier":"bbc.co.uk","rank":"T","score":95.0}"#).unwrap();
        assert_eq!(
            body.into_rating(),
            Rating::Rated {
                rank: "T".to_string(),
                score: 95.0
            }
        );
    }

    #[test]
    fn test_check_response_missing_fields_unrated() {
        let body: CheckResponse = serde_json::from_str(r#"{"identifier":"x.com"}"#).unwrap();
        assert_eq!(body.into_rating(), Rating::Unrated);

        let body: CheckResponse =
            serde_json::from_str(r#"{"rank":"","score":80}"#).unwrap();
        assert_eq!(body.into_rating(), Rating::Unrated);
    }

    #[test]
    fn test_lookup_budget_covers_reauthentication() {
        // token + 3 checks + 0.5s + 1s backoff, doubled for one re-authentication
        assert_eq!(
            lookup_budget(Duration::from_secs(1), 3),
            Duration::from_millis(11_000)
        );
        assert_eq!(lookup_budget(Duration::from_secs(1), 0), Duration::from_secs(4));
    }

    #[test]
    fn test_missing_env_credentials() {
        let result = NewsGuardClient::from_env(
            "VERITAS_TEST_UNSET_ID",
            "VERITAS_TEST_UNSET_SECRET",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(SourceError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let client = NewsGuardClient::new("id", "secret", Duration::from_millis(500))
            .unwrap()
            .with_endpoints("http://127.0.0.1:9/token", "http://127.0.0.1:9")
            .with_max_retries(1);

        let result = client.rate("example.com").await;
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
    }
}
