//! Robots.txt parser and crawl policy checker.
//!
//! A robots.txt that cannot be fetched (network error, timeout, any
//! non-success status) is treated as "no restrictions". Parsed files are
//! cached only inside a per-claim [`RobotsSession`], and failed fetches are
//! never cached.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;
use veritas_domain::{CrawlPolicy, ServiceError};

/// User agent we identify as when matching robots.txt groups
pub const DEFAULT_CRAWLER_AGENT: &str = "VeritasBot";

/// Parsed robots.txt rules.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    /// Rules per user-agent (lowercase)
    rules: HashMap<String, AgentRules>,

    /// Default rules (for *)
    default_rules: AgentRules,
}

/// Rules for a specific user-agent.
#[derive(Debug, Clone, Default)]
struct AgentRules {
    /// Disallowed path prefixes
    disallow: Vec<String>,

    /// Allowed path prefixes (override disallow)
    allow: Vec<String>,
}

impl RobotsTxt {
    /// Parse robots.txt content.
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut current_agents: Vec<String> = Vec::new();
        let mut current_rules = AgentRules::default();
        // Consecutive User-agent lines share one group
        let mut in_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_rules {
                        robots.store(&current_agents, &current_rules);
                        current_rules = AgentRules::default();
                        current_agents.clear();
                        in_rules = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        current_rules.disallow.push(value.to_string());
                    }
                }
                "allow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        current_rules.allow.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        robots.store(&current_agents, &current_rules);
        robots
    }

    fn store(&mut self, agents: &[String], rules: &AgentRules) {
        for agent in agents {
            if agent == "*" {
                self.default_rules = rules.clone();
            } else {
                self.rules.insert(agent.clone(), rules.clone());
            }
        }
    }

    /// Check if a path is allowed for a user-agent.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent_lower = user_agent.to_lowercase();

        let rules = self
            .rules
            .get(&agent_lower)
            .or_else(|| {
                self.rules
                    .iter()
                    .find(|(k, _)| agent_lower.contains(k.as_str()))
                    .map(|(_, v)| v)
            })
            .unwrap_or(&self.default_rules);

        // Allow rules take precedence
        if rules.allow.iter().any(|allow| path.starts_with(allow)) {
            return true;
        }

        !rules
            .disallow
            .iter()
            .any(|disallow| disallow == "/" || path.starts_with(disallow))
    }

    /// Check if robots.txt disallows all crawling.
    pub fn disallows_all(&self, user_agent: &str) -> bool {
        !self.is_allowed(user_agent, "/")
    }
}

/// Crawl policy backed by each site's robots.txt
///
/// Every check fetches robots.txt afresh; use [`CrawlPolicy::session`] to
/// share fetched files across the checks of one claim.
#[derive(Debug, Clone)]
pub struct RobotsChecker {
    client: reqwest::Client,
    user_agent: String,
}

impl RobotsChecker {
    /// Create a checker that fetches with the given timeout
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let user_agent = user_agent.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, user_agent })
    }

    /// `None` when the file could not be fetched
    async fn fetch(&self, origin: &str) -> Option<RobotsTxt> {
        let url = format!("{}/robots.txt", origin);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(content) => Some(RobotsTxt::parse(&content)),
                Err(e) => {
                    debug!("Unreadable robots.txt at {}: {}; allowing", url, e);
                    None
                }
            },
            Ok(response) => {
                debug!("robots.txt at {} returned {}; allowing", url, response.status());
                None
            }
            Err(e) => {
                debug!("robots.txt fetch failed for {}: {}; allowing", url, e);
                None
            }
        }
    }

    fn permits(&self, robots: Option<&RobotsTxt>, path: &str) -> bool {
        robots.map_or(true, |r| r.is_allowed(&self.user_agent, path))
    }
}

fn origin_and_path(url: &str) -> Result<(String, String), ServiceError> {
    let parsed = Url::parse(url)
        .map_err(|e| ServiceError::InvalidResponse(format!("Invalid URL {}: {}", url, e)))?;
    let origin = parsed.origin().ascii_serialization();
    let path = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };
    Ok((origin, path))
}

#[async_trait]
impl CrawlPolicy for RobotsChecker {
    async fn is_allowed(&self, url: &str) -> Result<bool, ServiceError> {
        let (origin, path) = origin_and_path(url)?;
        let robots = self.fetch(&origin).await;
        Ok(self.permits(robots.as_ref(), &path))
    }

    fn session(&self) -> Option<Arc<dyn CrawlPolicy>> {
        Some(Arc::new(RobotsSession::new(self.clone())))
    }
}

/// Robots checks for one claim, caching each origin's parsed file
#[derive(Debug)]
pub struct RobotsSession {
    checker: RobotsChecker,
    cache: Mutex<HashMap<String, Arc<RobotsTxt>>>,
}

impl RobotsSession {
    /// Start an empty session
    pub fn new(checker: RobotsChecker) -> Self {
        Self {
            checker,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn robots_for(&self, origin: &str) -> Option<Arc<RobotsTxt>> {
        if let Some(cached) = self.cache.lock().await.get(origin) {
            return Some(Arc::clone(cached));
        }

        let robots = Arc::new(self.checker.fetch(origin).await?);
        self.cache
            .lock()
            .await
            .insert(origin.to_string(), Arc::clone(&robots));
        Some(robots)
    }
}

#[async_trait]
impl CrawlPolicy for RobotsSession {
    async fn is_allowed(&self, url: &str) -> Result<bool, ServiceError> {
        let (origin, path) = origin_and_path(url)?;
        let robots = self.robots_for(&origin).await;
        Ok(self.checker.permits(robots.as_deref(), &path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let content = r#"
User-agent: *
Disallow: /private/
Disallow: /admin/ # staff only
Allow: /public/
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(robots.is_allowed("TestBot", "/public/page"));
        assert!(!robots.is_allowed("TestBot", "/private/page"));
        assert!(!robots.is_allowed("TestBot", "/admin/"));
        assert!(robots.is_allowed("TestBot", "/other/page"));
    }

    #[test]
    fn test_specific_user_agent() {
        let content = r#"
User-agent: *
Disallow: /

User-agent: veritasbot
Disallow:
Allow: /
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("BadBot", "/page"));
        assert!(robots.is_allowed("VeritasBot", "/page"));
    }

    #[test]
    fn test_grouped_user_agents_share_rules() {
        let content = r#"
User-agent: alpha
User-agent: beta
Disallow: /news/
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("alpha", "/news/today"));
        assert!(!robots.is_allowed("beta", "/news/today"));
        assert!(robots.is_allowed("gamma", "/news/today"));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let content = r#"
User-agent: *
Disallow: /private/
Allow: /private/public/
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("Bot", "/private/secret"));
        assert!(robots.is_allowed("Bot", "/private/public/page"));
    }

    #[test]
    fn test_empty_robots() {
        let robots = RobotsTxt::parse("");
        assert!(robots.is_allowed("AnyBot", "/any/path"));
    }

    #[test]
    fn test_disallow_all() {
        let robots = RobotsTxt::parse("User-agent: *\nDisallow: /\n");
        assert!(robots.disallows_all("Bot"));
    }

    #[tokio::test]
    async fn test_unreachable_robots_is_permissive() {
        let checker = RobotsChecker::new(DEFAULT_CRAWLER_AGENT, Duration::from_millis(500)).unwrap();
        assert!(checker.is_allowed("http://127.0.0.1:9/article").await.unwrap());
    }

    #[tokio::test]
    async fn test_session_allows_unreachable_robots() {
        let checker = RobotsChecker::new(DEFAULT_CRAWLER_AGENT, Duration::from_millis(500)).unwrap();
        let session = checker.session().unwrap();
        assert!(session.is_allowed("http://127.0.0.1:9/article").await.unwrap());
        assert!(session.session().is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        let checker = RobotsChecker::new(DEFAULT_CRAWLER_AGENT, Duration::from_millis(500)).unwrap();
        assert!(checker.is_allowed("::nope::").await.is_err());
    }
}
