//! Veritas Sources
//!
//! Network clients for everything the source funnel consults:
//!
//! - [`NewsGuardClient`]: domain reliability ratings
//! - [`RobotsChecker`]: robots.txt crawl policy
//! - [`HtmlExtractor`]: page download and main-content extraction
//! - [`TavilySearch`]: web search for candidate URLs
//!
//! [`fixtures`] holds in-memory implementations of the same traits for tests
//! and offline runs.

#![warn(missing_docs)]

pub mod error;
pub mod extract;
pub mod fixtures;
pub mod rating;
pub mod robots;
pub mod search;

pub use error::SourceError;
pub use extract::{parse_page, HtmlExtractor};
pub use rating::{lookup_budget, NewsGuardClient};
pub use robots::{RobotsChecker, RobotsSession, RobotsTxt};
pub use search::TavilySearch;

use url::Url;

/// Browser-like user agent used for page fetches
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Bare domain of a URL: lowercase host without a leading `www.`
///
/// # Examples
///
/// ```
/// use veritas_sources::domain_of;
///
/// assert_eq!(domain_of("https://WWW.Example.com/a?b=1").unwrap(), "example.com");
/// assert!(domain_of("not a url").is_err());
/// ```
pub fn domain_of(raw: &str) -> Result<String, SourceError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SourceError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            parsed.scheme()
        )));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| SourceError::InvalidUrl(format!("{}: no host", raw)))?
        .to_ascii_lowercase();
    Ok(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
