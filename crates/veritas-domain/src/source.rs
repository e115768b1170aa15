//! Source module - web articles retained as evidence

use crate::rating::Rating;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Uniqueness key for sources: domain plus URL
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    /// Publishing domain
    pub domain: String,
    /// Full article URL
    pub url: String,
}

/// Title/body/domain parsed from a fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Article URL
    pub url: String,
    /// Publishing domain (host)
    pub domain: String,
    /// Document title
    pub title: String,
    /// Visible body text
    pub body: String,
}

/// Why a page could not be extracted
///
/// Every variant is a per-source soft failure; the candidate is dropped and
/// the pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// 401/402/403 - paywall or login wall
    Paywalled {
        /// HTTP status returned
        status: u16,
    },
    /// Page served a subscription or bot-check interstitial
    Restricted,
    /// Fetch exceeded its deadline
    Timeout,
    /// Non-success HTTP status other than the paywall codes
    Http {
        /// HTTP status returned
        status: u16,
    },
    /// Connection-level failure
    Network(String),
    /// No usable title or body
    Malformed(String),
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::Paywalled { status } => write!(f, "access denied (HTTP {})", status),
            ExtractionFailure::Restricted => write!(f, "content restricted"),
            ExtractionFailure::Timeout => write!(f, "fetch timed out"),
            ExtractionFailure::Http { status } => write!(f, "HTTP {}", status),
            ExtractionFailure::Network(msg) => write!(f, "network error: {}", msg),
            ExtractionFailure::Malformed(msg) => write!(f, "malformed page: {}", msg),
        }
    }
}

/// A web article that passed every filter stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Article URL
    pub url: String,
    /// Publishing domain
    pub domain: String,
    /// Extracted title
    pub title: String,
    /// Extracted body text
    pub body: String,
    /// Reliability of the domain at acceptance time
    pub rating: Rating,
    /// Entity surface forms mentioned by the article
    #[serde(default)]
    pub entities: BTreeSet<String>,
    /// Primary topic label
    #[serde(default)]
    pub topic: Option<String>,
}

impl Source {
    /// Build a source from an extracted page and the domain's rating
    pub fn from_page(page: ExtractedPage, rating: Rating) -> Self {
        Self {
            url: page.url,
            domain: page.domain,
            title: page.title,
            body: page.body,
            rating,
            entities: BTreeSet::new(),
            topic: None,
        }
    }

    /// Uniqueness key
    pub fn key(&self) -> SourceKey {
        SourceKey {
            domain: self.domain.clone(),
            url: self.url.clone(),
        }
    }

    /// Attach topic and entities produced by annotation
    pub fn annotate<I, S>(&mut self, topic: impl Into<String>, entities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topic = Some(topic.into());
        self.entities = entities
            .into_iter()
            .map(Into::into)
            .map(|e: String| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
    }

    /// Topic label, or the catch-all label when annotation produced none
    pub fn topic_label(&self) -> &str {
        self.topic.as_deref().unwrap_or(DEFAULT_TOPIC)
    }
}

/// Topic assigned when annotation yields nothing
pub const DEFAULT_TOPIC: &str = "General";

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ExtractedPage {
        ExtractedPage {
            url: "https://news.example/story".to_string(),
            domain: "news.example".to_string(),
            title: "Story".to_string(),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn test_annotate_trims_and_drops_blank_entities() {
        let mut source = Source::from_page(page(), Rating::Unrated);
        source.annotate("Environment", vec![" City X ", "", "Plastic"]);

        assert_eq!(source.topic_label(), "Environment");
        assert_eq!(source.entities.len(), 2);
        assert!(source.entities.contains("City X"));
    }

    #[test]
    fn test_default_topic() {
        let source = Source::from_page(page(), Rating::Unrated);
        assert_eq!(source.topic_label(), DEFAULT_TOPIC);
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            ExtractionFailure::Paywalled { status: 402 }.to_string(),
            "access denied (HTTP 402)"
        );
    }
}
