//! Claim module - the statement under verification and the sources gathered for it

use crate::source::Source;
use crate::validation::ClaimText;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a claim based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, which the history
/// store relies on for "most recent first" listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(uuid::Uuid);

impl ClaimId {
    /// Generate a new UUIDv7-based ClaimId
    ///
    /// # Examples
    ///
    /// ```
    /// use veritas_domain::ClaimId;
    ///
    /// let id = ClaimId::new();
    /// assert!(id.timestamp() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a ClaimId from its string form
    ///
    /// # Examples
    ///
    /// ```
    /// use veritas_domain::ClaimId;
    ///
    /// let id = ClaimId::new();
    /// let parsed = ClaimId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid UUIDv7 string: {}", e))
    }

    /// Get the timestamp component of the UUIDv7 (milliseconds since Unix epoch)
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0.as_u128() >> 80) as u64
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when a claim is mutated out of turn
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    /// The claim already has an answer attached for this run
    #[error("Claim {0} is sealed; an answer is already attached")]
    Sealed(ClaimId),
}

/// A claim submitted for verification
///
/// Created when a user submits text. Only preprocessing (title/summary) and
/// source acceptance mutate it; once an answer is attached the claim is sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// Raw text as submitted
    pub text: String,

    /// Concise title, used as the web search query
    pub title: String,

    /// Summary, used as the statement handed to generation
    pub summary: String,

    sources: Vec<Source>,

    #[serde(default)]
    sealed: bool,
}

impl Claim {
    /// Create a new claim from validated input
    ///
    /// Title and summary start out as the raw text until preprocessing runs.
    pub fn new(text: ClaimText) -> Self {
        let text = text.into_inner();
        Self {
            id: ClaimId::new(),
            title: text.clone(),
            summary: text.clone(),
            text,
            sources: Vec::new(),
            sealed: false,
        }
    }

    /// Record the preprocessing output
    pub fn set_preprocessed(
        &mut self,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<(), ClaimError> {
        self.ensure_open()?;
        self.title = title.into();
        self.summary = summary.into();
        Ok(())
    }

    /// Attach an accepted source
    ///
    /// Returns `Ok(false)` when a source with the same domain and URL is
    /// already attached.
    pub fn accept_source(&mut self, source: Source) -> Result<bool, ClaimError> {
        self.ensure_open()?;
        let key = source.key();
        if self.sources.iter().any(|s| s.key() == key) {
            return Ok(false);
        }
        self.sources.push(source);
        Ok(true)
    }

    /// Accepted sources in acceptance order
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// The statement that generation should classify
    pub fn statement(&self) -> &str {
        if self.summary.trim().is_empty() {
            &self.text
        } else {
            &self.summary
        }
    }

    /// Mark the claim immutable for the rest of this run
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether an answer has been attached
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn ensure_open(&self) -> Result<(), ClaimError> {
        if self.sealed {
            Err(ClaimError::Sealed(self.id))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::Rating;

    fn source(url: &str) -> Source {
        Source::from_page(
            crate::source::ExtractedPage {
                url: url.to_string(),
                domain: "news.example".to_string(),
                title: "Title".to_string(),
                body: "Body".to_string(),
            },
            Rating::Unrated,
        )
    }

    fn claim() -> Claim {
        Claim::new(ClaimText::parse("City X banned plastic bags in 2024", 800).unwrap())
    }

    #[test]
    fn test_claim_id_chronological() {
        let id1 = ClaimId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ClaimId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should be less than later UUIDv7");
        assert!(id1.timestamp() <= id2.timestamp());
    }

    #[test]
    fn test_claim_id_invalid_string() {
        assert!(ClaimId::from_string("not-a-valid-uuid").is_err());
        assert!(ClaimId::from_string("").is_err());
    }

    #[test]
    fn test_new_claim_defaults_title_and_summary() {
        let claim = claim();
        assert_eq!(claim.title, claim.text);
        assert_eq!(claim.statement(), "City X banned plastic bags in 2024");
        assert!(claim.sources().is_empty());
    }

    #[test]
    fn test_accept_source_dedupes_by_key() {
        let mut claim = claim();
        assert!(claim.accept_source(source("https://news.example/a")).unwrap());
        assert!(!claim.accept_source(source("https://news.example/a")).unwrap());
        assert!(claim.accept_source(source("https://news.example/b")).unwrap());
        assert_eq!(claim.sources().len(), 2);
    }

    #[test]
    fn test_sealed_claim_rejects_mutation() {
        let mut claim = claim();
        claim.seal();

        assert_eq!(
            claim.set_preprocessed("t", "s"),
            Err(ClaimError::Sealed(claim.id))
        );
        assert!(claim.accept_source(source("https://news.example/a")).is_err());
    }

    #[test]
    fn test_blank_summary_falls_back_to_text() {
        let mut claim = claim();
        claim.set_preprocessed("title", "   ").unwrap();
        assert_eq!(claim.statement(), claim.text);
    }
}
