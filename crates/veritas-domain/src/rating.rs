//! Reliability rating - tagged result of a credibility lookup

use serde::{Deserialize, Serialize};

/// Reliability of a publishing domain
///
/// A missing rating is an explicit `Unrated`, never a defaulted score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Rating {
    /// The rating service knows this domain
    Rated {
        /// Trust tier reported by the service (e.g. "T" for trusted)
        rank: String,
        /// Numeric score, 0-100
        score: f64,
    },

    /// No rating exists for this domain
    Unrated,
}

impl Rating {
    /// Whether this rating is in an accepted tier and meets the score floor
    ///
    /// `Unrated` never passes.
    ///
    /// # Examples
    ///
    /// ```
    /// use veritas_domain::Rating;
    ///
    /// let tiers = vec!["T".to_string()];
    /// let rating = Rating::Rated { rank: "T".into(), score: 87.5 };
    /// assert!(rating.passes(&tiers, 70.0));
    /// assert!(!Rating::Unrated.passes(&tiers, 0.0));
    /// ```
    pub fn passes(&self, accepted_ranks: &[String], min_score: f64) -> bool {
        match self {
            Rating::Rated { rank, score } => {
                accepted_ranks.iter().any(|r| r.eq_ignore_ascii_case(rank)) && *score >= min_score
            }
            Rating::Unrated => false,
        }
    }

    /// Score if rated
    pub fn score(&self) -> Option<f64> {
        match self {
            Rating::Rated { score, .. } => Some(*score),
            Rating::Unrated => None,
        }
    }
}
