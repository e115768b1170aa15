//! Answer module - the verdict returned for a claim

use crate::claim::ClaimId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stance the evidence takes on the claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Articles support the claim
    Confirm,
    /// Articles contradict the claim
    Refute,
    /// Articles do not settle it either way
    Abstain,
}

impl Verdict {
    /// Lenient parse of a model-produced label
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirm" | "confirmed" | "true" | "supported" => Some(Self::Confirm),
            "refute" | "refuted" | "false" | "contradicted" => Some(Self::Refute),
            "abstain" | "unverified" | "unknown" | "insufficient" => Some(Self::Abstain),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Confirm => "confirm",
            Self::Refute => "refute",
            Self::Abstain => "abstain",
        };
        f.write_str(label)
    }
}

/// Reference to an article the answer relies on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Article URL, always one of the accepted sources
    pub url: String,
    /// Article title as ingested
    pub title: String,
}

/// How the answer was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The model produced a grounded verdict
    Answered,
    /// No usable evidence; verdict is always `Abstain` with no citations
    InsufficientEvidence,
}

/// Final answer for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Claim this answers
    pub claim_id: ClaimId,
    /// Confirm, refute or abstain
    pub verdict: Verdict,
    /// Natural-language explanation
    pub explanation: String,
    /// Cited articles
    pub citations: Vec<Citation>,
    /// Optional Graphviz rendering of the retrieved subgraph
    pub diagram: Option<String>,
    /// Whether evidence was available
    pub outcome: Outcome,
    /// Unix seconds
    pub created_at: u64,
}

impl Answer {
    /// Grounded answer produced by the model
    pub fn answered(
        claim_id: ClaimId,
        verdict: Verdict,
        explanation: impl Into<String>,
        citations: Vec<Citation>,
    ) -> Self {
        Self {
            claim_id,
            verdict,
            explanation: explanation.into(),
            citations,
            diagram: None,
            outcome: Outcome::Answered,
            created_at: now_secs(),
        }
    }

    /// Abstention when nothing survived filtering or retrieval
    pub fn insufficient_evidence(claim_id: ClaimId) -> Self {
        Self {
            claim_id,
            verdict: Verdict::Abstain,
            explanation: "No reliable sources were found to verify this claim.".to_string(),
            citations: Vec::new(),
            diagram: None,
            outcome: Outcome::InsufficientEvidence,
            created_at: now_secs(),
        }
    }

    /// Attach a rendered diagram
    pub fn with_diagram(mut self, diagram: impl Into<String>) -> Self {
        self.diagram = Some(diagram.into());
        self
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
