//! Verdict response parsing

use crate::SynthesizerError;
use serde::Deserialize;
use veritas_domain::Verdict;
use veritas_extractor::extract_json;

/// Verdict as the model stated it, before grounding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVerdict {
    /// Parsed verdict label
    pub verdict: Verdict,
    /// Explanation text
    pub explanation: String,
    /// References as written by the model
    pub citations: Vec<String>,
}

#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    citations: Vec<String>,
}

/// Parse a generation response
pub fn parse_verdict(response: &str) -> Result<GeneratedVerdict, SynthesizerError> {
    let json = extract_json(response).map_err(|e| SynthesizerError::InvalidResponse(e.to_string()))?;
    let raw: RawVerdict =
        serde_json::from_str(&json).map_err(|e| SynthesizerError::InvalidResponse(e.to_string()))?;

    let verdict = Verdict::parse(&raw.verdict).ok_or_else(|| {
        SynthesizerError::InvalidResponse(format!("unknown verdict '{}'", raw.verdict))
    })?;

    Ok(GeneratedVerdict {
        verdict,
        explanation: raw.explanation.trim().to_string(),
        citations: raw
            .citations
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    })
}
