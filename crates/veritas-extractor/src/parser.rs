//! Parse LLM output into annotations and alias groups

use crate::error::ExtractorError;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;
use veritas_domain::AliasGroup;

/// Topic and entities produced by NER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Main topic, if the model gave one
    pub topic: Option<String>,
    /// Entity surface forms, trimmed and deduplicated in order
    pub entities: Vec<String>,
}

/// Extract JSON from response, handling markdown code blocks and chatter
///
/// # Examples
///
/// ```
/// use veritas_extractor::extract_json;
///
/// let raw = "```json\n{\"topic\": \"Politics\"}\n```";
/// assert_eq!(extract_json(raw).unwrap(), "{\"topic\": \"Politics\"}");
/// ```
pub fn extract_json(response: &str) -> Result<String, ExtractorError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(ExtractorError::InvalidFormat("Empty code block".to_string()));
        }
        // Skip the opening fence and, if present, the closing one
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        return Ok(lines[1..end].join("\n").trim().to_string());
    }

    // Prose around a single object: keep the outermost braces
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            Ok(trimmed[start..=end].to_string())
        }
        _ => Ok(trimmed.to_string()),
    }
}

/// Parse an NER response of the form `{"topic": ..., "entities": [...]}`
pub fn parse_annotation(response: &str) -> Result<Annotation, ExtractorError> {
    let json: Value = serde_json::from_str(&extract_json(response)?)?;
    let obj = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    let topic = obj
        .get("topic")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut entities: Vec<String> = Vec::new();
    if let Some(list) = obj.get("entities").and_then(Value::as_array) {
        for item in list {
            match item.as_str().map(str::trim) {
                Some(name) if !name.is_empty() => {
                    if !entities.iter().any(|e| e == name) {
                        entities.push(name.to_string());
                    }
                }
                Some(_) => {}
                None => warn!("Ignoring non-string entity: {}", item),
            }
        }
    }

    Ok(Annotation { topic, entities })
}

/// Turn a `{surface: unified}` object into alias groups covering every input
///
/// Names missing from the response, or mapped to a blank value, keep their
/// surface form as their own canonical name.
pub fn parse_alias_map(
    response: &str,
    entities: &[String],
) -> Result<Vec<AliasGroup>, ExtractorError> {
    let json: Value = serde_json::from_str(&extract_json(response)?)?;
    let mapping = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for surface in entities {
        let unified = mapping
            .get(surface)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(surface.as_str())
            .to_string();
        groups.entry(unified).or_default().push(surface.clone());
    }

    Ok(groups
        .into_iter()
        .map(|(canonical, aliases)| AliasGroup { canonical, aliases })
        .collect())
}

/// Tidy a generated title: first line, no list/quote markers, bounded length
pub fn clean_title(raw: &str, max_chars: usize) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let stripped = line
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•' | '#' | '>') || c.is_whitespace())
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();
    stripped.chars().take(max_chars).collect()
}
