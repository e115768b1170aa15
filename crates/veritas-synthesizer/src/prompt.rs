//! Verdict prompt construction

use veritas_graph::RetrievedContext;

/// Builds the generation prompt for one claim
pub struct VerdictPromptBuilder<'a> {
    claim: &'a str,
    context: &'a RetrievedContext,
    correction: Option<String>,
}

impl<'a> VerdictPromptBuilder<'a> {
    /// Prompt for `claim` over `context`
    pub fn new(claim: &'a str, context: &'a RetrievedContext) -> Self {
        Self {
            claim,
            context,
            correction: None,
        }
    }

    /// Tell the model what was wrong with its previous answer
    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(VERDICT_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Sources:\n");
        for (idx, article) in self.context.articles.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", idx + 1, article.title));
            prompt.push_str(&format!("URL: {}\n", article.url));
            if let Some(site) = &article.site {
                prompt.push_str(&format!("Site: {}\n", site));
            }
            if !article.topics.is_empty() {
                prompt.push_str(&format!("Topics: {}\n", article.topics.join(", ")));
            }
            if !article.entities.is_empty() {
                prompt.push_str(&format!("Mentions: {}\n", article.entities.join(", ")));
            }
            prompt.push_str(&format!("Excerpt: {}\n\n", article.excerpt.trim()));
        }

        prompt.push_str(&format!("Claim: {}\n\n", self.claim.trim()));

        if let Some(correction) = &self.correction {
            prompt.push_str("Your previous answer was rejected: ");
            prompt.push_str(correction);
            prompt.push_str("\n\n");
        }

        prompt.push_str(OUTPUT_FORMAT);
        prompt
    }
}

const VERDICT_INSTRUCTIONS: &str = r#"You are a fact-checking assistant. Decide whether the sources below confirm or refute the claim.

Rules:
- Use only the sources listed below, never outside knowledge
- "confirm": the sources support the claim
- "refute": the sources contradict the claim
- "abstain": the sources do not settle the claim either way
- Cite only sources from the list, by their exact URL
- Cite every source your explanation relies on"#;

const OUTPUT_FORMAT: &str = r#"Output format (JSON object only, no additional text):
{
  "verdict": "confirm" | "refute" | "abstain",
  "explanation": "two or three sentences",
  "citations": ["https://..."]
}"#;

/// JSON schema handed to providers that support structured output
pub const VERDICT_SCHEMA: &str = r#"{"type":"object","properties":{"verdict":{"type":"string","enum":["confirm","refute","abstain"]},"explanation":{"type":"string"},"citations":{"type":"array","items":{"type":"string"}}},"required":["verdict","explanation","citations"]}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_graph::ContextArticle;

    fn context() -> RetrievedContext {
        RetrievedContext {
            articles: vec![ContextArticle {
                url: "https://daily.example/bag-ban".to_string(),
                title: "City X bans plastic bags".to_string(),
                site: Some("daily.example".to_string()),
                topics: vec!["Environment".to_string()],
                entities: vec!["City X".to_string()],
                excerpt: "The council voted...".to_string(),
                score: 0.9,
            }],
        }
    }

    #[test]
    fn test_prompt_lists_context_and_claim() {
        let context = context();
        let prompt = VerdictPromptBuilder::new("City X banned plastic bags", &context).build();

        assert!(prompt.contains("[1] City X bans plastic bags"));
        assert!(prompt.contains("URL: https://daily.example/bag-ban"));
        assert!(prompt.contains("Mentions: City X"));
        assert!(prompt.contains("Claim: City X banned plastic bags"));
        assert!(!prompt.contains("previous answer"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let context = context();
        let a = VerdictPromptBuilder::new("claim", &context).build();
        let b = VerdictPromptBuilder::new("claim", &context).build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_correction_included() {
        let context = context();
        let prompt = VerdictPromptBuilder::new("claim", &context)
            .with_correction("it cited https://elsewhere.example")
            .build();
        assert!(prompt.contains("Your previous answer was rejected: it cited https://elsewhere.example"));
    }
}
