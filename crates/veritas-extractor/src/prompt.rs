//! LLM prompts for preprocessing

/// Search-keyword title for a claim
pub fn claim_title_prompt(claim: &str, max_chars: usize) -> String {
    format!(
        "You are a news summarizer. Write one line containing the most important keywords \
         needed to find news about the following claim with a web search engine. \
         Use at most {} characters. Output only the keywords, without quotation marks.\n\n\
         Claim: {}",
        max_chars,
        claim.trim()
    )
}

/// One-sentence neutral restatement of a claim
pub fn claim_summary_prompt(claim: &str, max_chars: usize) -> String {
    format!(
        "Restate the following claim as one neutral, self-contained sentence of at most {} \
         characters. Keep every name, number and date. Output only the sentence.\n\n\
         Claim: {}",
        max_chars,
        claim.trim()
    )
}

/// Shorter version of an article body
pub fn source_summary_prompt(body: &str, max_chars: usize) -> String {
    format!(
        "Summarize the following news article in at most {} characters. Keep every person, \
         organization, place and date it mentions. Output only the summary.\n\n---\n{}\n---",
        max_chars,
        body.trim()
    )
}

/// Topic and named entities of a text
pub fn ner_prompt(text: &str) -> String {
    format!(
        "You are a named-entity recognition model. Extract the main topic and the named \
         entities (people, organizations, places, events) from the text below.\n\
         The output must be strictly formatted as: \
         {{\"topic\": \"Technology\", \"entities\": [\"Elon Musk\", \"SpaceX\", \"Paris\"]}}\n\n\
         Text:\n---\n{}\n---",
        text.trim()
    )
}

/// Map each surface form to one unified name
pub fn alias_prompt(entities: &[String]) -> String {
    let listed = entities
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Normalize the following entity names. When several names refer to the same \
         real-world entity (variations, synonyms, acronyms, titles), map all of them to the \
         most common or widely recognized name. Names that need no change map to themselves.\n\
         Return a JSON object whose keys are exactly the names below and whose values are the \
         unified names. Do not add any other text.\n\
         Example: {{\"USA\": \"United States\", \"U.S.\": \"United States\", \"Paris\": \"Paris\"}}\n\n\
         Names:\n{}",
        listed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ner_prompt_contains_format_and_text() {
        let prompt = ner_prompt("  Tesla opened a factory in Berlin. ");
        assert!(prompt.contains("\"topic\""));
        assert!(prompt.contains("---\nTesla opened a factory in Berlin.\n---"));
    }

    #[test]
    fn test_alias_prompt_lists_every_name() {
        let prompt = alias_prompt(&["USA".to_string(), "US".to_string()]);
        assert!(prompt.contains("- USA\n- US"));
    }

    #[test]
    fn test_title_prompt_mentions_limit() {
        assert!(claim_title_prompt("x", 150).contains("at most 150 characters"));
    }
}
