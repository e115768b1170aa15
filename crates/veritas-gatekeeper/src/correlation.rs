//! LLM correlation judge: is this article about the claim?

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use veritas_domain::{Judge, LlmProvider, Relevance, RelevanceQuery, ServiceError};

/// Default characters of article body included in the prompt
pub const DEFAULT_BODY_CHARS: usize = 2_000;

/// Build the relevance prompt
///
/// The prompt is a pure function of its inputs so identical claim and
/// article text always produce the identical request.
pub fn build_correlation_prompt(query: &RelevanceQuery, body_chars: usize) -> String {
    let body: String = query.body.chars().take(body_chars).collect();
    format!(
        "You decide whether a news article is relevant to a claim being fact-checked.\n\
         An article is relevant if it reports on the same event, person, policy or statistic \
         the claim is about, whether it supports or contradicts the claim.\n\n\
         Claim: {}\n\n\
         Article title: {}\n\
         Article text:\n{}\n\n\
         Answer with exactly one word: YES if the article is relevant, NO otherwise.",
        query.claim.trim(),
        query.title.trim(),
        body.trim()
    )
}

/// Read a YES/NO answer, tolerating case, punctuation and trailing text
pub fn parse_relevance(response: &str) -> Option<Relevance> {
    let first = response
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())?
        .to_ascii_uppercase();
    match first.as_str() {
        "YES" | "RELEVANT" => Some(Relevance::Relevant),
        "NO" | "IRRELEVANT" => Some(Relevance::Irrelevant),
        _ => None,
    }
}

/// Correlation judge backed by a generation model
#[derive(Clone)]
pub struct LlmCorrelationJudge {
    llm: Arc<dyn LlmProvider>,
    body_chars: usize,
}

impl LlmCorrelationJudge {
    /// Judge using `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            body_chars: DEFAULT_BODY_CHARS,
        }
    }

    /// Characters of article body shown to the model
    pub fn with_body_chars(mut self, body_chars: usize) -> Self {
        self.body_chars = body_chars;
        self
    }
}

#[async_trait]
impl Judge<RelevanceQuery> for LlmCorrelationJudge {
    type Verdict = Relevance;

    async fn judge(&self, input: &RelevanceQuery) -> Result<Relevance, ServiceError> {
        let prompt = build_correlation_prompt(input, self.body_chars);
        let response = self.llm.generate(&prompt).await?;
        debug!("Correlation verdict for {:?}: {:?}", input.title, response.trim());
        parse_relevance(&response).ok_or_else(|| {
            ServiceError::InvalidResponse(format!("expected YES or NO, got {:?}", response.trim()))
        })
    }
}
