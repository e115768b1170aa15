//! Retrieval-augmented verdict generation

use crate::config::SynthesizerConfig;
use crate::parser::{parse_verdict, GeneratedVerdict};
use crate::prompt::{VerdictPromptBuilder, VERDICT_SCHEMA};
use crate::SynthesizerError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use veritas_domain::{Answer, Citation, Claim, EmbeddingModel, LlmProvider, ServiceError};
use veritas_graph::{render_dot, retrieve, ActiveClaim, RetrievedContext};

/// Answers a claim from the graph held by an [`ActiveClaim`]
///
/// Every citation in a returned answer names an article from the retrieved
/// context. An answer that cites anything else, or cannot be parsed, gets
/// `max_reprompts` more attempts before the run fails.
#[derive(Clone)]
pub struct QueryEngine {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingModel>,
    config: SynthesizerConfig,
}

impl QueryEngine {
    /// Create an engine
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingModel>,
        config: SynthesizerConfig,
    ) -> Result<Self, SynthesizerError> {
        config.validate()?;
        Ok(Self {
            llm,
            embedder,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Produce the answer for `claim`
    ///
    /// An empty graph yields an insufficient-evidence abstention without
    /// calling the generation model.
    pub async fn answer(&self, claim: &Claim, active: &ActiveClaim) -> Result<Answer, SynthesizerError> {
        let started = Instant::now();
        let statement = claim.statement();

        let query = match tokio::time::timeout(self.config.embed_timeout(), self.embedder.embed(statement)).await {
            Ok(result) => result.map_err(SynthesizerError::EmbeddingUnavailable)?,
            Err(_) => {
                return Err(SynthesizerError::EmbeddingUnavailable(ServiceError::Timeout(
                    "embedding the claim".to_string(),
                )))
            }
        };

        let context = retrieve(active.store(), &query, self.config.top_k, self.config.excerpt_chars).await?;
        if context.is_empty() {
            info!("No context for claim {}; abstaining", claim.id);
            return Ok(Answer::insufficient_evidence(claim.id));
        }

        let (generated, citations) = self.generate_grounded(statement, &context).await?;

        let mut answer = Answer::answered(claim.id, generated.verdict, generated.explanation, citations);
        if self.config.render_diagram {
            answer = answer.with_diagram(render_dot(&context));
        }

        info!(
            "Claim {} answered '{}' with {} citations in {:?}",
            claim.id,
            answer.verdict,
            answer.citations.len(),
            started.elapsed()
        );
        Ok(answer)
    }

    async fn generate_grounded(
        &self,
        statement: &str,
        context: &RetrievedContext,
    ) -> Result<(GeneratedVerdict, Vec<Citation>), SynthesizerError> {
        let mut correction: Option<String> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut builder = VerdictPromptBuilder::new(statement, context);
            if let Some(c) = correction.take() {
                builder = builder.with_correction(c);
            }
            let response = self.generate(&builder.build()).await?;

            let failure = match parse_verdict(&response) {
                Ok(generated) => match ground(&generated.citations, context) {
                    Ok(citations) => return Ok((generated, citations)),
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if attempt > self.config.max_reprompts {
                warn!("Giving up after {} attempts: {}", attempt, failure);
                return Err(failure);
            }
            warn!("Re-prompting after rejected answer: {}", failure);
            correction = Some(match &failure {
                SynthesizerError::GroundingViolation { cited } => format!(
                    "it cited {} which are not in the source list. Cite only the URLs listed above.",
                    cited.join(", ")
                ),
                _ => "it was not a valid JSON object in the required format.".to_string(),
            });
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, SynthesizerError> {
        debug!("Generation prompt: {} chars", prompt.len());
        match tokio::time::timeout(
            self.config.generation_timeout(),
            self.llm.generate_structured(prompt, VERDICT_SCHEMA),
        )
        .await
        {
            Ok(result) => result.map_err(SynthesizerError::GenerationUnavailable),
            Err(_) => Err(SynthesizerError::GenerationUnavailable(ServiceError::Timeout(
                "verdict generation".to_string(),
            ))),
        }
    }
}

/// Map model references onto context articles
///
/// Duplicates collapse; any reference outside the context is a
/// [`SynthesizerError::GroundingViolation`].
pub fn ground(references: &[String], context: &RetrievedContext) -> Result<Vec<Citation>, SynthesizerError> {
    let mut citations: Vec<Citation> = Vec::new();
    let mut ungrounded = Vec::new();

    for reference in references {
        match context.find(reference) {
            Some(article) => {
                if !citations.iter().any(|c| c.url == article.url) {
                    citations.push(Citation {
                        url: article.url.clone(),
                        title: article.title.clone(),
                    });
                }
            }
            None => ungrounded.push(reference.clone()),
        }
    }

    if ungrounded.is_empty() {
        Ok(citations)
    } else {
        Err(SynthesizerError::GroundingViolation { cited: ungrounded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_graph::ContextArticle;

    fn context() -> RetrievedContext {
        let article = |url: &str, title: &str| ContextArticle {
            url: url.to_string(),
            title: title.to_string(),
            site: None,
            topics: vec![],
            entities: vec![],
            excerpt: String::new(),
            score: 1.0,
        };
        RetrievedContext {
            articles: vec![article("https://a.com/1", "One"), article("https://b.com/2", "Two")],
        }
    }

    #[test]
    fn test_ground_dedupes_and_accepts_titles() {
        let refs = vec![
            "https://a.com/1".to_string(),
            "one".to_string(),
            "https://b.com/2/".to_string(),
        ];
        let citations = ground(&refs, &context()).unwrap();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "One");
    }

    #[test]
    fn test_ground_reports_every_stray_reference() {
        let refs = vec![
            "https://a.com/1".to_string(),
            "https://x.com".to_string(),
            "Three".to_string(),
        ];
        assert_eq!(
            ground(&refs, &context()),
            Err(SynthesizerError::GroundingViolation {
                cited: vec!["https://x.com".to_string(), "Three".to_string()]
            })
        );
    }
}
