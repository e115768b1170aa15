//! Claim preprocessing and source annotation

use crate::config::PreprocessConfig;
use crate::error::ExtractorError;
use crate::parser::{clean_title, parse_annotation, Annotation};
use crate::prompt;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use veritas_domain::source::DEFAULT_TOPIC;
use veritas_domain::{LlmProvider, Source};

/// Title and summary derived from a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedClaim {
    /// Search-keyword title, used as the web search query
    pub title: String,
    /// One-sentence statement, used as the claim for correlation and generation
    pub summary: String,
}

/// Outcome of annotating a batch of sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Sources that received a topic from the model
    pub annotated: usize,
    /// Sources left with the default topic and no entities
    pub fallbacks: usize,
    /// Sources whose body was replaced by a summary
    pub summarized: usize,
}

/// Runs the LLM preprocessing steps around the funnel
#[derive(Clone)]
pub struct Preprocessor {
    llm: Arc<dyn LlmProvider>,
    config: PreprocessConfig,
    limiter: Option<Arc<Semaphore>>,
}

impl Preprocessor {
    /// Create a preprocessor
    pub fn new(llm: Arc<dyn LlmProvider>, config: PreprocessConfig) -> Self {
        Self {
            llm,
            config,
            limiter: None,
        }
    }

    /// Hold a permit from `limiter` for every LLM call
    ///
    /// Sharing the source funnel's limiter caps outbound calls across all
    /// claims in flight; without one only `annotate_concurrency` bounds a
    /// single claim.
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    async fn call_llm(&self, prompt: &str) -> Result<String, ExtractorError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .acquire()
                    .await
                    .map_err(|_| ExtractorError::Config("concurrency limiter closed".to_string()))?,
            ),
            None => None,
        };
        tokio::time::timeout(self.config.llm_timeout(), self.llm.generate(prompt))
            .await
            .map_err(|_| ExtractorError::Timeout)?
            .map_err(ExtractorError::from)
    }

    /// Derive a search title and a summary for `text`
    ///
    /// Blank model output falls back to the raw text. Provider failures are
    /// errors: without a title there is nothing to search for.
    pub async fn preprocess_claim(&self, text: &str) -> Result<PreprocessedClaim, ExtractorError> {
        let raw = text.trim();
        let fallback_title: String = raw.chars().take(self.config.max_title_chars).collect();

        if !self.config.summarize_claims {
            return Ok(PreprocessedClaim {
                title: fallback_title,
                summary: raw.to_string(),
            });
        }

        info!("Starting claim preprocessing");
        let title_response = self
            .call_llm(&prompt::claim_title_prompt(raw, self.config.max_title_chars))
            .await?;
        let mut title = clean_title(&title_response, self.config.max_title_chars);
        if title.is_empty() {
            warn!("Empty title from model; using claim text");
            title = fallback_title;
        }

        let summary_response = self
            .call_llm(&prompt::claim_summary_prompt(raw, self.config.max_summary_chars))
            .await?;
        let summary = match summary_response.trim() {
            "" => raw.to_string(),
            s => s.chars().take(self.config.max_summary_chars).collect(),
        };

        debug!("Claim title: {:?}, summary: {:?}", title, summary);
        Ok(PreprocessedClaim { title, summary })
    }

    /// Attach topic and entities to every source
    ///
    /// Failures are per source: that source keeps its body and gets the
    /// default topic with no entities.
    pub async fn annotate_sources(&self, sources: &mut [Source]) -> AnnotationReport {
        let started = Instant::now();
        let mut report = AnnotationReport::default();
        if sources.is_empty() {
            return report;
        }

        let jobs = sources
            .iter()
            .enumerate()
            .map(|(idx, source)| {
                let body = source.body.clone();
                async move { (idx, self.annotate_one(body).await) }
            })
            .collect::<Vec<_>>();
        let results: Vec<_> = stream::iter(jobs)
            .buffer_unordered(self.config.annotate_concurrency)
            .collect()
            .await;

        for (idx, (summary, annotation)) in results {
            let Some(source) = sources.get_mut(idx) else {
                continue;
            };
            if let Some(summary) = summary {
                source.body = summary;
                report.summarized += 1;
            }
            match annotation {
                Some(Annotation {
                    topic: Some(topic),
                    entities,
                }) => {
                    source.annotate(topic, entities);
                    report.annotated += 1;
                }
                Some(Annotation {
                    topic: None,
                    entities,
                }) => {
                    source.annotate(DEFAULT_TOPIC, entities);
                    report.fallbacks += 1;
                }
                None => {
                    source.annotate(DEFAULT_TOPIC, Vec::<String>::new());
                    report.fallbacks += 1;
                }
            }
        }

        info!(
            "Annotated {} sources ({} fallbacks) in {:?}",
            report.annotated,
            report.fallbacks,
            started.elapsed()
        );
        report
    }

    async fn annotate_one(&self, body: String) -> (Option<String>, Option<Annotation>) {
        let summary = if self.config.summarize_sources {
            let prompt = prompt::source_summary_prompt(&body, self.config.max_source_summary_chars);
            match self.call_llm(&prompt).await {
                Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Ok(_) => None,
                Err(e) => {
                    warn!("Source summarization failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if !self.config.ner_enabled {
            return (summary, None);
        }

        let text: String = summary
            .as_deref()
            .unwrap_or(&body)
            .chars()
            .take(self.config.ner_input_chars)
            .collect();
        let annotation = match self.call_llm(&prompt::ner_prompt(&text)).await {
            Ok(response) => match parse_annotation(&response) {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    warn!("Unparseable NER response: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("NER call failed: {}", e);
                None
            }
        };
        (summary, annotation)
    }
}
