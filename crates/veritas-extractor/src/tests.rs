//! Preprocessing flows against the mock provider

use crate::{LlmEntityResolver, PreprocessConfig, Preprocessor};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use veritas_domain::source::DEFAULT_TOPIC;
use veritas_domain::{
    EntityRegistry, ExtractedPage, Judge, LlmProvider, Rating, ServiceError, Source,
};
use veritas_llm::MockProvider;

const CLAIM: &str = "City X banned plastic bags in 2024";

fn source(url: &str, body: &str) -> Source {
    Source::from_page(
        ExtractedPage {
            url: url.to_string(),
            domain: "example.com".to_string(),
            title: "Title".to_string(),
            body: body.to_string(),
        },
        Rating::Unrated,
    )
}

#[tokio::test]
async fn test_preprocess_claim_title_and_summary() {
    let mut llm = MockProvider::default();
    llm.add_response_containing("keywords", "- \"City X plastic bag ban 2024\"");
    llm.add_response_containing("Restate", "City X banned single-use plastic bags in 2024.");

    let preprocessor = Preprocessor::new(Arc::new(llm), PreprocessConfig::default());
    let claim = preprocessor.preprocess_claim(CLAIM).await.unwrap();

    assert_eq!(claim.title, "City X plastic bag ban 2024");
    assert_eq!(claim.summary, "City X banned single-use plastic bags in 2024.");
}

#[tokio::test]
async fn test_blank_responses_fall_back_to_raw_text() {
    let llm = MockProvider::new("   ");
    let preprocessor = Preprocessor::new(Arc::new(llm), PreprocessConfig::default());
    let claim = preprocessor.preprocess_claim(CLAIM).await.unwrap();

    assert_eq!(claim.title, CLAIM);
    assert_eq!(claim.summary, CLAIM);
}

#[tokio::test]
async fn test_passthrough_makes_no_calls() {
    let llm = MockProvider::new("unused");
    let preprocessor = Preprocessor::new(Arc::new(llm.clone()), PreprocessConfig::passthrough());
    let claim = preprocessor.preprocess_claim(CLAIM).await.unwrap();

    assert_eq!(claim.title, CLAIM);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_preprocess_claim_provider_failure_is_error() {
    let mut llm = MockProvider::default();
    llm.add_error_containing("keywords");
    let preprocessor = Preprocessor::new(Arc::new(llm), PreprocessConfig::default());

    assert!(preprocessor.preprocess_claim(CLAIM).await.is_err());
}

#[tokio::test]
async fn test_annotate_sources_with_fallback() {
    let mut llm = MockProvider::default();
    llm.add_response_containing(
        "plastic",
        r#"```json
{"topic": "Environment", "entities": ["City X", "City Council"]}
```"#,
    );
    llm.add_response_containing("football", "not json at all");

    let preprocessor = Preprocessor::new(Arc::new(llm), PreprocessConfig::default());
    let mut sources = vec![
        source("https://a.com/1", "The council of City X banned plastic bags."),
        source("https://b.com/2", "Weekend football results."),
    ];
    let report = preprocessor.annotate_sources(&mut sources).await;

    assert_eq!(report.annotated, 1);
    assert_eq!(report.fallbacks, 1);
    assert_eq!(sources[0].topic_label(), "Environment");
    assert_eq!(sources[0].entities.len(), 2);
    assert_eq!(sources[1].topic_label(), DEFAULT_TOPIC);
    assert!(sources[1].entities.is_empty());
}

#[tokio::test]
async fn test_annotate_with_source_summaries() {
    let mut llm = MockProvider::default();
    llm.add_response_containing("Summarize the following news article", "Short summary.");
    llm.add_response_containing("named-entity", r#"{"topic": "News", "entities": []}"#);

    let config = PreprocessConfig {
        summarize_sources: true,
        ..PreprocessConfig::default()
    };
    let preprocessor = Preprocessor::new(Arc::new(llm), config);
    let mut sources = vec![source("https://a.com/1", "A very long article body.")];
    let report = preprocessor.annotate_sources(&mut sources).await;

    assert_eq!(report.summarized, 1);
    assert_eq!(sources[0].body, "Short summary.");
    assert_eq!(sources[0].topic_label(), "News");
}

#[tokio::test]
async fn test_resolver_groups_aliases() {
    let llm = MockProvider::new(
        r#"{"Donald Trump": "Donald Trump", "President Trump": "Donald Trump", "Paris": "Paris"}"#,
    );
    let resolver = LlmEntityResolver::new(Arc::new(llm));
    let names = vec![
        "President Trump".to_string(),
        "Donald Trump".to_string(),
        "Paris".to_string(),
    ];
    let groups = resolver.judge(names.as_slice()).await.unwrap();

    let mut registry = EntityRegistry::new();
    registry.merge_all(&groups);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.resolve("President Trump"), Some("Donald Trump"));
}

#[tokio::test]
async fn test_resolver_falls_back_to_identity() {
    let mut llm = MockProvider::default();
    llm.add_error_containing("Normalize");
    let resolver = LlmEntityResolver::new(Arc::new(llm));
    let names = vec!["USA".to_string(), "United States".to_string()];

    let groups = resolver.judge(names.as_slice()).await.unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.aliases == [g.canonical.clone()]));
}

#[tokio::test]
async fn test_resolver_skips_llm_for_single_name() {
    let llm = MockProvider::new("{}");
    let resolver = LlmEntityResolver::new(Arc::new(llm.clone()));
    let groups = resolver.judge(&["Paris".to_string()][..]).await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(llm.call_count(), 0);
}

/// Slow model that records the most calls it ever saw at once
#[derive(Default)]
struct PeakTracker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl LlmProvider for PeakTracker {
    async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(r#"{"topic": "Environment", "entities": []}"#.to_string())
    }

    async fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, ServiceError> {
        self.generate(prompt).await
    }
}

#[tokio::test]
async fn test_shared_limiter_caps_calls_across_claims() {
    let llm = Arc::new(PeakTracker::default());
    let limiter = Arc::new(Semaphore::new(2));
    let config = PreprocessConfig {
        annotate_concurrency: 4,
        ..PreprocessConfig::default()
    };
    let first = Preprocessor::new(llm.clone(), config.clone()).with_limiter(Arc::clone(&limiter));
    let second = Preprocessor::new(llm.clone(), config).with_limiter(limiter);

    let batch = || {
        (0..4)
            .map(|i| source(&format!("https://a.com/{}", i), "plastic"))
            .collect::<Vec<_>>()
    };
    let mut a = batch();
    let mut b = batch();
    let (ra, rb) = tokio::join!(first.annotate_sources(&mut a), second.annotate_sources(&mut b));

    assert_eq!(ra.annotated + rb.annotated, 8);
    assert_eq!(llm.peak.load(Ordering::SeqCst), 2);
}
