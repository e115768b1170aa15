//! End-to-end verification with scripted collaborators

use std::sync::{Arc, Mutex};
use veritas_domain::{
    ExtractionFailure, HistoryStore, Outcome, PipelineState, Relevance, RelevanceQuery, Verdict,
};
use veritas_extractor::{LlmEntityResolver, PreprocessConfig, Preprocessor};
use veritas_gatekeeper::{FilterConfig, Gatekeeper};
use veritas_graph::{ArticleNode, GraphBuilder, GraphConfig, GraphLock, GraphStore, InMemoryGraph};
use veritas_llm::{MockEmbeddingModel, MockProvider, ScriptedJudge};
use veritas_orchestrator::{ErrorKind, Orchestrator, OrchestratorConfig, PipelineError, SharedHistory};
use veritas_sources::fixtures::{StaticCrawlPolicy, StaticPages, StaticRatings, StaticSearch};
use veritas_store::SqliteHistoryStore;
use veritas_synthesizer::{QueryEngine, SynthesizerConfig};

const CLAIM: &str = "City X banned plastic bags in 2024";
const BAG_BAN: &str = "https://daily.example/bag-ban";
const REACTION: &str = "https://herald.example/shops-react";

const CANDIDATES: [&str; 5] = [
    BAG_BAN,
    REACTION,
    "https://rumours.example/bags",
    "https://private.example/bags",
    "https://paywall.example/bags",
];

const VERDICT: &str = r#"{"verdict": "confirm", "explanation": "The council of City X voted for the ban.", "citations": ["https://daily.example/bag-ban"]}"#;

fn llm() -> MockProvider {
    let mut llm = MockProvider::default();
    llm.add_response_containing("keywords needed", "City X plastic bag ban 2024");
    llm.add_response_containing("Restate", "City X banned single-use plastic bags in 2024.");
    llm.add_response_containing(
        "named-entity recognition",
        r#"{"topic": "Environment", "entities": ["City X", "City X Council"]}"#,
    );
    llm.add_response_containing(
        "Normalize the following entity names",
        r#"{"City X": "City X", "City X Council": "City X Council"}"#,
    );
    llm.add_response_containing("fact-checking assistant", VERDICT);
    llm
}

fn ratings() -> StaticRatings {
    StaticRatings::new()
        .with("daily.example", "T", 90.0)
        .with("herald.example", "T", 82.0)
        .with("rumours.example", "N", 35.0)
        .with("private.example", "T", 88.0)
        .with("paywall.example", "T", 95.0)
}

fn pages() -> StaticPages {
    StaticPages::new()
        .page(BAG_BAN, "City X bans plastic bags", "The council of City X banned plastic bags from 2024.")
        .page(REACTION, "Shops react to bag ban", "Retailers in City X prepare for the plastic bag ban.")
        .page("https://rumours.example/bags", "Rumour", "plastic rumours")
        .page("https://private.example/bags", "Private", "plastic")
        .failing("https://paywall.example/bags", ExtractionFailure::Paywalled { status: 402 })
}

struct Harness {
    orchestrator: Orchestrator,
    llm: MockProvider,
    graph: InMemoryGraph,
    search: StaticSearch,
    history: SharedHistory,
}

fn harness_with(llm: MockProvider, search: StaticSearch, ratings: StaticRatings, embedder: MockEmbeddingModel) -> Harness {
    let graph = InMemoryGraph::new();
    let history: SharedHistory = Arc::new(Mutex::new(SqliteHistoryStore::new(":memory:").unwrap()));

    let judge = ScriptedJudge::new(|q: &RelevanceQuery| {
        Ok(if q.body.contains("plastic") {
            Relevance::Relevant
        } else {
            Relevance::Irrelevant
        })
    });
    let gatekeeper = Gatekeeper::new(
        FilterConfig::default(),
        Arc::new(ratings),
        Arc::new(StaticCrawlPolicy::allow_all().deny("https://private.example/bags")),
        Arc::new(pages()),
        Arc::new(judge),
    )
    .unwrap();

    let preprocessor = Preprocessor::new(Arc::new(llm.clone()), PreprocessConfig::default());
    let builder = GraphBuilder::new(
        Arc::new(LlmEntityResolver::new(Arc::new(llm.clone()))),
        Arc::new(embedder.clone()),
        GraphConfig::default(),
    )
    .unwrap();
    let engine = QueryEngine::new(Arc::new(llm.clone()), Arc::new(embedder), SynthesizerConfig::default()).unwrap();

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        preprocessor,
        Arc::new(search.clone()),
        gatekeeper,
        builder,
        engine,
        GraphLock::new(Arc::new(graph.clone())),
    )
    .unwrap()
    .with_history(Arc::clone(&history));

    Harness {
        orchestrator,
        llm,
        graph,
        search,
        history,
    }
}

fn harness() -> Harness {
    harness_with(llm(), StaticSearch::new(CANDIDATES), ratings(), MockEmbeddingModel::new(256))
}

#[tokio::test]
async fn test_end_to_end_two_of_five_sources() {
    let h = harness();
    let verification = h.orchestrator.verify(CLAIM).await.unwrap();

    assert_eq!(verification.funnel.counts(), [5, 5, 4, 3, 2, 2]);
    assert_eq!(verification.claim.title, "City X plastic bag ban 2024");
    assert_eq!(h.search.queries(), vec!["City X plastic bag ban 2024"]);
    assert_eq!(verification.claim.sources().len(), 2);
    assert!(verification.claim.is_sealed());

    let counts = h.graph.counts().await.unwrap();
    assert_eq!(counts.articles, 2);
    assert!(counts.sites >= 1);
    assert!(counts.topics >= 1);
    assert_eq!(verification.ingest.skipped, 0);

    let answer = &verification.answer;
    assert_eq!(answer.verdict, Verdict::Confirm);
    assert_eq!(answer.outcome, Outcome::Answered);
    assert!(!answer.citations.is_empty());
    assert!(answer
        .citations
        .iter()
        .all(|c| c.url == BAG_BAN || c.url == REACTION));

    assert_eq!(
        verification.states,
        vec![
            PipelineState::Received,
            PipelineState::Preprocessed,
            PipelineState::SourcesFiltered,
            PipelineState::GraphBuilt,
            PipelineState::Answered,
            PipelineState::Done,
        ]
    );

    let recorded = h.history.lock().unwrap().recent(10).unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].claim, CLAIM);
    assert_eq!(recorded[0].sources.len(), 2);
}

#[tokio::test]
async fn test_no_surviving_sources_abstains() {
    let h = harness_with(
        llm(),
        StaticSearch::new(["https://rumours.example/bags", "https://unknown.example/a"]),
        ratings(),
        MockEmbeddingModel::new(256),
    );
    let verification = h.orchestrator.verify(CLAIM).await.unwrap();

    assert_eq!(verification.answer.verdict, Verdict::Abstain);
    assert_eq!(verification.answer.outcome, Outcome::InsufficientEvidence);
    assert!(verification.answer.citations.is_empty());
    assert_eq!(verification.states.last(), Some(&PipelineState::Done));
    assert!(h.graph.counts().await.unwrap().is_empty());
    assert!(!h.llm.prompts().iter().any(|p| p.contains("fact-checking assistant")));
}

#[tokio::test]
async fn test_numeric_claim_rejected_before_pipeline() {
    let h = harness();
    let err = h.orchestrator.verify("12345").await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(h.llm.call_count(), 0);
    assert!(h.search.queries().is_empty());
}

#[tokio::test]
async fn test_overlong_claim_rejected() {
    let h = harness();
    let err = h.orchestrator.verify(&"a".repeat(801)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_rating_outage_is_retryable_failure() {
    let h = harness_with(
        llm(),
        StaticSearch::new(CANDIDATES),
        StaticRatings::unavailable(),
        MockEmbeddingModel::new(256),
    );
    let err = h.orchestrator.verify(CLAIM).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert!(err.is_retryable());
    assert!(h.history.lock().unwrap().recent(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_search_outage_is_retryable_failure() {
    let h = harness_with(llm(), StaticSearch::unavailable(), ratings(), MockEmbeddingModel::new(256));
    let err = h.orchestrator.verify(CLAIM).await.unwrap_err();

    assert!(matches!(err, PipelineError::Search(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_generation_outage_leaves_graph_fully_ingested() {
    let mut llm = MockProvider::default();
    llm.add_error_containing("fact-checking assistant");
    llm.add_response_containing("keywords needed", "City X plastic bag ban 2024");
    llm.add_response_containing("Restate", "City X banned plastic bags in 2024.");
    llm.add_response_containing(
        "named-entity recognition",
        r#"{"topic": "Environment", "entities": ["City X"]}"#,
    );
    let h = harness_with(llm, StaticSearch::new(CANDIDATES), ratings(), MockEmbeddingModel::new(256));

    let err = h.orchestrator.verify(CLAIM).await.unwrap_err();

    assert!(matches!(err, PipelineError::Synthesis(_)));
    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert_eq!(h.graph.counts().await.unwrap().articles, 2);
}

#[tokio::test]
async fn test_stale_graph_from_failed_run_is_reset() {
    let h = harness();
    h.graph
        .upsert_article(&ArticleNode {
            url: "https://stale.example/left-over".to_string(),
            title: "Left over".to_string(),
            body: "From a claim that failed".to_string(),
            domain: "stale.example".to_string(),
            topic: "General".to_string(),
            embedding: vec![0.0; 256],
        })
        .await
        .unwrap();

    h.orchestrator.verify(CLAIM).await.unwrap();

    let urls: Vec<String> = h.graph.articles().await.unwrap().into_iter().map(|a| a.url).collect();
    assert_eq!(urls.len(), 2);
    assert!(!urls.iter().any(|u| u.contains("stale.example")));
}

#[tokio::test]
async fn test_concurrent_claims_both_complete() {
    let h = harness();
    let (first, second) = tokio::join!(
        h.orchestrator.verify(CLAIM),
        h.orchestrator.verify("City X council voted on a plastic bag ban")
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(h.history.lock().unwrap().recent(10).unwrap().len(), 2);
}
