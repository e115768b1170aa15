//! Integration tests for the HTTP surface

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::{Arc, Mutex};
use veritas_domain::{Outcome, PipelineState, Relevance, RelevanceQuery, Verdict};
use veritas_extractor::{LlmEntityResolver, PreprocessConfig, Preprocessor};
use veritas_gatekeeper::{FilterConfig, Gatekeeper};
use veritas_graph::{GraphBuilder, GraphConfig, GraphLock, InMemoryGraph};
use veritas_llm::{MockEmbeddingModel, MockProvider, ScriptedJudge};
use veritas_orchestrator::{Orchestrator, OrchestratorConfig, SharedHistory};
use veritas_router::config::ServerConfig;
use veritas_router::handlers::{
    create_router, AppState, ClaimResponse, ClearResponse, ErrorResponse, HealthCheckResponse,
};
use veritas_sources::fixtures::{StaticCrawlPolicy, StaticPages, StaticRatings, StaticSearch};
use veritas_store::SqliteHistoryStore;
use veritas_synthesizer::{QueryEngine, SynthesizerConfig};
use tower::ServiceExt; // for oneshot

const CLAIM: &str = "City X banned plastic bags in 2024";
const ARTICLE: &str = "https://daily.example/bag-ban";

/// Helper to create test application state
fn create_test_state(search: StaticSearch, with_history: bool) -> AppState {
    let mut llm = MockProvider::default();
    llm.add_response_containing("keywords needed", "City X plastic bag ban 2024");
    llm.add_response_containing("Restate", "City X banned plastic bags in 2024.");
    llm.add_response_containing(
        "named-entity recognition",
        r#"{"topic": "Environment", "entities": ["City X"]}"#,
    );
    llm.add_response_containing(
        "fact-checking assistant",
        r#"{"verdict": "confirm", "explanation": "The council voted for it.", "citations": ["https://daily.example/bag-ban"]}"#,
    );
    let llm = Arc::new(llm);
    let embedder = Arc::new(MockEmbeddingModel::new(256));

    let gatekeeper = Gatekeeper::new(
        FilterConfig::default(),
        Arc::new(StaticRatings::new().with("daily.example", "T", 90.0)),
        Arc::new(StaticCrawlPolicy::allow_all()),
        Arc::new(StaticPages::new().page(
            ARTICLE,
            "City X bans plastic bags",
            "The council of City X banned plastic bags from 2024.",
        )),
        Arc::new(ScriptedJudge::new(|q: &RelevanceQuery| {
            Ok(if q.body.contains("plastic") {
                Relevance::Relevant
            } else {
                Relevance::Irrelevant
            })
        })),
    )
    .unwrap();

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        Preprocessor::new(llm.clone(), PreprocessConfig::default()),
        Arc::new(search),
        gatekeeper,
        GraphBuilder::new(
            Arc::new(LlmEntityResolver::new(llm.clone())),
            embedder.clone(),
            GraphConfig::default(),
        )
        .unwrap(),
        QueryEngine::new(llm, embedder, SynthesizerConfig::default()).unwrap(),
        GraphLock::new(Arc::new(InMemoryGraph::new())),
    )
    .unwrap();

    let history: Option<SharedHistory> = if with_history {
        Some(Arc::new(Mutex::new(SqliteHistoryStore::new(":memory:").unwrap())))
    } else {
        None
    };
    let orchestrator = match &history {
        Some(h) => orchestrator.with_history(Arc::clone(h)),
        None => orchestrator,
    };

    AppState {
        orchestrator: Arc::new(orchestrator),
        history,
    }
}

fn app() -> Router {
    create_router(create_test_state(StaticSearch::new([ARTICLE]), true))
}

fn post_claim(claim: &str) -> Request<Body> {
    let body = serde_json::json!({ "claim": claim }).to_string();
    Request::builder()
        .method("POST")
        .uri("/claims")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthCheckResponse = read_json(response).await;
    assert_eq!(health.status, "healthy");
    assert!(health.history_enabled);
}

#[tokio::test]
async fn test_verify_claim_returns_grounded_answer() {
    let response = app().oneshot(post_claim(CLAIM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: ClaimResponse = read_json(response).await;
    assert_eq!(result.claim, CLAIM);
    assert_eq!(result.title, "City X plastic bag ban 2024");
    assert_eq!(result.answer.verdict, Verdict::Confirm);
    assert_eq!(result.answer.outcome, Outcome::Answered);
    assert_eq!(result.answer.citations[0].url, ARTICLE);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].topic, "Environment");
    assert_eq!(result.funnel.counts, [1, 1, 1, 1, 1, 1]);
    assert_eq!(result.states.last(), Some(&PipelineState::Done));
}

#[tokio::test]
async fn test_numeric_claim_is_unprocessable() {
    let response = app().oneshot(post_claim("12345")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.kind, "invalid_input");
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_overlong_claim_is_unprocessable() {
    let response = app().oneshot(post_claim(&"x".repeat(801))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_search_outage_asks_to_retry() {
    let app = create_router(create_test_state(StaticSearch::unavailable(), true));
    let response = app.oneshot(post_claim(CLAIM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.kind, "external_service");
    assert!(error.retryable);
    assert!(error.error.contains("try again later"));
}

#[tokio::test]
async fn test_no_sources_is_an_answer_not_an_error() {
    let app = create_router(create_test_state(StaticSearch::new(Vec::<String>::new()), true));
    let response = app.oneshot(post_claim(CLAIM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: ClaimResponse = read_json(response).await;
    assert_eq!(result.answer.verdict, Verdict::Abstain);
    assert_eq!(result.answer.outcome, Outcome::InsufficientEvidence);
    assert!(result.sources.is_empty());
}

#[tokio::test]
async fn test_history_lists_and_clears() {
    let app = app();

    let response = app.clone().oneshot(post_claim(CLAIM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/history?limit=5")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries: Vec<veritas_domain::HistoryEntry> = read_json(response).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].claim, CLAIM);
    assert_eq!(entries[0].answer.verdict, Verdict::Confirm);

    let request = Request::builder()
        .method("DELETE")
        .uri("/history")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let cleared: ClearResponse = read_json(response).await;
    assert_eq!(cleared.deleted, 1);

    let request = Request::builder().uri("/history").body(Body::empty()).unwrap();
    let entries: Vec<veritas_domain::HistoryEntry> =
        read_json(app.oneshot(request).await.unwrap()).await;
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_history_disabled_is_not_found() {
    let app = create_router(create_test_state(StaticSearch::new([ARTICLE]), false));
    let request = Request::builder().uri("/history").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_shipped_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/veritas.toml");
    let config = ServerConfig::from_file(path).unwrap();
    assert_eq!(config.pipeline.max_claim_chars, 800);
    assert_eq!(config.synthesizer.max_reprompts, 1);
}
