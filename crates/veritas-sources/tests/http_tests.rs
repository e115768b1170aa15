//! Source clients against local HTTP servers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use veritas_domain::{CrawlPolicy, Rating, RatingService};
use veritas_sources::robots::DEFAULT_CRAWLER_AGENT;
use veritas_sources::{NewsGuardClient, RobotsChecker};

/// Serve `app` on an ephemeral port and return its base URL
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Issues tok1, tok2, ...; tok1 expires after its first check
#[derive(Clone, Default)]
struct ExpiringTokens {
    token_requests: Arc<AtomicUsize>,
    tok1_checks: Arc<AtomicUsize>,
}

async fn issue_token(State(server): State<ExpiringTokens>) -> Json<serde_json::Value> {
    let n = server.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "access_token": format!("tok{}", n) }))
}

async fn check(State(server): State<ExpiringTokens>, headers: HeaderMap) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let accepted = match auth {
        "Bearer tok1" => server.tok1_checks.fetch_add(1, Ordering::SeqCst) == 0,
        "Bearer tok2" => true,
        _ => false,
    };
    if !accepted {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "identifier": "daily.example", "rank": "T", "score": 90.0 })).into_response()
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = ExpiringTokens::default();
    let token_requests = Arc::clone(&server.token_requests);
    let base = serve(
        Router::new()
            .route("/token", post(issue_token))
            .route("/v3/check/", get(check))
            .with_state(server),
    )
    .await;

    let client = NewsGuardClient::new("id", "secret", Duration::from_secs(2))
        .unwrap()
        .with_endpoints(format!("{}/token", base), base.clone());

    let expected = Rating::Rated {
        rank: "T".to_string(),
        score: 90.0,
    };
    for _ in 0..3 {
        assert_eq!(client.rate("daily.example").await.unwrap(), expected);
    }
    assert_eq!(token_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_fresh_token_is_an_outage() {
    let base = serve(
        Router::new()
            .route("/token", post(|| async { Json(json!({ "access_token": "revoked" })) }))
            .route("/v3/check/", get(|| async { StatusCode::UNAUTHORIZED })),
    )
    .await;

    let client = NewsGuardClient::new("id", "secret", Duration::from_secs(2))
        .unwrap()
        .with_endpoints(format!("{}/token", base), base.clone());

    assert!(client.rate("daily.example").await.is_err());
}

/// robots.txt answers 503 once, then disallows everything
#[derive(Clone, Default)]
struct FlakyRobots {
    requests: Arc<AtomicUsize>,
}

async fn robots(State(server): State<FlakyRobots>) -> Response {
    if server.requests.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    "User-agent: *\nDisallow: /\n".into_response()
}

async fn flaky_robots_site() -> (String, Arc<AtomicUsize>) {
    let server = FlakyRobots::default();
    let requests = Arc::clone(&server.requests);
    let base = serve(
        Router::new()
            .route("/robots.txt", get(robots))
            .with_state(server),
    )
    .await;
    (base, requests)
}

#[tokio::test]
async fn test_failed_robots_fetch_does_not_outlive_the_claim() {
    let (base, _) = flaky_robots_site().await;
    let checker = RobotsChecker::new(DEFAULT_CRAWLER_AGENT, Duration::from_secs(2)).unwrap();
    let article = format!("{}/news/bags", base);

    let first_claim = checker.session().unwrap();
    assert!(first_claim.is_allowed(&article).await.unwrap());

    let second_claim = checker.session().unwrap();
    assert!(!second_claim.is_allowed(&article).await.unwrap());
}

#[tokio::test]
async fn test_session_caches_only_fetched_robots() {
    let (base, requests) = flaky_robots_site().await;
    let checker = RobotsChecker::new(DEFAULT_CRAWLER_AGENT, Duration::from_secs(2)).unwrap();
    let session = checker.session().unwrap();

    assert!(session.is_allowed(&format!("{}/a", base)).await.unwrap());
    assert!(!session.is_allowed(&format!("{}/b", base)).await.unwrap());
    assert!(!session.is_allowed(&format!("{}/c", base)).await.unwrap());
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}
