//! HTTP request handlers.
//!
//! `POST /claims` runs one claim through the pipeline. The history routes
//! read and clear the SQLite record of finished claims.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};
use veritas_domain::{Answer, HistoryEntry, HistoryStore, PipelineState};
use veritas_orchestrator::{ErrorKind, Orchestrator, PipelineError, SharedHistory, Verification};
use veritas_store::StoreError;

/// Entries returned by `GET /history` when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Upper bound on `GET /history?limit=`
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Claim pipeline
    pub orchestrator: Arc<Orchestrator>,
    /// History store, when enabled
    pub history: Option<SharedHistory>,
}

/// Verification request
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// Claim text, at most 800 characters by default
    pub claim: String,
}

/// Accepted source as reported to the caller
#[derive(Debug, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Article URL
    pub url: String,
    /// Publishing domain
    pub domain: String,
    /// Article title
    pub title: String,
    /// Topic label
    pub topic: String,
}

/// Candidate counts after each funnel stage
#[derive(Debug, Serialize, Deserialize)]
pub struct FunnelSummary {
    /// Raw candidates, then after intake, rating, crawl policy, extraction
    /// and correlation
    pub counts: [usize; 6],
    /// Candidates dropped along the way
    pub rejected: usize,
}

/// Verification response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    /// Claim id
    pub claim_id: String,
    /// Claim text as submitted
    pub claim: String,
    /// Search title derived from the claim
    pub title: String,
    /// Verdict, explanation and citations
    pub answer: Answer,
    /// Sources the answer was built from
    pub sources: Vec<SourceSummary>,
    /// Funnel counts
    pub funnel: FunnelSummary,
    /// States visited
    pub states: Vec<PipelineState>,
}

impl From<Verification> for ClaimResponse {
    fn from(v: Verification) -> Self {
        let sources = v
            .claim
            .sources()
            .iter()
            .map(|s| SourceSummary {
                url: s.url.clone(),
                domain: s.domain.clone(),
                title: s.title.clone(),
                topic: s.topic_label().to_string(),
            })
            .collect();
        Self {
            claim_id: v.claim.id.to_string(),
            claim: v.claim.text,
            title: v.claim.title,
            answer: v.answer,
            sources,
            funnel: FunnelSummary {
                counts: v.funnel.counts(),
                rejected: v.funnel.rejections.len(),
            },
            states: v.states,
        }
    }
}

/// `GET /history` query
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Most entries to return
    pub limit: Option<usize>,
}

/// `DELETE /history` response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Claims removed
    pub deleted: usize,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Whether finished claims are recorded
    pub history_enabled: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// `invalid_input`, `external_service`, `cancelled` or `internal`
    pub kind: String,
    /// Whether the same request may succeed later
    pub retryable: bool,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Pipeline failure
    Pipeline(PipelineError),
    /// History database failure
    History(StoreError),
    /// History is switched off
    HistoryDisabled,
    /// Internal server error
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Pipeline(e) => match e.kind() {
                ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::ExternalService => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Cancelled | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::HistoryDisabled => StatusCode::NOT_FOUND,
            AppError::History(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Pipeline(e) => {
                let kind = e.kind();
                let error = if e.is_retryable() {
                    format!("A required service is unavailable, try again later: {}", e)
                } else {
                    e.to_string()
                };
                ErrorResponse {
                    error,
                    kind: kind_label(kind).to_string(),
                    retryable: e.is_retryable(),
                }
            }
            AppError::HistoryDisabled => ErrorResponse {
                error: "History is disabled".to_string(),
                kind: kind_label(ErrorKind::InvalidInput).to_string(),
                retryable: false,
            },
            AppError::History(e) => ErrorResponse {
                error: e.to_string(),
                kind: kind_label(ErrorKind::Internal).to_string(),
                retryable: false,
            },
            AppError::Internal(msg) => ErrorResponse {
                error: msg,
                kind: kind_label(ErrorKind::Internal).to_string(),
                retryable: false,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::ExternalService => "external_service",
        ErrorKind::Cancelled => "cancelled",
        ErrorKind::Internal => "internal",
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::History(e)
    }
}

/// POST /claims - Verify a claim
async fn verify_claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let verification = state.orchestrator.verify(&request.claim).await?;
    info!(
        "Answered claim {} with {}",
        verification.claim.id, verification.answer.verdict
    );
    Ok(Json(verification.into()))
}

/// Run a closure against the history store off the async runtime
async fn with_history<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&mut (dyn HistoryStore<Error = StoreError> + Send)) -> Result<T, StoreError>
        + Send
        + 'static,
{
    let history = state.history.clone().ok_or(AppError::HistoryDisabled)?;
    tokio::task::spawn_blocking(move || {
        let mut store = history.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut *store)
    })
    .await
    .map_err(|e| AppError::Internal(format!("History task failed: {}", e)))?
    .map_err(AppError::from)
}

/// GET /history - Most recent verified claims, newest first
async fn recent_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let entries = with_history(&state, move |store| store.recent(limit)).await?;
    Ok(Json(entries))
}

/// DELETE /history - Forget every verified claim
async fn clear_history(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    let deleted = with_history(&state, |store| store.clear()).await?;
    warn!("Cleared {} claims from history", deleted);
    Ok(Json(ClearResponse { deleted }))
}

/// GET /health - Liveness
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        history_enabled: state.history.is_some(),
    })
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/claims", post(verify_claim))
        .route("/history", get(recent_history).delete(clear_history))
        .route("/health", get(health_check))
        .with_state(state)
}
