//! Veritas HTTP server
//!
//! Wires the production collaborators named in a [`ServerConfig`] into an
//! [`Orchestrator`] and exposes it over HTTP:
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /claims` | verify `{"claim": "..."}` |
//! | `GET /history?limit=N` | most recent verified claims |
//! | `DELETE /history` | forget every verified claim |
//! | `GET /health` | liveness |

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, GenerationBackend, ServerConfig};
use handlers::{create_router, AppState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use veritas_domain::{LlmProvider, ServiceError};
use veritas_extractor::{LlmEntityResolver, Preprocessor};
use veritas_gatekeeper::{Gatekeeper, LlmCorrelationJudge};
use veritas_graph::{open_store, GraphBuilder, GraphLock};
use veritas_llm::{GroqProvider, LlmError, OllamaEmbedder, OllamaProvider};
use veritas_orchestrator::{Orchestrator, PipelineError, SharedHistory};
use veritas_sources::{HtmlExtractor, NewsGuardClient, RobotsChecker, SourceError, TavilySearch};
use veritas_store::{SqliteHistoryStore, StoreError};
use veritas_synthesizer::QueryEngine;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM or embedding client could not be built
    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),

    /// Source client could not be built
    #[error("Source client error: {0}")]
    Source(#[from] SourceError),

    /// Crawl policy client could not be built
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// A pipeline component rejected its configuration
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// History database could not be opened
    #[error("History error: {0}")]
    History(#[from] StoreError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the application state from configuration
///
/// Secrets are read from the environment variables the configuration names;
/// a missing variable fails here rather than on the first claim.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, RouterError> {
    config.validate()?;

    // Providers retry internally; each stage deadline was validated to cover
    // their attempts and backoff
    let generation = &config.generation;
    let llm: Arc<dyn LlmProvider> = match generation.backend {
        GenerationBackend::Groq => Arc::new(
            GroqProvider::from_env(&generation.base_url, &generation.model, &generation.api_key_env)?
                .with_timeout(generation.request_timeout())?
                .with_retry(generation.retry_policy()),
        ),
        GenerationBackend::Ollama => Arc::new(
            OllamaProvider::new(&generation.base_url, &generation.model)?
                .with_timeout(generation.request_timeout())?
                .with_retry(generation.retry_policy()),
        ),
    };
    let embedder = Arc::new(
        OllamaEmbedder::new(
            &config.embedding.endpoint,
            &config.embedding.model,
            config.embedding.dimension,
        )?
        .with_timeout(config.embedding.request_timeout())?
        .with_retry(config.embedding.retry_policy()),
    );

    let filter = &config.filter;
    let rating = rating_client(config)?;

    let search = TavilySearch::from_env(
        &config.search.api_key_env,
        Duration::from_millis(config.search.timeout_ms),
    )?;
    let search = match &config.search.endpoint {
        Some(endpoint) => search.with_endpoint(endpoint),
        None => search,
    };

    let crawl = RobotsChecker::new(
        &config.crawl.user_agent,
        Duration::from_millis(filter.crawl_timeout_ms),
    )?;
    let fetcher = HtmlExtractor::new(
        Duration::from_millis(filter.fetch_timeout_ms),
        config.crawl.max_body_chars,
    )?;
    let judge =
        LlmCorrelationJudge::new(Arc::clone(&llm)).with_body_chars(filter.correlation_body_chars);

    let gatekeeper = Gatekeeper::new(
        filter.clone(),
        Arc::new(rating),
        Arc::new(crawl),
        Arc::new(fetcher),
        Arc::new(judge),
    )
    .map_err(PipelineError::from)?;
    let preprocessor = Preprocessor::new(Arc::clone(&llm), config.preprocess.clone());
    let builder = GraphBuilder::new(
        Arc::new(
            LlmEntityResolver::new(Arc::clone(&llm))
                .with_timeout(Duration::from_millis(config.graph.resolve_timeout_ms)),
        ),
        embedder.clone(),
        config.graph.clone(),
    )
    .map_err(PipelineError::from)?;
    let engine = QueryEngine::new(llm, embedder, config.synthesizer.clone())
        .map_err(PipelineError::from)?;
    let store = open_store(&config.graph).await.map_err(PipelineError::from)?;

    let orchestrator = Orchestrator::new(
        config.pipeline.clone(),
        preprocessor,
        Arc::new(search),
        gatekeeper,
        builder,
        engine,
        GraphLock::new(store),
    )?;

    let history = if config.history.enabled {
        let store = SqliteHistoryStore::new(&config.history.path)?;
        info!(
            "History at {} ({} claims)",
            config.history.path.display(),
            store.len()?
        );
        let shared: SharedHistory = Arc::new(Mutex::new(store));
        Some(shared)
    } else {
        None
    };
    let orchestrator = match &history {
        Some(h) => orchestrator.with_history(Arc::clone(h)),
        None => orchestrator,
    };

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        history,
    })
}

/// Build the rating client named in `config`
///
/// Each HTTP request is capped at `rating.request_timeout_ms`, so the
/// client's retries fit inside the funnel's `filter.rating_timeout_ms`.
pub fn rating_client(config: &ServerConfig) -> Result<NewsGuardClient, RouterError> {
    let rating = &config.rating;
    if !config.filter.rating_enabled {
        warn!("Rating stage disabled; every candidate domain passes unrated");
        // Never consulted while the rating stage is off
        return Ok(NewsGuardClient::new("", "", rating.request_timeout())?);
    }

    let client = NewsGuardClient::from_env(
        &rating.client_id_env,
        &rating.client_secret_env,
        rating.request_timeout(),
    )?
    .with_max_retries(rating.max_attempts);
    Ok(match (&rating.token_url, &rating.api_url) {
        (Some(token_url), Some(api_url)) => client.with_endpoints(token_url, api_url),
        _ => client,
    })
}

/// Start the HTTP server
///
/// Builds every collaborator, binds, and serves until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<(), RouterError> {
    info!("Starting Veritas");
    info!("Bind address: {}", config.bind_addr());
    info!("Graph backend: {:?}", config.graph.backend);
    info!("Generation: {:?} {}", config.generation.backend, config.generation.model);

    let state = build_state(&config).await?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RouterError::Server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
