//! Claim pipeline driver

use crate::config::OrchestratorConfig;
use crate::PipelineError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use veritas_domain::{
    Answer, Claim, ClaimText, HistoryEntry, HistoryStore, PipelineState, SearchProvider, StateMachine,
};
use veritas_extractor::Preprocessor;
use veritas_gatekeeper::{FunnelReport, Gatekeeper};
use veritas_graph::{GraphBuilder, GraphLock, IngestReport};
use veritas_store::StoreError;
use veritas_synthesizer::QueryEngine;

/// History store shared between the pipeline and its callers
pub type SharedHistory = Arc<Mutex<dyn HistoryStore<Error = StoreError> + Send>>;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct Verification {
    /// The claim, sealed, with its accepted sources
    pub claim: Claim,
    /// The answer delivered
    pub answer: Answer,
    /// Funnel counts and rejections
    pub funnel: FunnelReport,
    /// What the graph build wrote
    pub ingest: IngestReport,
    /// Every state visited, ending in `Done`
    pub states: Vec<PipelineState>,
}

/// Drives one claim through preprocessing, filtering, graph build and answer
///
/// Filtering runs concurrently across claims; the graph stages are
/// serialized through the [`GraphLock`].
pub struct Orchestrator {
    config: OrchestratorConfig,
    preprocessor: Preprocessor,
    search: Arc<dyn SearchProvider>,
    gatekeeper: Gatekeeper,
    builder: GraphBuilder,
    engine: QueryEngine,
    graph: GraphLock,
    history: Option<SharedHistory>,
}

impl Orchestrator {
    /// Assemble a pipeline
    pub fn new(
        config: OrchestratorConfig,
        preprocessor: Preprocessor,
        search: Arc<dyn SearchProvider>,
        gatekeeper: Gatekeeper,
        builder: GraphBuilder,
        engine: QueryEngine,
        graph: GraphLock,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        // Annotation and the funnel draw from one outbound budget
        let preprocessor = preprocessor.with_limiter(gatekeeper.limiter());
        Ok(Self {
            config,
            preprocessor,
            search,
            gatekeeper,
            builder,
            engine,
            graph,
            history: None,
        })
    }

    /// Record finished claims in `history`
    pub fn with_history(mut self, history: SharedHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Attached history store
    pub fn history(&self) -> Option<&SharedHistory> {
        self.history.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Verify `raw` claim text
    pub async fn verify(&self, raw: &str) -> Result<Verification, PipelineError> {
        self.verify_cancellable(raw, &CancellationToken::new()).await
    }

    /// Verify `raw`, abandoning the run when `cancel` fires
    ///
    /// Input is validated before the state machine starts, so rejected text
    /// never reaches any collaborator.
    pub async fn verify_cancellable(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<Verification, PipelineError> {
        let text = ClaimText::parse(raw, self.config.max_claim_chars)?;
        let mut claim = Claim::new(text);
        let mut machine = StateMachine::new();
        let cancel = cancel.child_token();
        let started = Instant::now();
        info!("Claim {} received", claim.id);

        match self.run(&mut claim, &mut machine, &cancel).await {
            Ok((answer, funnel, ingest)) => {
                info!(
                    "Claim {} done: {} ({} sources) in {:?}",
                    claim.id,
                    answer.verdict,
                    claim.sources().len(),
                    started.elapsed()
                );
                Ok(Verification {
                    claim,
                    answer,
                    funnel,
                    ingest,
                    states: machine.history().to_vec(),
                })
            }
            Err(e) => {
                // Abandon anything still in flight for this claim
                cancel.cancel();
                let failed_in = machine.current();
                if let Err(te) = machine.fail() {
                    warn!("Claim {} could not enter failed state: {}", claim.id, te);
                }
                error!("Claim {} failed after {}: {}", claim.id, failed_in, e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        claim: &mut Claim,
        machine: &mut StateMachine,
        cancel: &CancellationToken,
    ) -> Result<(Answer, FunnelReport, IngestReport), PipelineError> {
        let preprocessed = self.preprocessor.preprocess_claim(&claim.text).await?;
        claim.set_preprocessed(preprocessed.title, preprocessed.summary)?;
        self.advance(claim, machine, PipelineState::Preprocessed, cancel)?;

        let candidates = self
            .search
            .search(&claim.title, self.config.search_results)
            .await
            .map_err(PipelineError::Search)?;
        let mut outcome = self
            .gatekeeper
            .filter_sources(claim.statement(), candidates, cancel)
            .await?;
        let annotation = self.preprocessor.annotate_sources(&mut outcome.sources).await;
        debug!("Annotation: {:?}", annotation);
        for source in outcome.sources {
            claim.accept_source(source)?;
        }
        self.advance(claim, machine, PipelineState::SourcesFiltered, cancel)?;

        // Held until the answer is produced; the next claim resets first
        let active = self.graph.acquire(claim.id).await;
        self.builder.reset(active.store()).await?;
        let ingest = self.builder.ingest(active.store(), claim, claim.sources()).await?;
        self.advance(claim, machine, PipelineState::GraphBuilt, cancel)?;

        let answer = if claim.sources().is_empty() {
            info!("No sources survived filtering for claim {}", claim.id);
            Answer::insufficient_evidence(claim.id)
        } else {
            self.engine.answer(claim, &active).await?
        };
        drop(active);
        claim.seal();
        machine.advance(PipelineState::Answered)?;

        machine.advance(PipelineState::Done)?;
        self.record(claim, &answer).await;
        Ok((answer, outcome.report, ingest))
    }

    fn advance(
        &self,
        claim: &Claim,
        machine: &mut StateMachine,
        to: PipelineState,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        machine.advance(to)?;
        debug!("Claim {} entered {}", claim.id, to);
        Ok(())
    }

    async fn record(&self, claim: &Claim, answer: &Answer) {
        let Some(history) = self.history.as_ref().filter(|_| self.config.record_history) else {
            return;
        };
        let history = Arc::clone(history);
        let entry = HistoryEntry::from_claim(claim, answer.clone());
        let claim_id = claim.id;

        let result = tokio::task::spawn_blocking(move || {
            let mut store = history.lock().unwrap_or_else(PoisonError::into_inner);
            store.record(&entry)
        })
        .await;
        match result {
            Ok(Ok(())) => debug!("Recorded claim {} in history", claim_id),
            Ok(Err(e)) => warn!("Failed to record claim {} in history: {}", claim_id, e),
            Err(e) => warn!("History task for claim {} failed: {}", claim_id, e),
        }
    }
}
