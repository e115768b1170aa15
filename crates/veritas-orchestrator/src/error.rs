//! Pipeline error types

use thiserror::Error;
use veritas_domain::{ClaimError, InputError, ServiceError, TransitionError};
use veritas_extractor::ExtractorError;
use veritas_gatekeeper::GatekeeperError;
use veritas_graph::GraphError;
use veritas_synthesizer::SynthesizerError;

/// How a failure should be presented to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submitted claim was rejected; resubmitting it unchanged will not help
    InvalidInput,
    /// A collaborating service failed; try again later
    ExternalService,
    /// The run was abandoned
    Cancelled,
    /// Bug or misconfiguration
    Internal,
}

/// Errors that fail a claim
///
/// Insufficient evidence is not an error; it is an abstaining answer.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input validation failed
    #[error("Invalid claim: {0}")]
    InvalidInput(#[from] InputError),

    /// Title/summary generation failed
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] ExtractorError),

    /// Web search failed
    #[error("Search failed: {0}")]
    Search(ServiceError),

    /// Source funnel failed
    #[error("Source filtering failed: {0}")]
    Filter(#[from] GatekeeperError),

    /// Graph reset or ingestion failed
    #[error("Graph build failed: {0}")]
    Graph(#[from] GraphError),

    /// Answer generation failed
    #[error("Answer generation failed: {0}")]
    Synthesis(#[from] SynthesizerError),

    /// Run abandoned through its cancellation token
    #[error("Verification cancelled")]
    Cancelled,

    /// Illegal state transition
    #[error("Pipeline state error: {0}")]
    Transition(#[from] TransitionError),

    /// Claim mutated out of turn
    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Classification for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) => ErrorKind::InvalidInput,
            PipelineError::Cancelled | PipelineError::Filter(GatekeeperError::Cancelled) => {
                ErrorKind::Cancelled
            }
            PipelineError::Filter(GatekeeperError::Config(_))
            | PipelineError::Preprocess(ExtractorError::Config(_))
            | PipelineError::Graph(GraphError::Config(_))
            | PipelineError::Synthesis(SynthesizerError::Config(_))
            | PipelineError::Transition(_)
            | PipelineError::Claim(_)
            | PipelineError::Config(_) => ErrorKind::Internal,
            PipelineError::Preprocess(_)
            | PipelineError::Search(_)
            | PipelineError::Filter(_)
            | PipelineError::Graph(_)
            | PipelineError::Synthesis(_) => ErrorKind::ExternalService,
        }
    }

    /// Whether the same claim may succeed later
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ExternalService
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            PipelineError::from(InputError::NumericOnly).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            PipelineError::Search(ServiceError::Timeout("search".into())).kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            PipelineError::from(GatekeeperError::Cancelled).kind(),
            ErrorKind::Cancelled
        );
        assert!(PipelineError::from(SynthesizerError::GroundingViolation { cited: vec![] }).is_retryable());
        assert!(!PipelineError::Config("x".into()).is_retryable());
    }
}
