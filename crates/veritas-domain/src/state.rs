//! Per-claim pipeline state machine
//!
//! States advance strictly in order; `Failed` is reachable from any
//! non-terminal state and both `Done` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage of a single claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Validated input accepted
    Received,
    /// Title and summary generated
    Preprocessed,
    /// Candidate sources filtered and annotated
    SourcesFiltered,
    /// Graph reset and rebuilt from accepted sources
    GraphBuilt,
    /// Query engine returned an answer
    Answered,
    /// Answer delivered
    Done,
    /// Aborted with an error
    Failed,
}

impl PipelineState {
    /// The only forward successor, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Preprocessed),
            Self::Preprocessed => Some(Self::SourcesFiltered),
            Self::SourcesFiltered => Some(Self::GraphBuilt),
            Self::GraphBuilt => Some(Self::Answered),
            Self::Answered => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Preprocessed => "preprocessed",
            Self::SourcesFiltered => "sources_filtered",
            Self::GraphBuilt => "graph_built",
            Self::Answered => "answered",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Illegal transition attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Target is not the immediate successor
    #[error("Invalid transition: {from} -> {to}")]
    OutOfOrder {
        /// Current state
        from: PipelineState,
        /// Requested state
        to: PipelineState,
    },

    /// Current state is terminal
    #[error("Pipeline already finished in state {0}")]
    Terminal(PipelineState),
}

/// Tracks one claim's progress and the path it took
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl StateMachine {
    /// Start in `Received`
    pub fn new() -> Self {
        Self {
            current: PipelineState::Received,
            history: vec![PipelineState::Received],
        }
    }

    /// Current state
    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `to`, which must be the immediate successor
    pub fn advance(&mut self, to: PipelineState) -> Result<(), TransitionError> {
        if self.current.is_terminal() {
            return Err(TransitionError::Terminal(self.current));
        }
        if self.current.next() != Some(to) {
            return Err(TransitionError::OutOfOrder {
                from: self.current,
                to,
            });
        }
        self.set(to);
        Ok(())
    }

    /// Abort from any non-terminal state
    pub fn fail(&mut self) -> Result<(), TransitionError> {
        if self.current.is_terminal() {
            return Err(TransitionError::Terminal(self.current));
        }
        self.set(PipelineState::Failed);
        Ok(())
    }

    fn set(&mut self, state: PipelineState) {
        self.current = state;
        self.history.push(state);
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
