//! Gatekeeper error types

use thiserror::Error;
use veritas_domain::ServiceError;

/// Errors that fail the whole funnel run
///
/// Per-candidate problems are never errors; they are recorded as rejections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// Rating service unreachable or erroring after retries
    #[error("Rating service error: {0}")]
    RatingService(ServiceError),

    /// Run abandoned through its cancellation token
    #[error("Source filtering cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
