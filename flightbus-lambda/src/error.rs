//! Handler error types.

use flightbus_events::DispatchError;
use flightbus_validation::CorrelationError;
use thiserror::Error;

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Failure reported by a record store or event publisher.
///
/// Displays as the collaborator's own message so it can be surfaced unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Record store failure.
    #[error("{0}")]
    Store(String),

    /// Event publisher failure.
    #[error("{0}")]
    Publish(String),
}

/// Handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Request body or record body is not valid JSON.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Store or publisher failure.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Validation request could not be correlated.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// Dispatcher failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The invocation's dispatcher went away before producing a result.
    #[error("{0} handler finished without a result")]
    Unsettled(&'static str),

    /// A subscriber panicked before producing a result.
    #[error("{0} handler panicked before producing a result")]
    Panicked(&'static str),

    /// The validator answered with a record shaped for another domain.
    #[error("{handler} handler expected a '{expected}' record")]
    UnexpectedRecord {
        handler: &'static str,
        expected: &'static str,
    },
}
