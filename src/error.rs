//! Coordinator error taxonomy
//!
//! Only resolution and transport failures are errors. A job that ends in
//! `failed`, a cancel that races completion and an operator who declines
//! to cancel are ordinary outcomes, reported through return values.

use crate::host::ApiError;
use crate::resolver::ResolutionError;
use crate::state::StateError;

/// Hard failures of a coordinator run
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Definition or request could not be resolved; nothing was submitted
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Non-2xx response or connectivity failure while submitting or polling
    #[error("Transport error: {0}")]
    Api(#[from] ApiError),

    /// The service reported a state sequence that cannot happen
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// The coordinator already drives a live execution
    #[error("Execution {execution_id} is still active on this coordinator")]
    Busy { execution_id: String },

    /// An execution document lacks a link the coordinator needs
    #[error("Execution {execution_id} has no '{rel}' link")]
    MissingLink { execution_id: String, rel: &'static str },
}

impl CoordinatorError {
    /// True when the run never reached the service's execution endpoints
    pub fn is_resolution(&self) -> bool {
        matches!(self, CoordinatorError::Resolution(_))
    }
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
