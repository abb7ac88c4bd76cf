//! Error types for dispatch sessions.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The request could not complete (connect, timeout, body read).
    #[error("Network failure: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("Service rejected request (HTTP {status}): {detail}")]
    ServiceRejection { status: u16, detail: String },

    /// The routing service declined or returned an unusable path.
    #[error("Routing unavailable: {0}")]
    RoutingUnavailable(String),

    /// The response was malformed or missing required fields.
    #[error("Malformed response: {0}")]
    ParseFailure(String),

    #[error("No incident candidates to choose from")]
    EmptyCandidateSet,

    #[error("An animation is already running for this session")]
    AnimationInProgress,

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl DispatchError {
    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Network(_) => "network_failure",
            DispatchError::ServiceRejection { .. } => "service_rejection",
            DispatchError::RoutingUnavailable(_) => "routing_unavailable",
            DispatchError::ParseFailure(_) => "parse_failure",
            DispatchError::EmptyCandidateSet => "empty_candidate_set",
            DispatchError::AnimationInProgress => "animation_in_progress",
            DispatchError::Cancelled => "cancelled",
            DispatchError::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::ParseFailure(e.to_string())
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
