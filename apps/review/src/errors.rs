use thiserror::Error;

use crate::gateway::GatewayError;
use crate::models::project::ProjectNumber;

/// Error returned by every session and feedback entry point.
///
/// Gateway failures are also folded into session state before they reach the
/// caller; the returned error is for logging, the state is what gets rendered.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{operation} is not allowed while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unknown project: {0}")]
    UnknownProject(ProjectNumber),

    #[error("Discard already in flight for project {0}")]
    DiscardInFlight(ProjectNumber),

    #[error("Discard of project {project} requires state confirm_pending, found {found}")]
    DiscardNotConfirmable {
        project: ProjectNumber,
        found: &'static str,
    },

    #[error("Identity has not been resolved")]
    IdentityUnresolved,

    #[error("Session was closed")]
    SessionClosed,

    #[error("Session was reloaded before the operation finished")]
    Superseded,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Gateway(#[from] GatewayError),
}

impl ReviewError {
    /// Stable machine-readable code for the error, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::InvalidState { .. } => "INVALID_STATE",
            ReviewError::UnknownProject(_) => "UNKNOWN_PROJECT",
            ReviewError::DiscardInFlight(_) => "DISCARD_IN_FLIGHT",
            ReviewError::DiscardNotConfirmable { .. } => "DISCARD_NOT_CONFIRMABLE",
            ReviewError::IdentityUnresolved => "IDENTITY_UNRESOLVED",
            ReviewError::SessionClosed => "SESSION_CLOSED",
            ReviewError::Superseded => "SESSION_SUPERSEDED",
            ReviewError::Validation(_) => "VALIDATION_ERROR",
            ReviewError::Gateway(_) => "GATEWAY_ERROR",
        }
    }
}
