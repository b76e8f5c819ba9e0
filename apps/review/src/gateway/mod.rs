//! Backend Gateway: the narrow contract between the review session and the
//! service that stores and generates project descriptions.
//!
//! The session core only ever talks to `dyn BackendGateway`. `HttpGateway`
//! is the production implementation; tests script their own.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::models::feedback::Feedback;
use crate::models::project::{Identity, ProjectNumber, ProjectUpdate};

#[cfg(test)]
pub(crate) mod fake;
pub mod http;

pub use http::HttpGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Transport failures, rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Http(_) => true,
            GatewayError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Payload of the single commit call: the accepted projects, in review order,
/// with the text the employee left in each.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    #[serde(rename = "employeeId")]
    pub identity: Identity,
    pub project_numbers: Vec<ProjectNumber>,
    pub content_by_number: BTreeMap<ProjectNumber, String>,
}

impl CommitRequest {
    pub fn from_projects(identity: Identity, projects: &[ProjectUpdate]) -> Self {
        Self {
            identity,
            project_numbers: projects.iter().map(|p| p.project_number().clone()).collect(),
            content_by_number: projects
                .iter()
                .map(|p| (p.project_number().clone(), p.content().to_string()))
                .collect(),
        }
    }
}

/// Network operations the review session depends on.
///
/// Every method reports only success or failure to the session; the reason
/// is kept for logging.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Resolves the employee the session belongs to.
    async fn resolve_identity(&self) -> Result<Identity, GatewayError>;

    /// Loads the pending set. An empty list is a valid result.
    async fn fetch_pending_updates(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ProjectUpdate>, GatewayError>;

    /// Permanently discards one pending update. Idempotent on the server.
    async fn discard_project(
        &self,
        identity: &Identity,
        project_number: &ProjectNumber,
    ) -> Result<(), GatewayError>;

    /// Commits the accepted set atomically: all listed projects or none.
    async fn commit_updates(&self, request: &CommitRequest) -> Result<(), GatewayError>;

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), GatewayError>;

    /// Downloads the regenerated resume document.
    async fn fetch_final_document(&self, identity: &Identity) -> Result<Bytes, GatewayError>;
}
