//! HTTP implementation of the Backend Gateway.
//!
//! Every response body is a JSON envelope carrying `status: "success" | "error"`
//! and an optional `message`. A 2xx response whose status is not `"success"`
//! is a rejection, not a transport failure.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{BackendGateway, CommitRequest, GatewayError};
use crate::config::Config;
use crate::models::feedback::Feedback;
use crate::models::project::{Identity, ProjectNumber, ProjectUpdate};

const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 8_000;
/// Upper bound on attempts per call, whatever the configuration says.
pub const MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Deserialize)]
struct IdentityBody {
    employee_id: String,
}

#[derive(Debug, Deserialize)]
struct PendingBody {
    #[serde(default)]
    projects: Vec<ProjectUpdate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscardBody<'a> {
    employee_id: &'a Identity,
    project_id: &'a ProjectNumber,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    /// Configured identity; bypasses `/current_user` when present.
    employee_id: Option<Identity>,
    max_attempts: u32,
}

impl HttpGateway {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::builder().timeout(config.http_timeout).build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            employee_id: config.employee_id.clone().map(Identity),
            max_attempts: config.max_retries.clamp(1, MAX_ATTEMPTS),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request built by `build`, retrying transport errors, 429 and 5xx
    /// with exponential backoff capped at `MAX_BACKOFF_MS`.
    async fn send(
        &self,
        operation: &'static str,
        attempts: u32,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, GatewayError> {
        let attempts = attempts.clamp(1, MAX_ATTEMPTS);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "{operation} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            attempt += 1;

            let error = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("{operation} succeeded with {}", response.status());
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = GatewayError::Api {
                        status: status.as_u16(),
                        message: error_message(&body),
                    };
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    warn!("{operation} returned {status}: {body}");
                    error
                }
                Err(e) => GatewayError::Http(e),
            };

            if attempt >= attempts {
                if attempts == 1 {
                    return Err(error);
                }
                return Err(GatewayError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        attempts: u32,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self.send(operation, attempts, build).await?;
        let value: Value = response.json().await?;
        let value = check_envelope(value)?;
        serde_json::from_value(value).map_err(GatewayError::Parse)
    }

    async fn send_ack(
        &self,
        operation: &'static str,
        attempts: u32,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<(), GatewayError> {
        let response = self.send(operation, attempts, build).await?;
        let value: Value = response.json().await?;
        check_envelope(value).map(|_| ())
    }
}

/// Delay before retry number `attempt` (1-based): 250ms, 500ms, 1s, ... up to 8s.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Passes a `"success"` envelope through, turns anything else into a rejection.
fn check_envelope(value: Value) -> Result<Value, GatewayError> {
    if value.get("status").and_then(Value::as_str) == Some("success") {
        return Ok(value);
    }
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request was not successful")
        .to_string();
    Err(GatewayError::Rejected(message))
}

/// Extracts `message` from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn resolve_identity(&self) -> Result<Identity, GatewayError> {
        if let Some(identity) = &self.employee_id {
            return Ok(identity.clone());
        }
        let url = self.url("/current_user");
        let body: IdentityBody = self
            .send_json("resolve_identity", self.max_attempts, || self.client.get(&url))
            .await?;
        Ok(Identity(body.employee_id))
    }

    async fn fetch_pending_updates(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ProjectUpdate>, GatewayError> {
        let url = self.url("/get_pending_updates");
        let body: PendingBody = self
            .send_json("fetch_pending_updates", self.max_attempts, || {
                self.client
                    .get(&url)
                    .query(&[("employee_id", identity.0.as_str())])
            })
            .await?;
        Ok(body.projects)
    }

    async fn discard_project(
        &self,
        identity: &Identity,
        project_number: &ProjectNumber,
    ) -> Result<(), GatewayError> {
        let url = self.url("/discard");
        let body = DiscardBody {
            employee_id: identity,
            project_id: project_number,
        };
        self.send_ack("discard_project", self.max_attempts, || {
            self.client.post(&url).json(&body)
        })
        .await
    }

    async fn commit_updates(&self, request: &CommitRequest) -> Result<(), GatewayError> {
        let url = self.url("/commit_updates");
        self.send_ack("commit_updates", 1, || self.client.post(&url).json(request))
            .await
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), GatewayError> {
        let url = self.url("/feedback");
        self.send_ack("submit_feedback", 1, || self.client.post(&url).json(feedback))
            .await
    }

    async fn fetch_final_document(&self, identity: &Identity) -> Result<Bytes, GatewayError> {
        let url = self.url(&format!("/resume/{}/document", identity));
        let response = self
            .send("fetch_final_document", self.max_attempts, || {
                self.client.get(&url)
            })
            .await?;
        Ok(response.bytes().await?)
    }
}
