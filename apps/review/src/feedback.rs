//! Feedback side-channel.
//!
//! Shares nothing with the review session except the gateway: it can be used
//! while the session is loading, saving or failed, and its own failures stay here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::ReviewError;
use crate::gateway::BackendGateway;
use crate::models::feedback::{Feedback, FeedbackCategory};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Idle,
    Submitting,
    Submitted { at: DateTime<Utc> },
    Failed { message: String },
}

impl FeedbackStatus {
    fn name(&self) -> &'static str {
        match self {
            FeedbackStatus::Idle => "idle",
            FeedbackStatus::Submitting => "submitting",
            FeedbackStatus::Submitted { .. } => "submitted",
            FeedbackStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone)]
pub struct FeedbackChannel {
    gateway: Arc<dyn BackendGateway>,
    status: Arc<RwLock<FeedbackStatus>>,
}

impl FeedbackChannel {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            gateway,
            status: Arc::new(RwLock::new(FeedbackStatus::Idle)),
        }
    }

    pub async fn status(&self) -> FeedbackStatus {
        self.status.read().await.clone()
    }

    /// Sends one piece of feedback. Blank text is rejected before anything is
    /// sent; a second submission while one is pending is rejected.
    pub async fn submit(
        &self,
        category: FeedbackCategory,
        text: impl Into<String>,
    ) -> Result<(), ReviewError> {
        let feedback = Feedback::new(category, text)?;
        {
            let mut status = self.status.write().await;
            if *status == FeedbackStatus::Submitting {
                return Err(ReviewError::InvalidState {
                    operation: "submit_feedback",
                    state: status.name(),
                });
            }
            *status = FeedbackStatus::Submitting;
        }

        let result = self.gateway.submit_feedback(&feedback).await;

        let mut status = self.status.write().await;
        match result {
            Ok(()) => {
                info!("Feedback submitted ({:?})", feedback.category);
                *status = FeedbackStatus::Submitted { at: Utc::now() };
                Ok(())
            }
            Err(e) => {
                warn!("Failed to submit feedback: {e}");
                *status = FeedbackStatus::Failed {
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    /// Fire-and-forget variant of [`submit`](Self::submit). The outcome lands in `status`.
    pub fn spawn_submit(
        &self,
        category: FeedbackCategory,
        text: impl Into<String>,
    ) -> JoinHandle<Result<(), ReviewError>> {
        let channel = self.clone();
        let text = text.into();
        tokio::spawn(async move { channel.submit(category, text).await })
    }

    /// Clears a finished submission so the form can be reused.
    pub async fn reset(&self) {
        let mut status = self.status.write().await;
        if *status != FeedbackStatus::Submitting {
            *status = FeedbackStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::{Call, FakeGateway};

    fn channel() -> (Arc<FakeGateway>, FeedbackChannel) {
        let gateway = Arc::new(FakeGateway::with_projects(vec![]));
        (gateway.clone(), FeedbackChannel::new(gateway))
    }

    #[tokio::test]
    async fn test_submit_success() {
        let (gateway, channel) = channel();
        channel
            .submit(FeedbackCategory::Feature, "Let me reorder projects")
            .await
            .unwrap();

        assert!(matches!(channel.status().await, FeedbackStatus::Submitted { .. }));
        assert_eq!(
            gateway.calls(),
            vec![Call::Feedback(
                Feedback::new(FeedbackCategory::Feature, "Let me reorder projects").unwrap()
            )]
        );

        channel.reset().await;
        assert_eq!(channel.status().await, FeedbackStatus::Idle);
    }

    #[tokio::test]
    async fn test_blank_feedback_never_sent() {
        let (gateway, channel) = channel();
        let err = channel.submit(FeedbackCategory::General, "  ").await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(gateway.calls().is_empty());
        assert_eq!(channel.status().await, FeedbackStatus::Idle);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_on_the_channel() {
        let (gateway, channel) = channel();
        gateway.set_fail_feedback(true);

        let handle = channel.spawn_submit(FeedbackCategory::Bug, "Spinner never stops");
        assert!(handle.await.unwrap().is_err());

        match channel.status().await {
            FeedbackStatus::Failed { message } => assert!(message.contains("feedback store offline")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
