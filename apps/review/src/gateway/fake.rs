//! Scripted in-memory gateway for session tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

use super::{BackendGateway, CommitRequest, GatewayError};
use crate::models::feedback::Feedback;
use crate::models::project::{Identity, ProjectNumber, ProjectUpdate};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ResolveIdentity,
    FetchPending(Identity),
    Discard(ProjectNumber),
    Commit(CommitRequest),
    Feedback(Feedback),
    Document(Identity),
}

/// Outcome a held discard is released with.
pub(crate) type Release = oneshot::Sender<bool>;

pub(crate) struct FakeGateway {
    identity: Mutex<Option<Identity>>,
    pending: Option<Vec<ProjectUpdate>>,
    failing_discards: Mutex<HashSet<ProjectNumber>>,
    held_discards: Mutex<HashMap<ProjectNumber, oneshot::Receiver<bool>>>,
    held_fetch: Mutex<Option<oneshot::Receiver<bool>>>,
    held_commit: Mutex<Option<oneshot::Receiver<bool>>>,
    fail_commit: Mutex<bool>,
    fail_feedback: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub(crate) fn with_projects(projects: Vec<ProjectUpdate>) -> Self {
        Self {
            identity: Mutex::new(Some(Identity::from("99999"))),
            pending: Some(projects),
            failing_discards: Mutex::new(HashSet::new()),
            held_discards: Mutex::new(HashMap::new()),
            held_fetch: Mutex::new(None),
            held_commit: Mutex::new(None),
            fail_commit: Mutex::new(false),
            fail_feedback: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn without_identity() -> Self {
        let gateway = Self::with_projects(Vec::new());
        gateway.set_identity(None);
        gateway
    }

    pub(crate) fn set_identity(&self, identity: Option<Identity>) {
        *self.identity.lock().unwrap() = identity;
    }

    pub(crate) fn failing_fetch() -> Self {
        Self {
            pending: None,
            ..Self::with_projects(Vec::new())
        }
    }

    pub(crate) fn fail_discard_of(&self, project: &str) {
        self.failing_discards
            .lock()
            .unwrap()
            .insert(ProjectNumber::from(project));
    }

    pub(crate) fn set_fail_commit(&self, fail: bool) {
        *self.fail_commit.lock().unwrap() = fail;
    }

    pub(crate) fn set_fail_feedback(&self, fail: bool) {
        *self.fail_feedback.lock().unwrap() = fail;
    }

    /// Holds the next discard of `project` open until the returned sender fires.
    /// `true` acknowledges the discard, `false` (or dropping the sender) fails it.
    pub(crate) fn hold_discard(&self, project: &str) -> Release {
        let (tx, rx) = oneshot::channel();
        self.held_discards
            .lock()
            .unwrap()
            .insert(ProjectNumber::from(project), rx);
        tx
    }

    /// Holds the next pending-set fetch open. Later fetches answer immediately.
    pub(crate) fn hold_fetch(&self) -> Release {
        let (tx, rx) = oneshot::channel();
        *self.held_fetch.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn hold_commit(&self) -> Release {
        let (tx, rx) = oneshot::channel();
        *self.held_commit.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn has_call(&self, call: &Call) -> bool {
        self.calls.lock().unwrap().contains(call)
    }

    pub(crate) fn commits(&self) -> Vec<CommitRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Commit(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Yields until `call` has been recorded, so a spawned task is parked at the gateway.
    pub(crate) async fn wait_for(&self, call: &Call) {
        for _ in 0..1000 {
            if self.has_call(call) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("gateway never saw {call:?}");
    }

    pub(crate) async fn wait_for_commit(&self) {
        for _ in 0..1000 {
            if !self.commits().is_empty() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("gateway never saw a commit");
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn rejected(message: &str) -> GatewayError {
    GatewayError::Rejected(message.to_string())
}

#[async_trait]
impl BackendGateway for FakeGateway {
    async fn resolve_identity(&self) -> Result<Identity, GatewayError> {
        self.record(Call::ResolveIdentity);
        let identity = self.identity.lock().unwrap().clone();
        identity.ok_or_else(|| rejected("no current user"))
    }

    async fn fetch_pending_updates(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ProjectUpdate>, GatewayError> {
        self.record(Call::FetchPending(identity.clone()));
        let held = self.held_fetch.lock().unwrap().take();
        if let Some(rx) = held {
            if !matches!(rx.await, Ok(true)) {
                return Err(rejected("Failed to load updates"));
            }
        }
        self.pending
            .clone()
            .ok_or_else(|| rejected("Failed to load updates"))
    }

    async fn discard_project(
        &self,
        _identity: &Identity,
        project_number: &ProjectNumber,
    ) -> Result<(), GatewayError> {
        self.record(Call::Discard(project_number.clone()));
        let held = self.held_discards.lock().unwrap().remove(project_number);
        if let Some(rx) = held {
            return match rx.await {
                Ok(true) => Ok(()),
                _ => Err(rejected("Failed to discard update")),
            };
        }
        if self.failing_discards.lock().unwrap().contains(project_number) {
            return Err(rejected("Failed to discard update"));
        }
        Ok(())
    }

    async fn commit_updates(&self, request: &CommitRequest) -> Result<(), GatewayError> {
        self.record(Call::Commit(request.clone()));
        let held = self.held_commit.lock().unwrap().take();
        if let Some(rx) = held {
            return match rx.await {
                Ok(true) => Ok(()),
                _ => Err(rejected("commit failed")),
            };
        }
        if *self.fail_commit.lock().unwrap() {
            return Err(GatewayError::Api {
                status: 500,
                message: "commit failed".to_string(),
            });
        }
        Ok(())
    }

    async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), GatewayError> {
        self.record(Call::Feedback(feedback.clone()));
        if *self.fail_feedback.lock().unwrap() {
            return Err(rejected("feedback store offline"));
        }
        Ok(())
    }

    async fn fetch_final_document(&self, identity: &Identity) -> Result<Bytes, GatewayError> {
        self.record(Call::Document(identity.clone()));
        Ok(Bytes::from_static(b"%PDF-1.7"))
    }
}
