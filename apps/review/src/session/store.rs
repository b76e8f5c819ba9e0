//! Session Store: the single source of truth for one review visit.
//!
//! Every method here is a synchronous, all-or-nothing transition. Nothing in
//! this module awaits; the orchestrator calls in once a gateway call has
//! completed, under the store's write lock.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::ReviewError;
use crate::gateway::CommitRequest;
use crate::models::project::{DiscardState, Identity, ProjectNumber, ProjectUpdate};
use crate::session::view::ViewState;

/// What a completed discard did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardOutcome {
    /// Backend acknowledged; the entry is gone.
    Removed,
    /// Backend failed; the entry is `Active` again with its `discard_error` set.
    Reverted,
    /// A commit started while the discard was in flight. The commit snapshot
    /// wins, so the entry stays (back in `Active` unless the session succeeded).
    /// A backend failure is still recorded on the entry.
    Superseded,
    /// The session was closed or reloaded before the result arrived.
    Stale,
}

/// Read-only copy of the session handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub view_state: ViewState,
    pub identity: Option<Identity>,
    pub projects: Vec<ProjectUpdate>,
    /// Banner shown on the review screen after a failed commit.
    pub commit_error: Option<String>,
    pub can_commit: bool,
    pub discard_controls_enabled: bool,
}

impl SessionSnapshot {
    pub fn project(&self, project_number: &ProjectNumber) -> Option<&ProjectUpdate> {
        self.projects
            .iter()
            .find(|p| p.project_number() == project_number)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    epoch: u64,
    load_started: bool,
    identity: Option<Identity>,
    view_state: ViewState,
    commit_error: Option<String>,
    projects: Vec<ProjectUpdate>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            load_started: false,
            identity: None,
            view_state: ViewState::Loading,
            commit_error: None,
            projects: Vec::new(),
        }
    }

    /// Discards everything and starts a new session in `Loading`.
    /// Results of calls issued before the reset carry an older epoch.
    pub fn reset(&mut self) {
        *self = Self {
            epoch: self.epoch + 1,
            ..Self::new()
        };
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn projects(&self) -> &[ProjectUpdate] {
        &self.projects
    }

    pub fn project(&self, project_number: &ProjectNumber) -> Option<&ProjectUpdate> {
        self.projects
            .iter()
            .find(|p| p.project_number() == project_number)
    }

    /// The message to show: the fatal error on the error screen, or the
    /// retryable commit banner on the review screen.
    pub fn error_message(&self) -> Option<&str> {
        match &self.view_state {
            ViewState::Error { message } => Some(message),
            _ => self.commit_error.as_deref(),
        }
    }

    pub fn can_commit(&self) -> bool {
        self.view_state == ViewState::Review
    }

    /// Discard entry points are live only on the review screen; they go dark
    /// the instant a commit starts.
    pub fn discard_controls_enabled(&self) -> bool {
        self.view_state == ViewState::Review
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            view_state: self.view_state.clone(),
            identity: self.identity.clone(),
            projects: self.projects.clone(),
            commit_error: self.commit_error.clone(),
            can_commit: self.can_commit(),
            discard_controls_enabled: self.discard_controls_enabled(),
        }
    }

    // ── initialization ──────────────────────────────────────────────────────

    /// Marks the load sequence as started. A session loads exactly once.
    pub fn begin_load(&mut self) -> Result<u64, ReviewError> {
        if self.load_started || self.view_state != ViewState::Loading {
            return Err(self.invalid("initialize"));
        }
        self.load_started = true;
        Ok(self.epoch)
    }

    pub fn set_identity(&mut self, identity: Identity) -> Result<(), ReviewError> {
        if self.identity.is_some() || self.view_state != ViewState::Loading {
            return Err(self.invalid("resolve_identity"));
        }
        self.identity = Some(identity);
        Ok(())
    }

    /// Installs the loaded pending set and leaves `Loading`.
    /// Duplicate project numbers keep their first occurrence.
    pub fn populate(&mut self, projects: Vec<ProjectUpdate>) -> Result<&ViewState, ReviewError> {
        if self.view_state != ViewState::Loading {
            return Err(self.invalid("populate"));
        }
        if self.identity.is_none() {
            return Err(ReviewError::IdentityUnresolved);
        }

        let mut seen = HashSet::new();
        self.projects = projects
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.project_number().clone());
                if !fresh {
                    warn!("Dropping duplicate pending update {}", p.project_number());
                }
                fresh
            })
            .collect();

        self.view_state = if self.projects.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Review
        };
        Ok(&self.view_state)
    }

    pub fn fail_load(&mut self, message: impl Into<String>) -> Result<(), ReviewError> {
        if self.view_state != ViewState::Loading {
            return Err(self.invalid("fail_load"));
        }
        self.view_state = ViewState::Error {
            message: message.into(),
        };
        Ok(())
    }

    // ── local edits ─────────────────────────────────────────────────────────

    /// Replaces a project's text. Never leaves the client until commit.
    pub fn update_content(
        &mut self,
        project_number: &ProjectNumber,
        text: impl Into<String>,
    ) -> Result<(), ReviewError> {
        if self.view_state != ViewState::Review {
            return Err(self.invalid("update_content"));
        }
        let project = self.project_mut(project_number)?;
        project.set_content(text.into());
        debug!("Edited content of {project_number}");
        Ok(())
    }

    // ── discard gate ────────────────────────────────────────────────────────

    /// `Active -> ConfirmPending`. Clears any error left by a failed attempt.
    pub fn request_discard(&mut self, project_number: &ProjectNumber) -> Result<(), ReviewError> {
        if self.view_state != ViewState::Review {
            return Err(self.invalid("request_discard"));
        }
        let project = self.project_mut(project_number)?;
        match project.discard_state() {
            DiscardState::Active => {
                project.set_discard_state(DiscardState::ConfirmPending);
                project.set_discard_error(None);
                Ok(())
            }
            DiscardState::ConfirmPending => Ok(()),
            DiscardState::Discarding => Err(ReviewError::DiscardInFlight(project_number.clone())),
        }
    }

    /// `ConfirmPending -> Active`; anything else is left alone.
    pub fn cancel_discard(&mut self, project_number: &ProjectNumber) -> Result<(), ReviewError> {
        if !matches!(self.view_state, ViewState::Review | ViewState::Saving) {
            return Err(self.invalid("cancel_discard"));
        }
        let project = self.project_mut(project_number)?;
        if project.discard_state() == DiscardState::ConfirmPending {
            project.set_discard_state(DiscardState::Active);
        }
        Ok(())
    }

    /// `ConfirmPending -> Discarding`. Returns the identity the gateway call needs.
    pub fn begin_discard(&mut self, project_number: &ProjectNumber) -> Result<Identity, ReviewError> {
        if self.view_state != ViewState::Review {
            return Err(self.invalid("confirm_discard"));
        }
        let identity = self.require_identity()?.clone();
        let project = self.project_mut(project_number)?;
        match project.discard_state() {
            DiscardState::ConfirmPending => {
                project.set_discard_state(DiscardState::Discarding);
                Ok(identity)
            }
            DiscardState::Discarding => Err(ReviewError::DiscardInFlight(project_number.clone())),
            found => Err(ReviewError::DiscardNotConfirmable {
                project: project_number.clone(),
                found: found.as_str(),
            }),
        }
    }

    /// Applies the backend's answer to a discard started by `begin_discard`.
    pub fn complete_discard(
        &mut self,
        project_number: &ProjectNumber,
        result: Result<(), String>,
    ) -> DiscardOutcome {
        if self.view_state == ViewState::Success {
            return DiscardOutcome::Superseded;
        }
        let Some(index) = self
            .projects
            .iter()
            .position(|p| p.project_number() == project_number)
        else {
            return DiscardOutcome::Stale;
        };
        if self.projects[index].discard_state() != DiscardState::Discarding {
            return DiscardOutcome::Stale;
        }

        if self.view_state == ViewState::Saving {
            let project = &mut self.projects[index];
            project.set_discard_state(DiscardState::Active);
            if let Err(message) = result {
                project.set_discard_error(Some(message));
            }
            return DiscardOutcome::Superseded;
        }

        match result {
            Ok(()) => {
                self.projects.remove(index);
                DiscardOutcome::Removed
            }
            Err(message) => {
                let project = &mut self.projects[index];
                project.set_discard_state(DiscardState::Active);
                project.set_discard_error(Some(message));
                DiscardOutcome::Reverted
            }
        }
    }

    // ── commit ──────────────────────────────────────────────────────────────

    /// `Review -> Saving`, snapshotting the remaining projects into the commit payload.
    pub fn begin_commit(&mut self) -> Result<CommitRequest, ReviewError> {
        if self.view_state != ViewState::Review {
            return Err(self.invalid("commit"));
        }
        let identity = self.require_identity()?.clone();
        let request = CommitRequest::from_projects(identity, &self.projects);
        self.view_state = ViewState::Saving;
        self.commit_error = None;
        Ok(request)
    }

    /// `Saving -> Success` on success, `Saving -> Review` with a banner on failure.
    pub fn complete_commit(&mut self, result: Result<(), String>) -> Result<(), ReviewError> {
        if self.view_state != ViewState::Saving {
            return Err(self.invalid("complete_commit"));
        }
        match result {
            Ok(()) => {
                self.view_state = ViewState::Success;
                self.commit_error = None;
            }
            Err(message) => {
                self.view_state = ViewState::Review;
                self.commit_error = Some(message);
            }
        }
        Ok(())
    }

    pub fn require_identity(&self) -> Result<&Identity, ReviewError> {
        debug_assert!(
            self.identity.is_some(),
            "identity must be resolved before per-item or commit operations"
        );
        self.identity.as_ref().ok_or(ReviewError::IdentityUnresolved)
    }

    fn project_mut(
        &mut self,
        project_number: &ProjectNumber,
    ) -> Result<&mut ProjectUpdate, ReviewError> {
        self.projects
            .iter_mut()
            .find(|p| p.project_number() == project_number)
            .ok_or_else(|| ReviewError::UnknownProject(project_number.clone()))
    }

    fn invalid(&self, operation: &'static str) -> ReviewError {
        ReviewError::InvalidState {
            operation,
            state: self.view_state.name(),
        }
    }
}
