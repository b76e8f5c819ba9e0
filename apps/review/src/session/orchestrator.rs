//! Review Orchestrator: binds Session Store transitions to gateway calls.
//!
//! The store lock is never held across a gateway call. Each protocol takes
//! the lock to validate and start a transition, releases it for the network
//! round trip, then takes it again to apply the result. A result is applied
//! only if the session it was issued under is still current: same epoch,
//! not closed. Completions therefore interleave at those boundaries, and
//! concurrent discards are removed in the order they complete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ReviewError;
use crate::gateway::BackendGateway;
use crate::models::project::ProjectNumber;
use crate::session::store::{DiscardOutcome, SessionSnapshot, SessionStore};
use crate::session::view::ViewState;

struct Inner {
    session_id: Uuid,
    gateway: Arc<dyn BackendGateway>,
    store: RwLock<SessionStore>,
    closed: AtomicBool,
}

/// Handle to one review session. Cheap to clone; clones share the session,
/// so per-item operations can be spawned as independent tasks.
#[derive(Clone)]
pub struct ReviewOrchestrator {
    inner: Arc<Inner>,
}

impl ReviewOrchestrator {
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id: Uuid::new_v4(),
                gateway,
                store: RwLock::new(SessionStore::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.store.read().await.snapshot()
    }

    pub async fn view_state(&self) -> ViewState {
        self.inner.store.read().await.view_state().clone()
    }

    /// Stops applying results. Anything still in flight completes against
    /// the backend but leaves the session untouched.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        debug!(session_id = %self.inner.session_id, "Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves the identity, then loads the pending set. The fetch is never
    /// attempted unless identity resolution succeeded.
    pub async fn initialize(&self) -> Result<(), ReviewError> {
        let epoch = {
            let mut store = self.write().await?;
            store.begin_load()?
        };
        info!(session_id = %self.inner.session_id, epoch, "Loading pending updates");

        let identity = match self.inner.gateway.resolve_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(session_id = %self.inner.session_id, "Identity resolution failed: {e}");
                let message = format!("Could not resolve the current user: {e}");
                if let Ok(applied) = self.apply(epoch, |store| store.fail_load(message)).await {
                    applied?;
                }
                return Err(e.into());
            }
        };
        self.apply(epoch, |store| store.set_identity(identity.clone()))
            .await??;

        match self.inner.gateway.fetch_pending_updates(&identity).await {
            Ok(projects) => {
                let count = projects.len();
                let view = self
                    .apply(epoch, |store| store.populate(projects).map(|v| v.name()))
                    .await??;
                info!(
                    session_id = %self.inner.session_id,
                    employee_id = %identity,
                    "Loaded {count} pending updates, showing {view}"
                );
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.inner.session_id, "Fetching pending updates failed: {e}");
                let message = format!("Failed to load pending updates: {e}");
                if let Ok(applied) = self.apply(epoch, |store| store.fail_load(message)).await {
                    applied?;
                }
                Err(e.into())
            }
        }
    }

    /// Starts over with a fresh session: the only way out of `Error` or `Empty`.
    /// Not available while saving or after success.
    pub async fn reload(&self) -> Result<(), ReviewError> {
        {
            let mut store = self.write().await?;
            if matches!(store.view_state(), ViewState::Saving | ViewState::Success) {
                return Err(ReviewError::InvalidState {
                    operation: "reload",
                    state: store.view_state().name(),
                });
            }
            store.reset();
            info!(session_id = %self.inner.session_id, epoch = store.epoch(), "Reloading session");
        }
        self.initialize().await
    }

    pub async fn update_content(
        &self,
        project_number: &ProjectNumber,
        text: impl Into<String>,
    ) -> Result<(), ReviewError> {
        self.write().await?.update_content(project_number, text)
    }

    pub async fn request_discard(&self, project_number: &ProjectNumber) -> Result<(), ReviewError> {
        self.write().await?.request_discard(project_number)
    }

    pub async fn cancel_discard(&self, project_number: &ProjectNumber) -> Result<(), ReviewError> {
        self.write().await?.cancel_discard(project_number)
    }

    /// Runs the confirmed discard against the backend. The entry is removed
    /// only once the backend acknowledges; a failure puts it back to `Active`
    /// with an item-level error and leaves the session on the review screen.
    /// If a commit started meanwhile, the entry stays either way, but a backend
    /// failure is still recorded on it and returned.
    pub async fn confirm_discard(
        &self,
        project_number: &ProjectNumber,
    ) -> Result<DiscardOutcome, ReviewError> {
        let (epoch, identity) = {
            let mut store = self.write().await?;
            let identity = store.begin_discard(project_number)?;
            (store.epoch(), identity)
        };
        debug!(session_id = %self.inner.session_id, "Discarding {project_number}");

        let result = self
            .inner
            .gateway
            .discard_project(&identity, project_number)
            .await;
        let reported = result.as_ref().map(|_| ()).map_err(|e| e.to_string());

        let outcome = self
            .apply(epoch, |store| store.complete_discard(project_number, reported))
            .await
            .unwrap_or(DiscardOutcome::Stale);

        match (result, outcome) {
            (Err(e), DiscardOutcome::Reverted | DiscardOutcome::Superseded) => {
                warn!(session_id = %self.inner.session_id, "Discard of {project_number} failed: {e}");
                Err(e.into())
            }
            (_, outcome) => {
                info!(session_id = %self.inner.session_id, "Discard of {project_number}: {outcome:?}");
                Ok(outcome)
            }
        }
    }

    /// Commits every remaining project with its current text. The payload is
    /// the snapshot taken here; discards finishing afterwards do not change it.
    pub async fn commit(&self) -> Result<(), ReviewError> {
        let (epoch, request) = {
            let mut store = self.write().await?;
            let request = store.begin_commit()?;
            (store.epoch(), request)
        };
        info!(
            session_id = %self.inner.session_id,
            "Committing {} projects",
            request.project_numbers.len()
        );

        let result = self.inner.gateway.commit_updates(&request).await;
        let reported = result
            .as_ref()
            .map(|_| ())
            .map_err(|e| format!("Failed to save your resume updates: {e}"));

        if let Ok(applied) = self.apply(epoch, |store| store.complete_commit(reported)).await {
            applied?;
        }

        match result {
            Ok(()) => {
                info!(session_id = %self.inner.session_id, "Resume updates committed");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.inner.session_id, "Commit failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Downloads the regenerated resume. Only reachable after a successful commit.
    pub async fn download_document(&self) -> Result<Bytes, ReviewError> {
        let identity = {
            let store = self.inner.store.read().await;
            if store.view_state() != &ViewState::Success {
                return Err(ReviewError::InvalidState {
                    operation: "download_document",
                    state: store.view_state().name(),
                });
            }
            store.require_identity()?.clone()
        };
        let document = self.inner.gateway.fetch_final_document(&identity).await?;
        info!(session_id = %self.inner.session_id, "Downloaded resume ({} bytes)", document.len());
        Ok(document)
    }

    /// Takes the write lock. `closed` is checked once the lock is held, so a
    /// `close()` that lands while waiting still wins.
    async fn write(&self) -> Result<tokio::sync::RwLockWriteGuard<'_, SessionStore>, ReviewError> {
        let store = self.inner.store.write().await;
        if self.is_closed() {
            return Err(ReviewError::SessionClosed);
        }
        Ok(store)
    }

    /// Applies a completed call's result unless the session moved on since `epoch`.
    async fn apply<T>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut SessionStore) -> T,
    ) -> Result<T, ReviewError> {
        let mut store = self.inner.store.write().await;
        if self.is_closed() {
            debug!(session_id = %self.inner.session_id, epoch, "Dropping completion for closed session");
            return Err(ReviewError::SessionClosed);
        }
        if store.epoch() != epoch {
            debug!(session_id = %self.inner.session_id, epoch, "Dropping stale completion");
            return Err(ReviewError::Superseded);
        }
        Ok(f(&mut store))
    }
}
