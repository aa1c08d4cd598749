//! Session sync client — connection lifecycle, controller election,
//! best-effort publishing, and self-echo suppression.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::backend::{RowUpdates, SessionBackend};

/// Who may write progression fields to the shared row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Writes require holding controller status (cascade widget).
    Controller,
    /// Any client writes; replay loops are broken by the local-action
    /// suppression flag instead (deck widget).
    Open,
}

/// Client for one widget's shared session row.
///
/// Sync is best-effort throughout: a failed connect leaves the client in
/// local-only mode, and every later remote call logs and degrades rather
/// than surfacing into the widget's control flow.
pub struct SessionSync {
    backend: Arc<dyn SessionBackend>,
    table: String,
    client_id: String,
    policy: WritePolicy,
    row_id: Option<String>,
    controller: bool,
    local_action: Arc<AtomicBool>,
    updates: Option<RowUpdates>,
}

/// RAII flag marking "currently applying a remote update". While held,
/// the client neither publishes nor replays — the open-policy equivalent
/// of controller self-echo filtering.
pub struct LocalActionGuard {
    flag: Arc<AtomicBool>,
}

impl LocalActionGuard {
    fn new(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for LocalActionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SessionSync {
    /// Fetch the singleton row and open the update subscription.
    ///
    /// Never fails: any backend error is logged and the client comes up
    /// in local-only mode, where every remote operation is a no-op.
    pub async fn connect(
        backend: Arc<dyn SessionBackend>,
        table: impl Into<String>,
        client_id: impl Into<String>,
        policy: WritePolicy,
    ) -> Self {
        let table = table.into();
        let client_id = client_id.into();

        let mut sync = Self {
            backend,
            table,
            client_id,
            policy,
            row_id: None,
            controller: false,
            local_action: Arc::new(AtomicBool::new(false)),
            updates: None,
        };

        let row = match sync.backend.fetch_singleton(&sync.table).await {
            Ok(row) => row,
            Err(e) => {
                warn!(table = %sync.table, %e, "Session fetch failed, running local-only");
                return sync;
            }
        };
        let Some(id) = row.get("id").map(id_string) else {
            warn!(table = %sync.table, "Session row has no id, running local-only");
            return sync;
        };

        match sync.backend.subscribe(&sync.table).await {
            Ok(updates) => sync.updates = Some(updates),
            Err(e) => {
                warn!(table = %sync.table, %e, "Subscribe failed, running local-only");
                return sync;
            }
        }

        info!(table = %sync.table, session = %id, "Connected to session");
        sync.row_id = Some(id);
        sync
    }

    pub fn is_connected(&self) -> bool {
        self.row_id.is_some()
    }

    pub fn is_controller(&self) -> bool {
        self.controller
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.row_id.as_deref()
    }

    /// Try to become the session controller.
    ///
    /// Reads the current `controller_id`; when vacant, claims it with an
    /// update guarded on the observed value, so a racing claim lands for
    /// exactly one client. Losing the race is `false`, not an error.
    /// In local-only mode the election trivially succeeds.
    pub async fn acquire_controller(&mut self) -> bool {
        if self.controller {
            return true;
        }
        let Some(row_id) = self.row_id.clone() else {
            debug!(table = %self.table, "Local-only mode, assuming control");
            self.controller = true;
            return true;
        };

        let row = match self.backend.fetch_singleton(&self.table).await {
            Ok(row) => row,
            Err(e) => {
                warn!(table = %self.table, %e, "Controller check failed");
                return false;
            }
        };
        let observed = row.get("controller_id").cloned().unwrap_or(Value::Null);

        // Legacy rows carry the literal string "null"; both forms count
        // as vacant and both remain valid CAS guards.
        let vacant = observed.is_null() || observed == json!("null");
        if !vacant {
            debug!(table = %self.table, holder = %observed, "Someone else has control");
            return false;
        }

        match self
            .backend
            .update_guarded(
                &self.table,
                &row_id,
                json!({ "controller_id": self.client_id }),
                "controller_id",
                &observed,
            )
            .await
        {
            Ok(true) => {
                info!(table = %self.table, client = %self.client_id, "Control acquired");
                self.controller = true;
                true
            }
            Ok(false) => {
                debug!(table = %self.table, "Lost controller election");
                false
            }
            Err(e) => {
                warn!(table = %self.table, %e, "Controller election failed");
                false
            }
        }
    }

    /// Write progression fields to the row. Best-effort: skipped while
    /// applying a remote update, skipped without controller status under
    /// `WritePolicy::Controller`, and transport failures are logged,
    /// never raised.
    pub async fn publish(&self, patch: Value) {
        if self.local_action.load(Ordering::SeqCst) {
            debug!(table = %self.table, "Applying remote update, publish suppressed");
            return;
        }
        let Some(row_id) = self.row_id.as_deref() else {
            debug!(table = %self.table, "Local-only mode, publish skipped");
            return;
        };
        if self.policy == WritePolicy::Controller && !self.controller {
            debug!(table = %self.table, "Not controller, publish skipped");
            return;
        }
        if let Err(e) = self.backend.update(&self.table, row_id, patch).await {
            warn!(table = %self.table, %e, "Session update failed");
        }
    }

    /// Write the idle payload and give up controller status.
    ///
    /// The local controller flag is cleared even when the remote write
    /// fails.
    pub async fn release(&mut self, idle_patch: Value) {
        let was_controller = self.controller;
        self.controller = false;

        if !was_controller {
            return;
        }
        let Some(row_id) = self.row_id.as_deref() else {
            return;
        };
        match self.backend.update(&self.table, row_id, idle_patch).await {
            Ok(()) => info!(table = %self.table, "Control released"),
            Err(e) => warn!(table = %self.table, %e, "Release write failed"),
        }
    }

    /// Take the row-update receiver. The driver loop owns it from here.
    pub fn take_updates(&mut self) -> Option<RowUpdates> {
        self.updates.take()
    }

    /// Whether an incoming row image should be replayed locally.
    /// Controllers are the source of truth and never replay their own
    /// echoed writes; open-policy clients suppress replay while a
    /// local-action guard is held.
    pub fn should_replay(&self) -> bool {
        match self.policy {
            WritePolicy::Controller => !self.controller,
            WritePolicy::Open => !self.local_action.load(Ordering::SeqCst),
        }
    }

    /// Mark the start of a locally-applied remote update.
    pub fn begin_local_action(&self) -> LocalActionGuard {
        LocalActionGuard::new(self.local_action.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::row::CascadeRow;
    use async_trait::async_trait;
    use twinstage_core::{Result, TwinstageError};

    async fn seeded_backend() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed(
                "cascade_session",
                json!({ "id": "s1", "controller_id": null, "state": "idle" }),
            )
            .await;
        backend
    }

    #[tokio::test]
    async fn test_election_single_winner() {
        let backend = seeded_backend().await;
        let mut a = SessionSync::connect(
            backend.clone(),
            "cascade_session",
            "client-a",
            WritePolicy::Controller,
        )
        .await;
        let mut b = SessionSync::connect(
            backend.clone(),
            "cascade_session",
            "client-b",
            WritePolicy::Controller,
        )
        .await;

        assert!(a.acquire_controller().await);
        assert!(!b.acquire_controller().await);
        assert!(a.is_controller());
        assert!(!b.is_controller());

        // Re-acquiring while holding control is a no-op success.
        assert!(a.acquire_controller().await);
    }

    #[tokio::test]
    async fn test_literal_null_string_counts_as_vacant() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed(
                "cascade_session",
                json!({ "id": "s1", "controller_id": "null" }),
            )
            .await;
        let mut sync = SessionSync::connect(
            backend.clone(),
            "cascade_session",
            "client-a",
            WritePolicy::Controller,
        )
        .await;

        assert!(sync.acquire_controller().await);
        let row = backend.row("cascade_session").await.unwrap();
        assert_eq!(row["controller_id"], "client-a");
    }

    #[tokio::test]
    async fn test_publish_requires_controller_under_controller_policy() {
        let backend = seeded_backend().await;
        let sync = SessionSync::connect(
            backend.clone(),
            "cascade_session",
            "client-a",
            WritePolicy::Controller,
        )
        .await;

        sync.publish(json!({ "state": "showing_impact" })).await;
        let row = backend.row("cascade_session").await.unwrap();
        assert_eq!(row["state"], "idle");
    }

    #[tokio::test]
    async fn test_open_policy_publishes_without_election() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("deck_session", json!({ "id": "d1", "current_slide": -1 }))
            .await;
        let sync =
            SessionSync::connect(backend.clone(), "deck_session", "client-a", WritePolicy::Open)
                .await;

        sync.publish(json!({ "current_slide": 0 })).await;
        let row = backend.row("deck_session").await.unwrap();
        assert_eq!(row["current_slide"], 0);
    }

    #[tokio::test]
    async fn test_local_action_guard_suppresses_publish_and_replay() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("deck_session", json!({ "id": "d1", "current_slide": -1 }))
            .await;
        let sync =
            SessionSync::connect(backend.clone(), "deck_session", "client-a", WritePolicy::Open)
                .await;

        {
            let _guard = sync.begin_local_action();
            assert!(!sync.should_replay());
            sync.publish(json!({ "current_slide": 3 })).await;
        }
        assert!(sync.should_replay());
        let row = backend.row("deck_session").await.unwrap();
        assert_eq!(row["current_slide"], -1);
    }

    #[tokio::test]
    async fn test_local_only_mode_is_inert() {
        // Nothing seeded: the fetch fails and the client degrades.
        let backend = Arc::new(MemoryBackend::new());
        let mut sync = SessionSync::connect(
            backend,
            "cascade_session",
            "client-a",
            WritePolicy::Controller,
        )
        .await;

        assert!(!sync.is_connected());
        assert!(sync.take_updates().is_none());
        // Local-only election succeeds so the widget stays usable.
        assert!(sync.acquire_controller().await);
        sync.publish(json!({ "state": "success" })).await;
        sync.release(CascadeRow::patch_idle()).await;
        assert!(!sync.is_controller());
    }

    struct FailingWrites {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl SessionBackend for FailingWrites {
        async fn fetch_singleton(&self, table: &str) -> Result<Value> {
            self.inner.fetch_singleton(table).await
        }

        async fn update(&self, _table: &str, _id: &str, _patch: Value) -> Result<()> {
            Err(TwinstageError::Backend("write refused".into()))
        }

        async fn update_guarded(
            &self,
            table: &str,
            id: &str,
            patch: Value,
            guard_column: &str,
            expected: &Value,
        ) -> Result<bool> {
            self.inner
                .update_guarded(table, id, patch, guard_column, expected)
                .await
        }

        async fn subscribe(&self, table: &str) -> Result<RowUpdates> {
            self.inner.subscribe(table).await
        }
    }

    #[tokio::test]
    async fn test_release_clears_flag_even_when_write_fails() {
        let inner = MemoryBackend::new();
        inner
            .seed(
                "cascade_session",
                json!({ "id": "s1", "controller_id": null }),
            )
            .await;
        let backend = Arc::new(FailingWrites { inner });

        let mut sync = SessionSync::connect(
            backend,
            "cascade_session",
            "client-a",
            WritePolicy::Controller,
        )
        .await;
        assert!(sync.acquire_controller().await);

        sync.release(CascadeRow::patch_idle()).await;
        assert!(!sync.is_controller());
        assert!(sync.should_replay());
    }
}
