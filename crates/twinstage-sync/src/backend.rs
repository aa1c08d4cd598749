//! Backend seam — everything the sync client needs from the hosted
//! database, behind one trait so widgets run against the real service,
//! an in-memory double, or nothing at all.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use twinstage_core::Result;

/// Stream of full row images for a subscribed table, delivered in the
/// order the backend emits them (at-least-once, in-order per row).
pub struct RowUpdates {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl RowUpdates {
    pub fn new(rx: mpsc::UnboundedReceiver<Value>) -> Self {
        Self { rx }
    }

    /// Next row image, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Non-blocking variant: a row image if one is already queued.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }
}

/// Operations against the hosted session-row store.
///
/// `update_guarded` is the election primitive: the patch is applied only
/// where `guard_column` still equals `expected`, and `Ok(false)` means
/// the guard did not match (somebody else's write landed first). That is
/// an expected outcome, never an error.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Fetch the singleton row of `table`.
    async fn fetch_singleton(&self, table: &str) -> Result<Value>;

    /// Unconditionally patch the row with the given fields.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()>;

    /// Patch the row only if `guard_column` still holds `expected`.
    async fn update_guarded(
        &self,
        table: &str,
        id: &str,
        patch: Value,
        guard_column: &str,
        expected: &Value,
    ) -> Result<bool>;

    /// Open a push subscription for update events on `table`.
    async fn subscribe(&self, table: &str) -> Result<RowUpdates>;
}
