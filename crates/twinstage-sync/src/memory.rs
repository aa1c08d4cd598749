//! In-memory backend — drives the widget test suites and local demos.
//!
//! Mirrors the hosted service closely enough to matter: guarded updates
//! are checked under the write lock, and every committed update is
//! echoed to all subscribers, including the writer's own subscription.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use twinstage_core::{Result, TwinstageError};

use crate::backend::{RowUpdates, SessionBackend};

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Value>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision the singleton row for a table (normally done
    /// out-of-band on the hosted service).
    pub async fn seed(&self, table: &str, row: Value) {
        let mut inner = self.inner.write().await;
        inner.rows.insert(table.to_string(), row);
    }

    /// Current row image, for assertions.
    pub async fn row(&self, table: &str) -> Option<Value> {
        self.inner.read().await.rows.get(table).cloned()
    }

    fn merge(row: &mut Value, patch: &Value) {
        if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in patch {
                row.insert(k.clone(), v.clone());
            }
        }
    }

    fn broadcast(inner: &mut Inner, table: &str) {
        let Some(row) = inner.rows.get(table).cloned() else {
            return;
        };
        if let Some(subs) = inner.subscribers.get_mut(table) {
            subs.retain(|tx| tx.send(row.clone()).is_ok());
        }
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn fetch_singleton(&self, table: &str) -> Result<Value> {
        self.inner
            .read()
            .await
            .rows
            .get(table)
            .cloned()
            .ok_or_else(|| TwinstageError::Backend(format!("no row for table {table}")))
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()> {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .get_mut(table)
            .ok_or_else(|| TwinstageError::Backend(format!("no row for table {table}")))?;
        if row.get("id") != Some(&Value::from(id)) {
            return Err(TwinstageError::Backend(format!("unknown row id {id}")));
        }
        Self::merge(row, &patch);
        Self::broadcast(&mut inner, table);
        Ok(())
    }

    async fn update_guarded(
        &self,
        table: &str,
        id: &str,
        patch: Value,
        guard_column: &str,
        expected: &Value,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .get_mut(table)
            .ok_or_else(|| TwinstageError::Backend(format!("no row for table {table}")))?;
        if row.get("id") != Some(&Value::from(id)) {
            return Err(TwinstageError::Backend(format!("unknown row id {id}")));
        }
        let current = row.get(guard_column).cloned().unwrap_or(Value::Null);
        if &current != expected {
            debug!(table, guard_column, "Guarded update missed");
            return Ok(false);
        }
        Self::merge(row, &patch);
        Self::broadcast(&mut inner, table);
        Ok(true)
    }

    async fn subscribe(&self, table: &str) -> Result<RowUpdates> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        inner.subscribers.entry(table.to_string()).or_default().push(tx);
        Ok(RowUpdates::new(rx))
    }
}
