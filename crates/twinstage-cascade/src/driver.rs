//! Driver loop — multiplexes user commands, remote row updates, and the
//! engine's scheduled timer over one task.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use twinstage_sync::backend::RowUpdates;
use twinstage_sync::{CascadeRow, SessionSync};

use crate::engine::CascadeEngine;
use crate::scenario::{ScenarioKind, TwinKind};

/// User input reaching the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeCommand {
    Start(ScenarioKind),
    OpenAdvisory(TwinKind),
    Resolve,
    Reset,
}

async fn next_update(updates: &mut Option<RowUpdates>) -> Option<serde_json::Value> {
    match updates {
        Some(u) => u.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

/// Run the cascade widget until cancelled or the command channel closes.
/// Teardown releases controller status so the session does not stay
/// locked to a navigated-away client.
pub async fn run_cascade(
    mut engine: CascadeEngine,
    mut sync: SessionSync,
    mut commands: mpsc::UnboundedReceiver<CascadeCommand>,
    cancel: CancellationToken,
) {
    let mut updates = sync.take_updates();
    info!(connected = sync.is_connected(), "Cascade driver started");

    loop {
        let deadline = engine.pending_deadline();
        tokio::select! {
            _ = cancel.cancelled() => {
                sync.release(CascadeRow::patch_idle()).await;
                info!("Cascade driver stopped");
                return;
            }

            cmd = commands.recv() => match cmd {
                Some(CascadeCommand::Start(kind)) => {
                    engine.start(kind, &mut sync).await;
                }
                Some(CascadeCommand::OpenAdvisory(twin)) => engine.open_advisory(twin),
                Some(CascadeCommand::Resolve) => engine.show_resolution(&mut sync).await,
                Some(CascadeCommand::Reset) => engine.reset(&mut sync).await,
                None => {
                    sync.release(CascadeRow::patch_idle()).await;
                    info!("Command channel closed, cascade driver stopped");
                    return;
                }
            },

            row = next_update(&mut updates) => match row {
                Some(value) => {
                    if !sync.should_replay() {
                        debug!("Ignoring own session echo");
                        continue;
                    }
                    match CascadeRow::from_value(&value) {
                        Ok(row) => engine.apply_remote(&row, &mut sync).await,
                        Err(e) => warn!(%e, "Malformed session row"),
                    }
                }
                None => {
                    warn!("Realtime updates ended, continuing local-only");
                    updates = None;
                }
            },

            _ = sleep_until(deadline) => {
                if let Some(event) = engine.take_due() {
                    engine.on_timer(event, &mut sync).await;
                }
            }
        }
    }
}
