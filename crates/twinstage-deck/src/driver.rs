//! Driver loop — user commands, remote row updates, and the audio poll.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use twinstage_sync::backend::RowUpdates;
use twinstage_sync::{DeckRow, SessionSync};

use crate::engine::DeckEngine;

/// User input reaching the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckCommand {
    Advance,
    Finish,
    Restart,
}

/// The narration position changes continuously; we sample it.
const AUDIO_POLL: Duration = Duration::from_millis(250);

async fn next_update(updates: &mut Option<RowUpdates>) -> Option<serde_json::Value> {
    match updates {
        Some(u) => u.recv().await,
        None => std::future::pending().await,
    }
}

/// Run the deck widget until cancelled or the command channel closes.
pub async fn run_deck(
    mut engine: DeckEngine,
    mut sync: SessionSync,
    mut commands: mpsc::UnboundedReceiver<DeckCommand>,
    cancel: CancellationToken,
) {
    let mut updates = sync.take_updates();
    let mut poll = tokio::time::interval(AUDIO_POLL);
    engine.prepare();
    info!(connected = sync.is_connected(), "Deck driver started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Deck driver stopped");
                return;
            }

            cmd = commands.recv() => match cmd {
                Some(DeckCommand::Advance) => engine.start(&sync).await,
                Some(DeckCommand::Finish) => engine.finish(),
                Some(DeckCommand::Restart) => engine.restart(&sync).await,
                None => {
                    info!("Command channel closed, deck driver stopped");
                    return;
                }
            },

            row = next_update(&mut updates) => match row {
                Some(value) => {
                    if !sync.should_replay() {
                        debug!("Applying a remote update, echo ignored");
                        continue;
                    }
                    match DeckRow::from_value(&value) {
                        Ok(row) => engine.apply_remote(&row, &sync).await,
                        Err(e) => warn!(%e, "Malformed session row"),
                    }
                }
                None => {
                    warn!("Realtime updates ended, continuing local-only");
                    updates = None;
                }
            },

            _ = poll.tick() => engine.poll_audio().await,
        }
    }
}
