//! Cross-client session synchronization over a hosted singleton row.
//!
//! Each widget shares one pre-provisioned database row. A client reads
//! it once, subscribes to update events, and replays remote transitions
//! into its local sequencer. Writes are either gated behind controller
//! election (cascade) or open with local-action suppression (deck).

pub mod backend;
pub mod client;
pub mod memory;
pub mod rest;
pub mod row;

pub use backend::{RowUpdates, SessionBackend};
pub use client::{LocalActionGuard, SessionSync, WritePolicy};
pub use memory::MemoryBackend;
pub use rest::RestBackend;
pub use row::{CascadeRow, CascadeState, DeckRow, RESTART_SENTINEL};
