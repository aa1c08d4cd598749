//! Outbound host bridge — visibility toggles for named stage actors.
//!
//! The hosting application renders 3D/video actors by name; the widgets
//! only ever tell it to show or hide one. Fire-and-forget: no
//! acknowledgement, no retry.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message posted to the hosting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SdkMessage {
    ToggleVisibility { actor: String, visible: bool },
}

impl SdkMessage {
    pub fn toggle_visibility(actor: impl Into<String>, visible: bool) -> Self {
        Self::ToggleVisibility {
            actor: actor.into(),
            visible,
        }
    }
}

/// One-way channel to the hosting application.
pub trait HostBridge: Send + Sync {
    fn post(&self, msg: &SdkMessage);
}

/// Toggle a named actor's visibility on the host.
pub fn toggle_visibility(bridge: &dyn HostBridge, actor: &str, visible: bool) {
    debug!(actor, visible, "toggleVisibility");
    bridge.post(&SdkMessage::toggle_visibility(actor, visible));
}

/// Bridge that drops every message. Used when no host is embedding us.
pub struct NullBridge;

impl HostBridge for NullBridge {
    fn post(&self, msg: &SdkMessage) {
        debug!(?msg, "No host attached, dropping bridge message");
    }
}

/// Bridge that records every posted message, for tests and headless runs.
#[derive(Default)]
pub struct RecordingBridge {
    posted: Mutex<Vec<SdkMessage>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<SdkMessage> {
        self.posted.lock().unwrap().clone()
    }

    /// Last visibility value posted for the given actor, if any.
    pub fn last_for(&self, actor: &str) -> Option<bool> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|msg| match msg {
                SdkMessage::ToggleVisibility { actor: a, visible } if a == actor => Some(*visible),
                _ => None,
            })
    }
}

impl HostBridge for RecordingBridge {
    fn post(&self, msg: &SdkMessage) {
        self.posted.lock().unwrap().push(msg.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = SdkMessage::toggle_visibility("Issue Supply", true);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "toggleVisibility",
                "actor": "Issue Supply",
                "visible": true
            })
        );
    }

    #[test]
    fn test_recording_bridge_tracks_last_state() {
        let bridge = RecordingBridge::new();
        toggle_visibility(&bridge, "Working Supply", true);
        toggle_visibility(&bridge, "Working Supply", false);
        toggle_visibility(&bridge, "Issue Supply", true);

        assert_eq!(bridge.last_for("Working Supply"), Some(false));
        assert_eq!(bridge.last_for("Issue Supply"), Some(true));
        assert_eq!(bridge.last_for("Web Univers"), None);
        assert_eq!(bridge.posted().len(), 3);
    }
}
