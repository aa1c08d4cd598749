//! Typed session rows and the patches the widgets publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use twinstage_core::Result;

/// `current_slide` value meaning "not started / restarted".
pub const RESTART_SENTINEL: i32 = -1;

/// Replication state of the cascade session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeState {
    #[default]
    Idle,
    ScenarioStarted,
    ShowingImpact,
    ShowingSolution,
    Success,
}

/// Shared state of the cascade widget (table `cascade_session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeRow {
    pub id: String,
    #[serde(default)]
    pub controller_id: Option<String>,
    #[serde(default)]
    pub state: CascadeState,
    #[serde(default)]
    pub scenario_type: Option<String>,
    #[serde(default)]
    pub current_step: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CascadeRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn patch_started(scenario_type: &str, step: u32) -> Value {
        json!({
            "scenario_type": scenario_type,
            "current_step": step,
            "state": "scenario_started",
        })
    }

    pub fn patch_impact(step: u32) -> Value {
        json!({ "current_step": step, "state": "showing_impact" })
    }

    pub fn patch_solution() -> Value {
        json!({ "state": "showing_solution" })
    }

    pub fn patch_success() -> Value {
        json!({ "state": "success" })
    }

    /// Reset payload written on release: clears the controller and all
    /// progression fields.
    pub fn patch_idle() -> Value {
        json!({
            "controller_id": null,
            "state": "idle",
            "scenario_type": null,
            "current_step": 0,
        })
    }
}

/// Shared state of the deck widget (table `deck_session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckRow {
    pub id: String,
    #[serde(default = "restart_sentinel")]
    pub current_slide: i32,
    #[serde(default)]
    pub audio_timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn restart_sentinel() -> i32 {
    RESTART_SENTINEL
}

impl DeckRow {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn patch_position(slide: i32, audio_timestamp: f64) -> Value {
        json!({ "current_slide": slide, "audio_timestamp": audio_timestamp })
    }

    pub fn patch_restart() -> Value {
        json!({ "current_slide": RESTART_SENTINEL })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names() {
        for (state, wire) in [
            (CascadeState::Idle, "\"idle\""),
            (CascadeState::ScenarioStarted, "\"scenario_started\""),
            (CascadeState::ShowingImpact, "\"showing_impact\""),
            (CascadeState::ShowingSolution, "\"showing_solution\""),
            (CascadeState::Success, "\"success\""),
        ] {
            assert_eq!(serde_json::to_string(&state).unwrap(), wire);
            assert_eq!(serde_json::from_str::<CascadeState>(wire).unwrap(), state);
        }
    }

    #[test]
    fn test_cascade_row_defaults() {
        let row = CascadeRow::from_value(&json!({ "id": "s1" })).unwrap();
        assert_eq!(row.state, CascadeState::Idle);
        assert_eq!(row.controller_id, None);
        assert_eq!(row.current_step, 0);
    }

    #[test]
    fn test_deck_row_defaults_to_sentinel() {
        let row = DeckRow::from_value(&json!({ "id": "d1" })).unwrap();
        assert_eq!(row.current_slide, RESTART_SENTINEL);
        assert_eq!(row.audio_timestamp, 0.0);
    }

    #[test]
    fn test_idle_patch_clears_everything() {
        let patch = CascadeRow::patch_idle();
        assert_eq!(patch["controller_id"], Value::Null);
        assert_eq!(patch["state"], "idle");
        assert_eq!(patch["scenario_type"], Value::Null);
        assert_eq!(patch["current_step"], 0);
    }
}
