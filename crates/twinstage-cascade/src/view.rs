//! Stage view seam — everything the engine asks of the surrounding page.

use std::sync::Mutex;
use std::time::Duration;

use twinstage_core::geom::Point;

use crate::scenario::{CascadeStep, ScenarioKind, TwinKind};

/// A positioned element the connector lines attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The launcher control that fired the scenario.
    Launcher(ScenarioKind),
    /// A digital-twin card.
    Twin(TwinKind),
}

/// Visual state of a twin card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwinVisual {
    Normal,
    HasProblem,
    Resolved,
}

/// Popup content for the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub icon: &'static str,
    pub title: &'static str,
    pub body: String,
}

impl Advisory {
    /// Impact popup: the first step is the triggering problem, later
    /// steps are cascade effects.
    pub fn for_step(step_index: usize, step: &CascadeStep) -> Self {
        let (icon, title) = if step_index == 0 {
            ("🚨", "PROBLEM DETECTED")
        } else {
            ("⚠️", "CASCADE IMPACT")
        };
        Self {
            icon,
            title,
            body: format!("{}\n\n📋 CONSEQUENCE:\n{}", step.problem, step.consequence),
        }
    }

    /// Shown when the controller election is lost.
    pub fn control_denied() -> Self {
        Self {
            icon: "⛔",
            title: "SESSION BUSY",
            body: "Someone else is already controlling the session. Please wait.".into(),
        }
    }
}

/// The page around the engine: anchors, twin cards, launcher controls,
/// advisory popup, and the auto-progress countdown.
pub trait StageView: Send + Sync {
    fn anchor(&self, anchor: Anchor) -> Point;
    fn set_twin(&self, twin: TwinKind, visual: TwinVisual);
    fn clear_twins(&self);
    fn set_launchers_enabled(&self, enabled: bool);
    fn show_advisory(&self, advisory: &Advisory);
    fn clear_advisory(&self);
    fn show_countdown(&self, duration: Duration);
    fn clear_countdown(&self);
}

/// Everything a [`RecordingView`] saw, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Twin(TwinKind, TwinVisual),
    TwinsCleared,
    LaunchersEnabled(bool),
    Advisory(Advisory),
    AdvisoryCleared,
    Countdown(Duration),
    CountdownCleared,
}

/// Headless view with a fixed layout, for tests and driverless runs.
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_twin_visual(&self, twin: TwinKind) -> Option<TwinVisual> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                ViewEvent::Twin(t, v) if *t == twin => Some(*v),
                ViewEvent::TwinsCleared => Some(TwinVisual::Normal),
                _ => None,
            })
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl StageView for RecordingView {
    fn anchor(&self, anchor: Anchor) -> Point {
        // Deterministic layout: launchers along the bottom, twins along
        // the middle band.
        match anchor {
            Anchor::Launcher(kind) => {
                let x = match kind {
                    ScenarioKind::Tariff => 200.0,
                    ScenarioKind::Labor => 400.0,
                    ScenarioKind::Material => 600.0,
                };
                Point::new(x, 650.0)
            }
            Anchor::Twin(twin) => {
                let x = match twin {
                    TwinKind::Supply => 250.0,
                    TwinKind::Product => 500.0,
                    TwinKind::Production => 750.0,
                };
                Point::new(x, 300.0)
            }
        }
    }

    fn set_twin(&self, twin: TwinKind, visual: TwinVisual) {
        self.record(ViewEvent::Twin(twin, visual));
    }

    fn clear_twins(&self) {
        self.record(ViewEvent::TwinsCleared);
    }

    fn set_launchers_enabled(&self, enabled: bool) {
        self.record(ViewEvent::LaunchersEnabled(enabled));
    }

    fn show_advisory(&self, advisory: &Advisory) {
        self.record(ViewEvent::Advisory(advisory.clone()));
    }

    fn clear_advisory(&self) {
        self.record(ViewEvent::AdvisoryCleared);
    }

    fn show_countdown(&self, duration: Duration) {
        self.record(ViewEvent::Countdown(duration));
    }

    fn clear_countdown(&self) {
        self.record(ViewEvent::CountdownCleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::scenario;

    #[test]
    fn test_advisory_titles_by_step() {
        let chain = &scenario(ScenarioKind::Tariff).chain;
        let first = Advisory::for_step(0, &chain[0]);
        assert_eq!(first.title, "PROBLEM DETECTED");
        assert!(first.body.contains("📋 CONSEQUENCE:"));

        let cascade = Advisory::for_step(1, &chain[1]);
        assert_eq!(cascade.title, "CASCADE IMPACT");
    }
}
