//! The cascade state machine.
//!
//! Every delay the page drives with a timeout is externalized here as a
//! scheduled [`TimerEvent`]; the driver sleeps until the deadline and
//! feeds the event back through [`CascadeEngine::on_timer`]. That keeps
//! the whole sequence executable under a virtual clock — or with no
//! clock at all, by calling `on_timer` directly.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use twinstage_canvas::{LineLayer, LineSegment, Surface, animation};
use twinstage_core::bridge::{HostBridge, toggle_visibility};
use twinstage_sync::{CascadeRow, CascadeState, SessionSync};

use crate::scenario::{ScenarioKind, TwinKind, scenario};
use crate::view::{Advisory, Anchor, StageView, TwinVisual};

pub const PROBLEM_COLOR: &str = "#ff4444";
pub const RESOLVED_COLOR: &str = "#2e7d32";

/// Host actors swapped on scenario completion.
const CASCADE_ACTOR: &str = "Web Cascade";
const UNIVERSE_ACTOR: &str = "Web Univers";

const START_DELAY: Duration = Duration::from_millis(500);
const IMPACT_DWELL: Duration = Duration::from_millis(2000);
const ADVISORY_DWELL: Duration = Duration::from_millis(6000);
const RESOLUTION_DWELL: Duration = Duration::from_millis(2000);
const SUCCESS_DWELL: Duration = Duration::from_millis(2000);

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadePhase {
    #[default]
    Idle,
    ShowingImpact,
    ShowingSolution,
    Success,
}

/// Timer-driven transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    BeginStep,
    ShowResolution,
    AdvanceAfterResolution,
    ResetAfterSuccess,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    fire_at: Instant,
    event: TimerEvent,
}

pub struct CascadeEngine {
    view: Arc<dyn StageView>,
    bridge: Arc<dyn HostBridge>,
    surface: Arc<dyn Surface>,
    phase: CascadePhase,
    scenario: Option<ScenarioKind>,
    step: usize,
    lines: LineLayer,
    pending: Option<PendingTimer>,
}

impl CascadeEngine {
    pub fn new(
        view: Arc<dyn StageView>,
        bridge: Arc<dyn HostBridge>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        Self {
            view,
            bridge,
            surface,
            phase: CascadePhase::Idle,
            scenario: None,
            step: 0,
            lines: LineLayer::new(),
            pending: None,
        }
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn scenario(&self) -> Option<ScenarioKind> {
        self.scenario
    }

    pub fn lines(&self) -> &LineLayer {
        &self.lines
    }

    /// Deadline of the scheduled transition, if any. The driver sleeps
    /// until this.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.fire_at)
    }

    /// Event of the scheduled transition, for tests that step the
    /// machine without a clock.
    pub fn pending_event(&self) -> Option<TimerEvent> {
        self.pending.map(|p| p.event)
    }

    /// Pop the scheduled transition once its deadline has passed.
    pub fn take_due(&mut self) -> Option<TimerEvent> {
        self.pending.take().map(|p| p.event)
    }

    fn schedule(&mut self, delay: Duration, event: TimerEvent) {
        self.pending = Some(PendingTimer {
            fire_at: Instant::now() + delay,
            event,
        });
    }

    /// Dispatch a fired timer event.
    pub async fn on_timer(&mut self, event: TimerEvent, sync: &mut SessionSync) {
        match event {
            TimerEvent::BeginStep => self.begin_step(sync).await,
            TimerEvent::ShowResolution => self.show_resolution(sync).await,
            TimerEvent::AdvanceAfterResolution => self.advance(sync).await,
            TimerEvent::ResetAfterSuccess => self.reset(sync).await,
        }
    }

    /// User pressed a launcher: claim the session and start the chain.
    /// Returns false (with an advisory) when somebody else holds it.
    pub async fn start(&mut self, kind: ScenarioKind, sync: &mut SessionSync) -> bool {
        if !sync.acquire_controller().await {
            info!(scenario = kind.wire_name(), "Start denied, session has a controller");
            self.view.show_advisory(&Advisory::control_denied());
            return false;
        }
        sync.publish(CascadeRow::patch_started(kind.wire_name(), 0))
            .await;
        self.start_local(kind, 0);
        true
    }

    /// Begin the chain locally (controller and spectators alike).
    pub fn start_local(&mut self, kind: ScenarioKind, step: usize) {
        info!(scenario = kind.wire_name(), step, "Scenario starting");
        self.view.set_launchers_enabled(false);
        self.view.clear_twins();
        self.view.clear_advisory();
        self.lines.clear();
        self.surface.apply(&self.lines.render());

        self.scenario = Some(kind);
        self.step = step;
        self.phase = CascadePhase::Idle;
        self.schedule(START_DELAY, TimerEvent::BeginStep);
    }

    /// Ripple the problem into the current step's twin: draw the
    /// connector, flag the twin, notify the host, and arm the
    /// auto-resolution dwell.
    pub async fn begin_step(&mut self, sync: &mut SessionSync) {
        let Some(kind) = self.scenario else {
            return;
        };
        let plan = scenario(kind);
        let Some(step) = plan.step(self.step) else {
            warn!(step = self.step, "Step index out of range");
            return;
        };

        sync.publish(CascadeRow::patch_impact(self.step as u32)).await;

        let source = if self.step == 0 {
            self.view.anchor(Anchor::Launcher(kind))
        } else {
            let previous = &plan.chain[self.step - 1];
            self.view.anchor(Anchor::Twin(previous.twin))
        };
        let target = self.view.anchor(Anchor::Twin(step.twin));

        self.lines
            .push(LineSegment::new(source, target, PROBLEM_COLOR, self.step));
        animation::play(&self.lines, self.surface.as_ref()).await;

        self.view.set_twin(step.twin, TwinVisual::HasProblem);
        toggle_visibility(self.bridge.as_ref(), &step.twin.issue_actor(), true);
        toggle_visibility(self.bridge.as_ref(), &step.twin.working_actor(), false);

        self.phase = CascadePhase::ShowingImpact;
        self.schedule(IMPACT_DWELL, TimerEvent::ShowResolution);
    }

    /// User clicked the troubled twin: show the impact popup and give
    /// the room time to read it before auto-resolving.
    pub fn open_advisory(&mut self, twin: TwinKind) {
        if self.phase != CascadePhase::ShowingImpact {
            return;
        }
        let Some(kind) = self.scenario else {
            return;
        };
        let Some(step) = scenario(kind).step(self.step) else {
            return;
        };
        if step.twin != twin {
            return;
        }
        self.view.show_advisory(&Advisory::for_step(self.step, step));
        self.view.show_countdown(ADVISORY_DWELL);
        self.schedule(ADVISORY_DWELL, TimerEvent::ShowResolution);
    }

    /// Resolve the current step. Idempotent: outside `ShowingImpact`
    /// this is a no-op, so a duplicate remote `showing_solution` cannot
    /// advance the chain twice.
    pub async fn show_resolution(&mut self, sync: &mut SessionSync) {
        if self.phase != CascadePhase::ShowingImpact {
            debug!(phase = ?self.phase, "Resolution ignored outside impact phase");
            return;
        }
        let Some(kind) = self.scenario else {
            return;
        };
        let Some(step) = scenario(kind).step(self.step) else {
            return;
        };

        sync.publish(CascadeRow::patch_solution()).await;

        self.view.clear_advisory();
        self.view.clear_countdown();
        self.view.set_twin(step.twin, TwinVisual::Resolved);
        toggle_visibility(self.bridge.as_ref(), &step.twin.issue_actor(), false);
        toggle_visibility(self.bridge.as_ref(), &step.twin.working_actor(), true);

        if self.lines.resolve(self.step, RESOLVED_COLOR) {
            self.surface.apply(&self.lines.render());
        }

        self.phase = CascadePhase::ShowingSolution;
        self.schedule(RESOLUTION_DWELL, TimerEvent::AdvanceAfterResolution);
    }

    /// Move past a resolved step: next step, or the success screen at
    /// the end of the chain.
    pub async fn advance(&mut self, sync: &mut SessionSync) {
        let Some(kind) = self.scenario else {
            return;
        };
        if self.step >= scenario(kind).last_step() {
            self.success(sync).await;
        } else {
            self.step += 1;
            self.begin_step(sync).await;
        }
    }

    /// Terminal state: swap the host scene and arm the auto-reset.
    pub async fn success(&mut self, sync: &mut SessionSync) {
        sync.publish(CascadeRow::patch_success()).await;

        toggle_visibility(self.bridge.as_ref(), CASCADE_ACTOR, false);
        toggle_visibility(self.bridge.as_ref(), UNIVERSE_ACTOR, true);
        info!("Scenario complete");

        self.phase = CascadePhase::Success;
        self.schedule(SUCCESS_DWELL, TimerEvent::ResetAfterSuccess);
    }

    /// Release the session and restore the idle stage.
    pub async fn reset(&mut self, sync: &mut SessionSync) {
        sync.release(CascadeRow::patch_idle()).await;
        self.reset_local();
    }

    /// Restore the idle stage without touching the session row.
    pub fn reset_local(&mut self) {
        self.pending = None;
        self.lines.clear();
        self.surface.apply(&self.lines.render());

        self.view.clear_twins();
        self.view.clear_advisory();
        self.view.clear_countdown();
        self.view.set_launchers_enabled(true);

        for twin in TwinKind::ALL {
            toggle_visibility(self.bridge.as_ref(), &twin.issue_actor(), false);
            toggle_visibility(self.bridge.as_ref(), &twin.working_actor(), true);
        }
        toggle_visibility(self.bridge.as_ref(), CASCADE_ACTOR, true);
        toggle_visibility(self.bridge.as_ref(), UNIVERSE_ACTOR, false);

        self.phase = CascadePhase::Idle;
        self.scenario = None;
        self.step = 0;
        debug!("Stage reset");
    }

    /// Replay a remote row image into the local machine. The driver has
    /// already filtered self-echoes.
    pub async fn apply_remote(&mut self, row: &CascadeRow, sync: &mut SessionSync) {
        debug!(state = ?row.state, step = row.current_step, "Syncing from session");
        match row.state {
            CascadeState::Idle => {
                if self.scenario.is_some() {
                    self.reset_local();
                }
            }
            CascadeState::ScenarioStarted => {
                let Some(kind) = row
                    .scenario_type
                    .as_deref()
                    .and_then(ScenarioKind::from_wire)
                else {
                    warn!(scenario = ?row.scenario_type, "Unknown scenario in session row");
                    return;
                };
                if self.scenario != Some(kind) {
                    self.start_local(kind, row.current_step as usize);
                }
            }
            CascadeState::ShowingImpact => {
                if self.step != row.current_step as usize || self.phase == CascadePhase::Idle {
                    self.step = row.current_step as usize;
                    self.begin_step(sync).await;
                }
            }
            CascadeState::ShowingSolution => self.show_resolution(sync).await,
            CascadeState::Success => self.success(sync).await,
        }
    }
}
