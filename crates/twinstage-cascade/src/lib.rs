//! Supply-chain cascade scenario player.
//!
//! A scenario is a chain of three problem→consequence→solution steps
//! rippling across the digital twins (supply, product, production). The
//! engine walks the chain on timer events, draws connector lines,
//! toggles host actors, and keeps every connected client's view in step
//! through the shared session row.

pub mod driver;
pub mod engine;
pub mod scenario;
pub mod view;

pub use driver::{CascadeCommand, run_cascade};
pub use engine::{CascadeEngine, CascadePhase, TimerEvent};
pub use scenario::{CascadeStep, Scenario, ScenarioKind, TwinKind, scenario};
pub use view::{Advisory, Anchor, RecordingView, StageView, TwinVisual};
