//! Connector-line rendering for the cascade stage.
//!
//! The widget never touches pixels. It keeps an ordered list of line
//! segments and turns them into draw operations — three concentric glow
//! strokes plus an arrowhead per segment — that the embedding surface
//! executes. Rendering is a pure function of the stored list, so a
//! redraw with unchanged segments is guaranteed identical.

pub mod animation;
pub mod layer;
pub mod protocol;

pub use animation::{LINE_ANIMATION, play};
pub use layer::{LineLayer, LineSegment};
pub use protocol::{DrawOp, RecordingSurface, Surface};
