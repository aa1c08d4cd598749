//! End-point animation for the newest segment.
//!
//! The animated line grows linearly from its start toward its end over a
//! fixed duration while every earlier segment stays static; once settled
//! the whole layer is redrawn from the store.

use std::time::Duration;

use tracing::debug;

use crate::layer::{LineLayer, emit_segment};
use crate::protocol::{DrawOp, Surface};

/// Fixed duration of the grow animation.
pub const LINE_ANIMATION: Duration = Duration::from_millis(1000);

/// The arrowhead only appears once the line has some length.
const ARROW_VISIBLE_AFTER: f64 = 0.1;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Render one animation frame at `progress` in `[0, 1]`, animating the
/// layer's newest segment. At `progress >= 1` this is exactly the static
/// redraw of the full layer.
pub fn frame(layer: &LineLayer, progress: f64) -> Vec<DrawOp> {
    let Some(animating) = layer.last() else {
        return layer.render();
    };
    if progress >= 1.0 {
        return layer.render();
    }

    let mut ops = vec![DrawOp::Clear];
    let settled = layer.segments().len() - 1;
    for segment in &layer.segments()[..settled] {
        emit_segment(&mut ops, segment, segment.end, true);
    }

    let tip = animating.start.lerp(animating.end, progress.max(0.0));
    emit_segment(&mut ops, animating, tip, progress > ARROW_VISIBLE_AFTER);
    ops
}

/// Drive the grow animation of the layer's newest segment to the
/// surface, then settle with a full static redraw. Resolves when done.
pub async fn play(layer: &LineLayer, surface: &dyn Surface) {
    let start = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    loop {
        ticker.tick().await;
        let progress = start.elapsed().as_secs_f64() / LINE_ANIMATION.as_secs_f64();
        surface.apply(&frame(layer, progress));
        if progress >= 1.0 {
            break;
        }
    }
    debug!(segments = layer.len(), "Line animation settled");
}
