//! Draw operations and the surface seam.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use twinstage_core::geom::Point;

/// One drawing instruction for the embedding surface.
///
/// The surface is an opaque line/arrowhead capability (a 2D canvas in
/// the browser build); widths and blurs are in CSS pixels, alpha in
/// `[0, 1]`, colors CSS color strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear,
    StrokeLine {
        from: Point,
        to: Point,
        color: String,
        width: f64,
        blur: f64,
        alpha: f64,
    },
    FillArrowhead {
        tip: Point,
        angle: f64,
        size: f64,
        color: String,
        blur: f64,
    },
}

/// Something that can execute a frame of draw operations.
pub trait Surface: Send + Sync {
    fn apply(&self, ops: &[DrawOp]);
}

/// Surface that records every applied frame, for tests and headless runs.
#[derive(Default)]
pub struct RecordingSurface {
    frames: Mutex<Vec<Vec<DrawOp>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<DrawOp>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last_frame(&self) -> Option<Vec<DrawOp>> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl Surface for RecordingSurface {
    fn apply(&self, ops: &[DrawOp]) {
        self.frames.lock().unwrap().push(ops.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_op_wire_shape() {
        let op = DrawOp::StrokeLine {
            from: Point::new(0.0, 0.0),
            to: Point::new(10.0, 0.0),
            color: "#ff4444".into(),
            width: 4.0,
            blur: 15.0,
            alpha: 1.0,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "stroke_line");
        assert_eq!(json["color"], "#ff4444");
    }
}
