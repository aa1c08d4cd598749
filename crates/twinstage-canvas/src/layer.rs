//! Ordered segment store and the layered glow emission.

use serde::{Deserialize, Serialize};

use twinstage_core::geom::Point;

use crate::protocol::DrawOp;

/// Glow passes, outermost first: (width, shadow blur, alpha).
const GLOW_PASSES: [(f64, f64, f64); 3] = [(12.0, 40.0, 0.3), (8.0, 25.0, 0.6), (4.0, 15.0, 1.0)];

const ARROW_SIZE: f64 = 15.0;
const ARROW_BLUR: f64 = 10.0;

/// One directional connector between two stage anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
    pub color: String,
    pub resolved: bool,
    pub step_index: usize,
}

impl LineSegment {
    pub fn new(start: Point, end: Point, color: impl Into<String>, step_index: usize) -> Self {
        Self {
            start,
            end,
            color: color.into(),
            resolved: false,
            step_index,
        }
    }
}

/// Emit one segment clipped to `tip`: three concentric strokes, plus
/// the arrowhead oriented along the full segment direction.
pub(crate) fn emit_segment(ops: &mut Vec<DrawOp>, segment: &LineSegment, tip: Point, arrow: bool) {
    for (width, blur, alpha) in GLOW_PASSES {
        ops.push(DrawOp::StrokeLine {
            from: segment.start,
            to: tip,
            color: segment.color.clone(),
            width,
            blur,
            alpha,
        });
    }
    if arrow {
        ops.push(DrawOp::FillArrowhead {
            tip,
            angle: segment.start.angle_to(segment.end),
            size: ARROW_SIZE,
            color: segment.color.clone(),
            blur: ARROW_BLUR,
        });
    }
}

/// The ordered list of drawn connectors.
#[derive(Debug, Clone, Default)]
pub struct LineLayer {
    segments: Vec<LineSegment>,
}

impl LineLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: LineSegment) -> usize {
        self.segments.push(segment);
        self.segments.len() - 1
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&LineSegment> {
        self.segments.last()
    }

    /// Recolor the segment drawn for `step_index` and mark it resolved.
    /// Returns false when no such segment exists.
    pub fn resolve(&mut self, step_index: usize, color: &str) -> bool {
        match self.segments.iter_mut().find(|s| s.step_index == step_index) {
            Some(segment) => {
                segment.color = color.to_string();
                segment.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Full static redraw. Pure: identical segment lists produce
    /// identical operations.
    pub fn render(&self) -> Vec<DrawOp> {
        let mut ops = vec![DrawOp::Clear];
        for segment in &self.segments {
            emit_segment(&mut ops, segment, segment.end, true);
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(step: usize) -> LineSegment {
        LineSegment::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
            "#ff4444",
            step,
        )
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut layer = LineLayer::new();
        layer.push(segment(0));
        layer.push(LineSegment::new(
            Point::new(100.0, 50.0),
            Point::new(200.0, 10.0),
            "#ff4444",
            1,
        ));

        assert_eq!(layer.render(), layer.render());
    }

    #[test]
    fn test_render_emits_three_strokes_and_arrowhead_per_segment() {
        let mut layer = LineLayer::new();
        layer.push(segment(0));

        let ops = layer.render();
        assert_eq!(ops.len(), 1 + 3 + 1);
        assert_eq!(ops[0], DrawOp::Clear);
        let widths: Vec<f64> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeLine { width, .. } => Some(*width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![12.0, 8.0, 4.0]);
        assert!(matches!(ops[4], DrawOp::FillArrowhead { .. }));
    }

    #[test]
    fn test_resolve_recolors_and_changes_render() {
        let mut layer = LineLayer::new();
        layer.push(segment(0));
        let before = layer.render();

        assert!(layer.resolve(0, "#2e7d32"));
        let after = layer.render();
        assert_ne!(before, after);
        assert!(layer.segments()[0].resolved);
        assert_eq!(layer.segments()[0].color, "#2e7d32");

        assert!(!layer.resolve(7, "#2e7d32"));
    }
}
