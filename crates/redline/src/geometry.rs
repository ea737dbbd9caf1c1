//! Axis-aligned bounding-box math shared by grouping, lookup, and re-flow.
//!
//! Every function here is total: degenerate (zero or negative extent) boxes
//! are accepted and simply never overlap anything.

use serde::{Deserialize, Serialize};

use crate::types::GlyphRun;

/// An axis-aligned rectangle in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The box covered by a single glyph run.
    pub fn of_run(run: &GlyphRun) -> Self {
        Self::new(run.x, run.y, run.width, run.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest box containing both operands.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        BoundingBox::new(x, y, right - x, top - y)
    }

    /// Strict positive-area intersection test: the overlap must have both
    /// width and height greater than zero. Boxes that merely touch along an
    /// edge or corner do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let overlap_w = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_h = self.top().min(other.top()) - self.y.max(other.y);
        overlap_w > 0.0 && overlap_h > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_envelope() {
        let a = BoundingBox::new(10.0, 10.0, 20.0, 10.0);
        let b = BoundingBox::new(25.0, 5.0, 10.0, 30.0);
        let u = a.union(&b);
        assert_eq!(u.x, 10.0);
        assert_eq!(u.y, 5.0);
        assert_eq!(u.right(), 35.0);
        assert_eq!(u.top(), 35.0);
    }

    #[test]
    fn test_union_with_contained_box_is_identity() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let inner = BoundingBox::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(outer.union(&inner), outer);
    }

    #[test]
    fn test_overlap_requires_positive_area() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        // Shares the x=10 edge only.
        let edge = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&edge));
        // Shares the (10, 10) corner only.
        let corner = BoundingBox::new(10.0, 10.0, 5.0, 5.0);
        assert!(!a.overlaps(&corner));
        // Genuine intersection.
        let inside = BoundingBox::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_zero_extent_box_overlaps_nothing() {
        let line = BoundingBox::new(5.0, 5.0, 0.0, 20.0);
        let area = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(!line.overlaps(&area));
        assert!(!area.overlaps(&line));
    }

    #[test]
    fn test_of_run_uses_run_extent() {
        let run = GlyphRun {
            text: "hi".to_string(),
            page: 0,
            x: 72.0,
            y: 700.0,
            width: 12.0,
            height: 14.4,
            font_size: 12.0,
            font_name: None,
        };
        let b = BoundingBox::of_run(&run);
        assert_eq!(b, BoundingBox::new(72.0, 700.0, 12.0, 14.4));
    }
}
