use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in map space.
///
/// `(x, y)` is the bottom-left corner, `y` grows northwards. Used for both
/// the touch bound (collisions) and the draw bound (rendering placement).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Copy of this rectangle moved by `delta`; the size is untouched.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..*self
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Strict AABB overlap test. Rectangles sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.overlaps_with_margin(other, 0.0)
    }

    /// Overlap test where this rectangle's extent is widened by `margin` on
    /// the right/top and the other's on the left/bottom, i.e. a gap of less
    /// than `margin` between the two still counts.
    pub fn overlaps_with_margin(&self, other: &Self, margin: f32) -> bool {
        self.x < other.x + other.width + margin
            && self.x + self.width + margin > other.x
            && self.y < other.y + other.height + margin
            && self.y + self.height + margin > other.y
    }

    /// Whether the segment from `a` to `b` crosses or touches this
    /// rectangle. Edges count, an empty rectangle never intersects.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        if self.contains_point(a) || self.contains_point(b) {
            return true;
        }
        // Liang-Barsky clipping of the segment against the four edges.
        let d = b - a;
        let mut enter = 0.0_f32;
        let mut leave = 1.0_f32;
        for (p, q) in [
            (-d.x, a.x - self.x),
            (d.x, self.x + self.width - a.x),
            (-d.y, a.y - self.y),
            (d.y, self.y + self.height - a.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                enter = enter.max(t);
            } else {
                leave = leave.min(t);
            }
            if enter > leave {
                return false;
            }
        }
        true
    }

    /// Point containment, edges included.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_strict_on_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        let c = Rect::new(9.5, 9.5, 1.0, 1.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn margin_extends_reach_in_both_directions() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let right = Rect::new(15.0, 0.0, 10.0, 10.0);
        let left = Rect::new(-15.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps_with_margin(&right, 10.0));
        assert!(a.overlaps_with_margin(&left, 10.0));
        assert!(!a.overlaps_with_margin(&right, 5.0));
    }

    #[test]
    fn translated_keeps_size() {
        let a = Rect::new(1.0, 2.0, 3.0, 4.0);
        let b = a.translated(Vec2::new(5.0, -2.0));
        assert_eq!(b, Rect::new(6.0, 0.0, 3.0, 4.0));
        assert_eq!(a.size(), b.size());
    }

    #[test]
    fn segment_crossing_and_missing() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Passes straight through without an endpoint inside.
        assert!(a.intersects_segment(Vec2::new(-5.0, 5.0), Vec2::new(15.0, 5.0)));
        // Diagonal clipping one corner.
        assert!(a.intersects_segment(Vec2::new(-2.0, 6.0), Vec2::new(4.0, 12.0)));
        // Endpoint inside.
        assert!(a.intersects_segment(Vec2::new(5.0, 5.0), Vec2::new(50.0, 50.0)));
        // Parallel, outside.
        assert!(!a.intersects_segment(Vec2::new(-5.0, 11.0), Vec2::new(15.0, 11.0)));
        // Would hit if extended, but stops short.
        assert!(!a.intersects_segment(Vec2::new(-10.0, 5.0), Vec2::new(-1.0, 5.0)));
        // Diagonal passing the corner outside.
        assert!(!a.intersects_segment(Vec2::new(8.0, 14.0), Vec2::new(14.0, 8.0)));
        assert!(!Rect::new(0.0, 0.0, 0.0, 10.0)
            .intersects_segment(Vec2::new(-5.0, 5.0), Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn center_and_contains_point() {
        let a = Rect::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(a.center(), Vec2::new(5.0, 10.0));
        assert!(a.contains_point(Vec2::new(10.0, 20.0)));
        assert!(!a.contains_point(Vec2::new(10.1, 5.0)));
    }
}
