use glam::Vec2;

/// A rectangle at an arbitrary orientation: a hull's length runs along `forward`, its width along
/// `forward.perp()`. Boats, weapons and obstacles are all modeled as one of these for collision
/// purposes (`length × width` from the entity's catalog entry).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrientedRect {
    pub center: Vec2,
    /// Unit vector along the long axis.
    pub forward: Vec2,
    pub half_length: f32,
    pub half_width: f32,
}

impl OrientedRect {
    #[must_use]
    pub fn new(center: Vec2, forward: Vec2, length: f32, width: f32) -> Self {
        Self {
            center,
            forward: forward.normalize_or_zero(),
            half_length: length * 0.5,
            half_width: width * 0.5,
        }
    }

    #[must_use]
    pub fn right(&self) -> Vec2 {
        self.forward.perp()
    }

    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        let l = self.forward * self.half_length;
        let w = self.right() * self.half_width;
        [
            self.center + l + w,
            self.center + l - w,
            self.center - l + w,
            self.center - l - w,
        ]
    }

    /// The radius of the circle that fully contains this rectangle.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        self.half_length.hypot(self.half_width)
    }

    /// Extend this rectangle to additionally cover the straight-line displacement `sweep` this
    /// tick: the center shifts to the sweep's midpoint and the hull lengthens by half the sweep
    /// distance, approximating the rectangle's motion as a single extended hull rather than a
    /// true swept polygon.
    #[must_use]
    pub fn swept(&self, sweep: Vec2) -> Self {
        let distance = sweep.length();
        Self {
            center: self.center + sweep * 0.5,
            forward: self.forward,
            half_length: self.half_length + distance * 0.5,
            half_width: self.half_width,
        }
    }

    fn project(&self, axis: Vec2) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for corner in self.corners() {
            let d = corner.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    /// Separating-axis test between two oriented rectangles: true iff their projections overlap
    /// on all four candidate axes (each rectangle's forward and right directions).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let axes = [self.forward, self.right(), other.forward, other.right()];
        axes.into_iter().all(|axis| {
            if axis == Vec2::ZERO {
                return true;
            }
            let (min_a, max_a) = self.project(axis);
            let (min_b, max_b) = other.project(axis);
            min_a <= max_b && min_b <= max_a
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_rects_intersect() {
        let r = OrientedRect::new(Vec2::ZERO, Vec2::X, 10.0, 4.0);
        assert!(r.intersects(&r));
    }

    #[test]
    fn far_apart_rects_do_not_intersect() {
        let a = OrientedRect::new(Vec2::ZERO, Vec2::X, 10.0, 4.0);
        let b = OrientedRect::new(Vec2::new(1000.0, 0.0), Vec2::X, 10.0, 4.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn rotated_corner_case_detected_by_sat() {
        // Two long thin rectangles crossing like an "X"; their AABBs overlap heavily but the
        // bodies only clip near the center. SAT should still report a hit.
        let a = OrientedRect::new(Vec2::ZERO, Vec2::X, 20.0, 1.0);
        let b = OrientedRect::new(Vec2::ZERO, Vec2::Y, 20.0, 1.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn parallel_offset_rects_miss() {
        let a = OrientedRect::new(Vec2::ZERO, Vec2::X, 20.0, 1.0);
        let b = OrientedRect::new(Vec2::new(0.0, 5.0), Vec2::X, 20.0, 1.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn sweep_extends_along_motion() {
        let r = OrientedRect::new(Vec2::ZERO, Vec2::X, 10.0, 4.0);
        let swept = r.swept(Vec2::new(6.0, 0.0));
        assert_eq!(swept.center, Vec2::new(3.0, 0.0));
        assert_eq!(swept.half_length, 8.0);
    }
}
