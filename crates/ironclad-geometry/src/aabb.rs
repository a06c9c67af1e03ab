use std::fmt::{Debug, Display};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in world meters.
#[derive(Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// A square AABB centered on `center` with the given half-width.
    #[must_use]
    pub fn centered(center: Vec2, half_extent: f32) -> Self {
        Self {
            min: center - Vec2::splat(half_extent),
            max: center + Vec2::splat(half_extent),
        }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Expand the box by `amount` on every side.
    #[must_use]
    pub fn inflate(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Snap this box outward to the grid defined by `cell_size`, so every cell it touches is
    /// fully covered.
    #[must_use]
    pub fn clamp_to_grid(&self, cell_size: f32) -> Self {
        Self {
            min: (self.min / cell_size).floor() * cell_size,
            max: (self.max / cell_size).ceil() * cell_size,
        }
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Debug for Aabb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Display for Aabb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aabb[{:?} -> {:?}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_idempotent() {
        let a = Aabb::new(Vec2::new(-12.3, 4.5), Vec2::new(60.1, 70.0));
        let once = a.clamp_to_grid(500.0);
        let twice = once.clamp_to_grid(500.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn inflate_grows_both_sides() {
        let a = Aabb::new(Vec2::ZERO, Vec2::splat(1.0));
        let b = a.inflate(2.0);
        assert_eq!(b.min, Vec2::splat(-2.0));
        assert_eq!(b.max, Vec2::splat(3.0));
    }
}
