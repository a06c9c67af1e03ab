use std::f32::consts::TAU;

use glam::Vec2;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// One full turn in wire units. The circle is a `u16`, so arithmetic wraps for free: adding past
/// the top comes back around, and subtracting two angles gives the shortest signed delta without
/// any branching.
const UNITS_PER_TURN: f64 = 65536.0;
const RADIANS_PER_UNIT: f32 = (TAU as f64 / UNITS_PER_TURN) as f32;

/// A direction or angular delta, stored as a wrapping `u16`.
///
/// `0` is "no rotation" / angle `0`. Reinterpreting the bits as `i16` and scaling by
/// `2π / 65536` always yields a value in `[-π, π)`, which is exactly the range [`Angle::float`]
/// promises and the range a `diff` between two angles lands in automatically.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Angle(pub u16);

impl Angle {
    pub const ZERO: Self = Self(0);

    /// Quantize a radian value into wire units. Any finite float is accepted; the circle wraps.
    #[must_use]
    pub fn to_angle(radians: f32) -> Self {
        let units = (f64::from(radians) / TAU as f64) * UNITS_PER_TURN;
        // `as i64 as u16` wraps the way we want even for large magnitudes.
        Self(units.round() as i64 as u16)
    }

    /// The angle in radians, always in `[-π, π)`.
    #[must_use]
    pub fn float(self) -> f32 {
        f32::from(self.0 as i16) * RADIANS_PER_UNIT
    }

    /// Unit vector pointing in this direction.
    #[must_use]
    pub fn vec2(self) -> Vec2 {
        let (sin, cos) = self.float().sin_cos();
        Vec2::new(cos, sin)
    }

    /// Shortest signed delta `self - other`, itself an [`Angle`] so it can be fed straight back
    /// into [`Angle::clamp_magnitude`] or accumulated; `.float()` on the result is the delta in
    /// radians.
    #[must_use]
    pub fn diff(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }

    /// Clamp a delta (as produced by [`Angle::diff`]) to `±max`, using signed comparison on the
    /// underlying `i16` so the wraparound representation "just works".
    #[must_use]
    pub fn clamp_magnitude(self, max: Self) -> Self {
        let delta = self.0 as i16;
        let max = max.0 as i16;
        Self((delta.clamp(-max, max)) as u16)
    }

    /// Linearly interpolate from `self` toward `other` by `factor` (clamped to `[0, 1]`), taking
    /// the shorter way around the circle.
    #[must_use]
    pub fn lerp(self, other: Self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let delta = other.diff(self).0 as i16;
        let step = (f32::from(delta) * factor).round() as i32;
        Self(self.0.wrapping_add(step as i16 as u16))
    }

    /// Absolute value of a delta produced by [`Angle::diff`].
    #[must_use]
    pub fn abs(self) -> Self {
        let delta = self.0 as i16;
        Self(delta.unsigned_abs())
    }

    /// The opposite direction (adds half a turn).
    #[must_use]
    pub fn inv(self) -> Self {
        Self(self.0.wrapping_add(32768))
    }
}

impl Serialize for Angle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.float())
    }
}

impl<'de> Deserialize<'de> for Angle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let radians = f32::deserialize(deserializer)?;
        if !radians.is_finite() {
            return Err(D::Error::custom("angle must be finite"));
        }
        Ok(Self::to_angle(radians))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn float_is_in_range() {
        for raw in [0_u16, 1, 32767, 32768, 32769, 65535] {
            let angle = Angle(raw);
            let f = angle.float();
            assert!((-std::f32::consts::PI..std::f32::consts::PI).contains(&f), "{f}");
        }
    }

    #[test]
    fn round_trip_within_one_ulp_of_unit() {
        let unit = RADIANS_PER_UNIT;
        for deg in [-179.0_f32, -90.0, -1.0, 0.0, 1.0, 90.0, 179.9] {
            let radians = deg.to_radians();
            let angle = Angle::to_angle(radians);
            assert_relative_eq!(angle.float(), radians, epsilon = unit * 1.01);
        }
    }

    #[test]
    fn diff_gives_shortest_path() {
        let a = Angle::to_angle(179.0_f32.to_radians());
        let b = Angle::to_angle((-179.0_f32).to_radians());
        let delta = b.diff(a).float().to_degrees();
        assert_relative_eq!(delta, 2.0, epsilon = 0.1);
    }

    #[test]
    fn inv_is_half_turn() {
        let a = Angle::to_angle(0.3);
        let b = a.inv();
        assert_relative_eq!(b.diff(a).float().abs(), std::f32::consts::PI, epsilon = 1e-3);
    }

    #[test]
    fn json_round_trip() {
        let a = Angle::to_angle(1.2345);
        let json = serde_json::to_string(&a).unwrap();
        let back: Angle = serde_json::from_str(&json).unwrap();
        assert_relative_eq!(a.float(), back.float(), epsilon = 1e-5);
    }
}
