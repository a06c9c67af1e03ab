use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Units per m/s in the Q11.5 fixed-point encoding: 11 integer bits, 5 fractional bits, one sign
/// bit folded into the two's-complement `i16`.
const UNITS_PER_MPS: f32 = 32.0;

/// The widest magnitude a [`Velocity`] can represent, in m/s.
pub const VELOCITY_MAX: f32 = i16::MAX as f32 / UNITS_PER_MPS;
/// The most negative magnitude a [`Velocity`] can represent, in m/s.
pub const VELOCITY_MIN: f32 = i16::MIN as f32 / UNITS_PER_MPS;

/// A signed speed along a direction, Q11.5 fixed point: `32` units = `1` m/s.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Velocity(pub i16);

impl Velocity {
    pub const ZERO: Self = Self(0);

    /// Quantize an m/s value, saturating to the representable range.
    #[must_use]
    pub fn to_velocity(mps: f32) -> Self {
        let units = (mps * UNITS_PER_MPS).round();
        Self(units.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16)
    }

    /// The speed in m/s.
    #[must_use]
    pub fn float(self) -> f32 {
        f32::from(self.0) / UNITS_PER_MPS
    }

    /// Clamp the magnitude (preserving sign) to `max` m/s.
    #[must_use]
    pub fn clamp_magnitude(self, max: f32) -> Self {
        let v = self.float();
        Self::to_velocity(v.clamp(-max, max))
    }

    /// Clamp the magnitude to be at least `min` m/s, preserving sign. A value of exactly zero is
    /// left untouched — there is no sign to preserve.
    #[must_use]
    pub fn clamp_min(self, min: f32) -> Self {
        if self.0 == 0 {
            return self;
        }
        let v = self.float();
        let signed_min = min.copysign(v);
        if v.abs() < min {
            Self::to_velocity(signed_min)
        } else {
            self
        }
    }

    /// Add `delta` m/s to this velocity and clamp the result's magnitude to `magnitude`, doing
    /// the intermediate arithmetic in `f64` so a large `delta` can never wrap the `i16` storage.
    #[must_use]
    pub fn add_clamped(self, delta: f32, magnitude: f32) -> Self {
        let sum = f64::from(self.float()) + f64::from(delta);
        let clamped = sum.clamp(f64::from(-magnitude), f64::from(magnitude));
        Self::to_velocity(clamped as f32)
    }
}

impl Serialize for Velocity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.float())
    }
}

impl<'de> Deserialize<'de> for Velocity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mps = f32::deserialize(deserializer)?;
        if !mps.is_finite() {
            return Err(D::Error::custom("velocity must be finite"));
        }
        if !(VELOCITY_MIN..=VELOCITY_MAX).contains(&mps) {
            return Err(D::Error::custom(format!(
                "velocity {mps} m/s out of representable range [{VELOCITY_MIN}, {VELOCITY_MAX}]"
            )));
        }
        Ok(Self::to_velocity(mps))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn round_trips_within_half_unit() {
        for mps in [-1000.0_f32, -12.3, -0.1, 0.0, 0.1, 12.3, 1000.0] {
            let v = Velocity::to_velocity(mps);
            assert_relative_eq!(v.float(), mps, epsilon = 1.0 / 32.0);
        }
    }

    #[test]
    fn clamp_min_preserves_sign() {
        let v = Velocity::to_velocity(-0.5).clamp_min(2.0);
        assert!(v.float() < 0.0);
        assert_relative_eq!(v.float(), -2.0, epsilon = 1e-3);
    }

    #[test]
    fn clamp_min_leaves_zero_alone() {
        let v = Velocity::ZERO.clamp_min(2.0);
        assert_eq!(v.0, 0);
    }

    #[test]
    fn add_clamped_never_overflows() {
        let v = Velocity::to_velocity(VELOCITY_MAX).add_clamped(1e6, VELOCITY_MAX);
        assert_relative_eq!(v.float(), VELOCITY_MAX, epsilon = 0.1);
    }

    #[test]
    fn deserialize_rejects_out_of_range() {
        let json = format!("{}", VELOCITY_MAX as f64 + 10.0);
        let result: Result<Velocity, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }
}
