use std::time::Duration;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// One simulation tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);
/// How many ticks of regen time make up one unit of damage (60s of repair per point of damage).
pub const TICKS_PER_DAMAGE: u16 = 600;

/// A `u16` count of 100ms ticks; wraps after `65536 * 0.1s` ≈ 109 minutes. Damage and lifespan are
/// both stored this way rather than as a float, so comparisons and saturating arithmetic are exact.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Ticks(pub u16);

impl Ticks {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u16::MAX);

    /// Quantize a duration in seconds, saturating to `u16::MAX` ticks.
    #[must_use]
    pub fn to_ticks(seconds: f32) -> Self {
        let ticks = (seconds / TICK_PERIOD.as_secs_f32()).round();
        Self(ticks.clamp(0.0, f32::from(u16::MAX)) as u16)
    }

    /// The duration in seconds.
    #[must_use]
    pub fn float(self) -> f32 {
        f32::from(self.0) * TICK_PERIOD.as_secs_f32()
    }

    /// Damage, in health points, represented by this many ticks of accrued damage time.
    #[must_use]
    pub fn damage(self) -> f32 {
        f32::from(self.0) / f32::from(TICKS_PER_DAMAGE)
    }

    /// Ticks equivalent to `damage` health points of regen time.
    #[must_use]
    pub fn from_damage(damage: f32) -> Self {
        Self::to_ticks(damage * f32::from(TICKS_PER_DAMAGE) * TICK_PERIOD.as_secs_f32())
    }

    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Serialize for Ticks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.float())
    }
}

impl<'de> Deserialize<'de> for Ticks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let seconds = f32::deserialize(deserializer)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(D::Error::custom("ticks must be a non-negative finite duration"));
        }
        let max_seconds = f32::from(u16::MAX) * TICK_PERIOD.as_secs_f32();
        if seconds > max_seconds {
            return Err(D::Error::custom(format!(
                "duration {seconds}s exceeds the representable maximum of {max_seconds}s"
            )));
        }
        Ok(Self::to_ticks(seconds))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn damage_round_trip() {
        let d = Ticks::from_damage(2.5);
        assert_relative_eq!(d.damage(), 2.5, epsilon = 1.0 / f32::from(TICKS_PER_DAMAGE));
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        assert_eq!(Ticks(3).saturating_sub(Ticks(5)), Ticks::ZERO);
    }

    #[test]
    fn deserialize_rejects_negative() {
        let result: Result<Ticks, _> = serde_json::from_str("-1.0");
        assert!(result.is_err());
    }
}
