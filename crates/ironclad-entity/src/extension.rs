use glam::Vec2;
use ironclad_numerics::{Angle, Ticks};

/// How long a latched turret target remains authoritative once set by `manual` or `aimTurrets`,
/// before turrets recenter on their base angle. Every new command resets the countdown rather
/// than only the first one — "most recent command wins".
pub const TURRET_AIM_WINDOW: Ticks = Ticks(50); // 5 s at 100 ms/tick

/// Per-boat state that survives a type change (`Entity::initialize`), conceptually owned by the
/// player rather than re-created with the hull.
#[derive(Clone, Debug, Default)]
pub struct Extension {
    /// Ticks of reload remaining, one slot per armament mount on the current type.
    pub armament_consumption: Vec<Ticks>,
    /// Current aim offset for each turret, one slot per turret on the current type.
    pub turret_angle: Vec<Angle>,
    pub turret_target: Option<Vec2>,
    pub turret_aim_remaining: Ticks,
    pub altitude: f32,
    pub altitude_target: f32,
    pub active_sensors: bool,
    /// Consecutive ticks this boat has been touching an obstacle; reset to zero whenever a tick
    /// passes without contact. The physics neighbor sweep kills a boat that holds this at or
    /// above 60 ticks (6 s).
    pub obstacle_contact: Ticks,
}

impl Extension {
    #[must_use]
    pub fn for_type(armament_count: usize, turret_count: usize) -> Self {
        Self {
            armament_consumption: vec![Ticks::ZERO; armament_count],
            turret_angle: vec![Angle::ZERO; turret_count],
            turret_target: None,
            turret_aim_remaining: Ticks::ZERO,
            altitude: 0.0,
            altitude_target: 0.0,
            active_sensors: true,
            obstacle_contact: Ticks::ZERO,
        }
    }

    pub fn set_turret_target(&mut self, target: Vec2) {
        self.turret_target = Some(target);
        self.turret_aim_remaining = TURRET_AIM_WINDOW;
    }
}
