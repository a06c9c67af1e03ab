use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use ironclad_catalog::{Catalog, EntityTypeId, Kind, SubKind};
use ironclad_geometry::OrientedRect;
use ironclad_numerics::{Angle, Ticks, Velocity};
use ironclad_player::{DeathTag, PlayerId};
use ironclad_spatial::Positioned;
use ironclad_terrain::Terrain;

use crate::extension::Extension;

const HULL_TURN_RATE: f32 = FRAC_PI_4; // rad/s, at full rudder authority
const ACCEL_CAP: f32 = 800.0; // m/s^2
const TURRET_TURN_RATE: f32 = std::f32::consts::FRAC_PI_3; // rad/s
const SUBMARINE_AUTO_SURFACE_RATE: f32 = 0.75; // altitude units/s
const SUBMARINE_REQUESTED_ALTITUDE_RATE: f32 = 0.2; // altitude units/s
const TERRAIN_BOAT_SPEED_CAP: f32 = 5.0; // m/s
const TERRAIN_BOAT_DAMAGE_RATE: f32 = 0.25; // fraction of max health per second
const BORDER_DAMAGE_RATE: f32 = 0.15; // fraction of max health per second
const BORDER_RADIUS_CLEARANCE: f32 = 1.1; // world_radius multiplier for the instant-kill ring
const REPAIR_RATE: f32 = 1.0 / 60.0; // fraction of max health repaired per tick at 1x
const SUBMARINE_STARTING_ALTITUDE: f32 = -0.5;
const AIRCRAFT_ALTITUDE: f32 = 1.0;
const AIRDROP_RELOAD_MULTIPLIER: f32 = 4.0;
const SUBMERGED_ALTITUDE_THRESHOLD: f32 = 0.0;

#[must_use]
pub fn rotate_vec(v: Vec2, angle: Angle) -> Vec2 {
    let dir = angle.vec2();
    Vec2::new(v.x * dir.x - v.y * dir.y, v.x * dir.y + v.y * dir.x)
}

fn angle_to(from: Vec2, to: Vec2) -> Angle {
    let delta = to - from;
    Angle::to_angle(delta.y.atan2(delta.x))
}

/// The runtime instance of an entity type: transform, guidance, and gameplay extension state.
/// Lives only inside a [`ironclad_spatial::World`]; the `EntityId` handle is assigned there.
#[derive(Clone, Debug)]
pub struct Entity {
    pub position: Vec2,
    pub direction: Angle,
    pub velocity: Velocity,
    pub direction_target: Angle,
    pub velocity_target: Velocity,
    pub entity_type: EntityTypeId,
    pub owner: Option<PlayerId>,
    pub damage: Ticks,
    pub lifespan: Ticks,
    pub extension: Extension,
}

impl Positioned for Entity {
    fn position(&self) -> Vec2 {
        self.position
    }
}

impl Entity {
    #[must_use]
    pub fn new(entity_type: EntityTypeId, position: Vec2, owner: Option<PlayerId>) -> Self {
        let data = entity_type.data();
        let mut extension = Extension::for_type(data.armaments.len(), data.turrets.len());
        if data.sub_kind == SubKind::Submarine {
            extension.altitude = SUBMARINE_STARTING_ALTITUDE;
        } else if data.kind == Kind::Aircraft {
            extension.altitude = AIRCRAFT_ALTITUDE;
        }
        Self {
            position,
            direction: Angle::ZERO,
            velocity: Velocity::ZERO,
            direction_target: Angle::ZERO,
            velocity_target: Velocity::ZERO,
            entity_type,
            owner,
            damage: Ticks::ZERO,
            lifespan: Ticks::ZERO,
            extension,
        }
    }

    #[must_use]
    pub fn damage_fraction(&self) -> f32 {
        self.damage.damage().clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.damage.damage() >= 1.0
    }

    #[must_use]
    pub fn hull(&self) -> OrientedRect {
        let data = self.entity_type.data();
        OrientedRect::new(self.position, self.direction.vec2(), data.length * 0.5, data.width * 0.5)
    }

    /// Aggregate sensor reach from this entity's position, scaled by an altitude factor: a
    /// surfaced or airborne entity sees further, a submerged one sees less (and has no sonar
    /// while surfaced, since sonar only matters underwater).
    #[must_use]
    pub fn camera(&self) -> (Vec2, f32, f32, f32) {
        let sensors = &self.entity_type.data().sensors;
        let altitude = self.extension.altitude;
        let surface_factor = if altitude >= 0.0 { 1.0 + altitude } else { (1.0 + altitude).max(0.1) };
        let visual = sensors.visual * surface_factor;
        let radar = sensors.radar * surface_factor;
        let sonar = if altitude >= SUBMERGED_ALTITUDE_THRESHOLD { 0.0 } else { sensors.sonar };
        (self.position, visual, radar, sonar)
    }

    /// World-space spawn pose `(position, direction)` for the armament at `index`, composing the
    /// hull transform with an optional turret transform and the mount's own offset/angle.
    #[must_use]
    pub fn armament_transform(&self, index: usize) -> (Vec2, Angle) {
        let data = self.entity_type.data();
        let mount = &data.armaments[index];

        let (base_pos, base_dir) = match mount.turret {
            Some(turret_index) => {
                let turret = &data.turrets[turret_index];
                let turret_pos = self.position + rotate_vec(turret.offset, self.direction);
                let turret_dir = Angle(self.direction.0.wrapping_add(self.extension.turret_angle[turret_index].0));
                (turret_pos, turret_dir)
            }
            None => (self.position, self.direction),
        };

        let world_pos = base_pos + rotate_vec(mount.offset, base_dir);
        let world_dir = Angle(base_dir.0.wrapping_add(mount.angle.0));
        (world_pos, world_dir)
    }

    /// Ramps from `0.25` to `1.0` over the first 15 s of a level-1 boat's life; `1.0` otherwise.
    /// Used to scale down damage taken by a freshly spawned player.
    #[must_use]
    pub fn recent_spawn_factor(&self) -> f32 {
        let data = self.entity_type.data();
        if data.kind != Kind::Boat || data.level != 1 {
            return 1.0;
        }
        const RAMP_SECONDS: f32 = 15.0;
        let elapsed = self.lifespan.float();
        if elapsed >= RAMP_SECONDS {
            1.0
        } else {
            0.25 + 0.75 * (elapsed / RAMP_SECONDS)
        }
    }

    fn is_submerged(&self) -> bool {
        self.entity_type.data().sub_kind == SubKind::Submarine && self.extension.altitude < SUBMERGED_ALTITUDE_THRESHOLD
    }

    /// Whether any currently-reloading armament belongs to a "noisy" sub-kind (everything except
    /// torpedoes and decoys), which forces a submerged submarine back to the surface.
    fn has_noisy_reload_in_progress(&self, catalog: &Catalog) -> bool {
        let data = self.entity_type.data();
        data.armaments.iter().zip(&self.extension.armament_consumption).any(|(mount, remaining)| {
            *remaining > Ticks::ZERO
                && mount.launches.map(|id| catalog.get(id).sub_kind.is_noisy_when_reloading()).unwrap_or(false)
        })
    }

    fn update_turrets(&mut self, ticks: Ticks) {
        let data = self.entity_type.data();
        if self.extension.turret_aim_remaining > Ticks::ZERO {
            self.extension.turret_aim_remaining = self.extension.turret_aim_remaining.saturating_sub(ticks);
        } else {
            self.extension.turret_target = None;
        }

        for (i, turret) in data.turrets.iter().enumerate() {
            let desired = match self.extension.turret_target {
                Some(target) => {
                    let turret_pos = self.position + rotate_vec(turret.offset, self.direction);
                    let world_angle = angle_to(turret_pos, target);
                    let relative = world_angle.diff(self.direction);
                    let delta_from_base = relative.diff(turret.base_angle).clamp_magnitude(turret.azimuth_limit);
                    Angle(turret.base_angle.0.wrapping_add(delta_from_base.0))
                }
                None => turret.base_angle,
            };

            let current = self.extension.turret_angle[i];
            let delta = desired.diff(current);
            let max_step = Angle::to_angle(TURRET_TURN_RATE * ticks.float());
            self.extension.turret_angle[i] = Angle(current.0.wrapping_add(delta.clamp_magnitude(max_step).0));
        }
    }

    /// Per-tick kinematic and gameplay integration. Returns `Some(tag)` if the entity died this
    /// tick, `None` if it's still alive.
    pub fn update(&mut self, ticks: Ticks, world_radius: f32, terrain: &Terrain, catalog: &Catalog) -> Option<DeathTag> {
        if self.is_dead() {
            return Some(DeathTag::Unknown);
        }

        let data = self.entity_type.data();
        self.extension.obstacle_contact = Ticks::ZERO;
        self.lifespan = self.lifespan.saturating_add(ticks);
        if !data.is_unlimited_lifespan() && self.lifespan > data.lifespan {
            return Some(DeathTag::Unknown);
        }

        let seconds = ticks.float();
        let is_shell_or_rocket = matches!(data.sub_kind, SubKind::Shell | SubKind::Rocket);

        // 3. Max-speed penalty for a large heading error.
        let heading_error = self.direction_target.diff(self.direction).float();
        let speed_penalty = if is_shell_or_rocket { 1.0 } else { 1.0 / (1.0 + heading_error * heading_error) };
        let max_speed = data.speed * speed_penalty;
        self.velocity_target = self.velocity_target.clamp_magnitude(max_speed.max(0.0));

        // 4. Rotate hull direction toward direction_target.
        let turn_scale = (1.0 - self.velocity.float().abs() / (data.speed + 1.0)).max(0.25);
        let max_turn = Angle::to_angle(HULL_TURN_RATE * turn_scale * seconds);
        let heading_delta = self.direction_target.diff(self.direction).clamp_magnitude(max_turn);
        self.direction = Angle(self.direction.0.wrapping_add(heading_delta.0));

        // 5. Submarine altitude control.
        if data.sub_kind == SubKind::Submarine {
            let (target, rate) = if self.has_noisy_reload_in_progress(catalog) {
                (0.0, SUBMARINE_AUTO_SURFACE_RATE)
            } else {
                (self.extension.altitude_target, SUBMARINE_REQUESTED_ALTITUDE_RATE)
            };
            let max_step = rate * seconds;
            let delta = (target - self.extension.altitude).clamp(-max_step, max_step);
            self.extension.altitude = (self.extension.altitude + delta).clamp(-1.0, 1.0);
        }

        // 6. Turret aiming.
        self.update_turrets(ticks);

        // 7. Velocity approaches velocity_target and is applied as displacement.
        let accel_cap = ACCEL_CAP * seconds;
        let delta_v = self.velocity_target.float() - self.velocity.float();
        let applied = delta_v.clamp(-accel_cap, accel_cap);
        self.velocity = self.velocity.add_clamped(applied, Velocity::to_velocity(max_speed.max(0.0)).float().max(self.velocity.float().abs()));
        self.position += self.direction.vec2() * (self.velocity.float() * seconds);

        // 8. Terrain sweep collision.
        if terrain.collides(self.position, self.direction.vec2(), self.velocity.float(), seconds) {
            if data.kind != Kind::Boat {
                return Some(DeathTag::Terrain);
            }
            self.velocity = self.velocity.clamp_magnitude(TERRAIN_BOAT_SPEED_CAP);
            if !matches!(data.sub_kind, SubKind::Dredger | SubKind::Hovercraft) {
                self.damage = self.damage.saturating_add(Ticks::from_damage(TERRAIN_BOAT_DAMAGE_RATE * seconds));
            }
        }

        // 9. World border check.
        let distance = self.position.length();
        if distance > world_radius {
            if distance > world_radius * BORDER_RADIUS_CLEARANCE || data.kind != Kind::Boat {
                return Some(DeathTag::Border);
            }
            self.damage = self.damage.saturating_add(Ticks::from_damage(BORDER_DAMAGE_RATE * seconds));
            let inward = -self.position.normalize_or_zero();
            self.position += inward * (self.velocity.float().abs() * seconds).min(distance - world_radius);
        }

        // 10. Armament reload, processed in contiguous similar runs.
        self.replenish_armaments(ticks);

        // 11. Repair.
        let submerged_factor = if self.is_submerged() { 0.5 } else { 1.0 };
        let repaired = Ticks::from_damage(REPAIR_RATE * submerged_factor * ticks.float() / TICK_PERIOD_SECONDS);
        self.damage = self.damage.saturating_sub(repaired);

        if self.is_dead() {
            return Some(DeathTag::Unknown);
        }
        None
    }

    fn replenish_armaments(&mut self, ticks: Ticks) {
        let data = self.entity_type.data();
        let submerged_factor = if self.is_submerged() { 0.2 } else { 1.0 };
        let budget = Ticks::to_ticks(ticks.float() * submerged_factor);
        if budget == Ticks::ZERO || data.armaments.is_empty() {
            return;
        }

        let mut start = 0;
        while start < data.armaments.len() {
            let mut end = start + 1;
            while end < data.armaments.len()
                && data.armaments[end].launches == data.armaments[start].launches
                && data.armaments[end].turret == data.armaments[start].turret
            {
                end += 1;
            }
            self.replenish_run(start, end, budget);
            start = end;
        }
    }

    fn replenish_run(&mut self, start: usize, end: usize, budget: Ticks) {
        let mut remaining_budget = budget;
        loop {
            let Some(slot) = (start..end)
                .filter(|&i| self.extension.armament_consumption[i] > Ticks::ZERO)
                .min_by_key(|&i| self.extension.armament_consumption[i])
            else {
                break;
            };
            if remaining_budget == Ticks::ZERO {
                break;
            }
            let current = self.extension.armament_consumption[slot];
            let applied = current.min(remaining_budget);
            self.extension.armament_consumption[slot] = current.saturating_sub(applied);
            remaining_budget = remaining_budget.saturating_sub(applied);
        }
    }

    /// Homing adjustment toward `other`'s position, applied when this is a non-friendly contact
    /// within the forward cone and not brand new.
    pub fn update_sensor(&mut self, other_position: Vec2, other_is_decoy: bool, entity_size: f32) {
        if self.lifespan.float() <= 1.0 {
            return;
        }
        let to_other = angle_to(self.position, other_position);
        let target_delta = to_other.diff(self.direction_target).float().abs();
        let current_delta = to_other.diff(self.direction).float().abs();
        const CONE: f32 = std::f32::consts::FRAC_PI_3;
        if target_delta > CONE || current_delta > CONE {
            return;
        }

        let size = if other_is_decoy { 100.0 } else { entity_size };
        let d2 = self.position.distance_squared(other_position);
        let angle_diff = to_other.diff(self.direction).float();
        let homing = (size * 600.0 / (1.0 + d2 + 20_000.0 * angle_diff * angle_diff)).clamp(0.01, 0.95);
        self.direction_target = self.direction_target.lerp(to_other, homing);
    }

    /// Copy-on-write consumption: marks armament `i` as just-fired, scaling reload time `×4` if
    /// it was launched as an airdrop (e.g. a carrier's depth charge).
    pub fn consume_armament(&mut self, index: usize, airdrop: bool) {
        let data = self.entity_type.data();
        let mut reload = data.armaments[index].reload;
        if airdrop {
            reload = Ticks::to_ticks(reload.float() * AIRDROP_RELOAD_MULTIPLIER);
        }
        self.extension.armament_consumption[index] = reload;
    }

    /// Mutates this entity's type (an "upgrade"), preserving an average consumption fraction
    /// across the old armament set so upgrading never grants free reloads, and re-aiming the new
    /// turret set at the prior shared target.
    pub fn initialize(&mut self, new_type: EntityTypeId) {
        let old_data = self.entity_type.data();
        let average_consumed_fraction = if old_data.armaments.is_empty() {
            0.0
        } else {
            let total: f32 = old_data
                .armaments
                .iter()
                .zip(&self.extension.armament_consumption)
                .map(|(mount, remaining)| {
                    if mount.reload == Ticks::ZERO {
                        0.0
                    } else {
                        remaining.float() / mount.reload.float()
                    }
                })
                .sum();
            total / old_data.armaments.len() as f32
        };

        let new_data = new_type.data();
        let mut extension = Extension::for_type(new_data.armaments.len(), new_data.turrets.len());
        for (i, mount) in new_data.armaments.iter().enumerate() {
            extension.armament_consumption[i] = Ticks::to_ticks(mount.reload.float() * average_consumed_fraction);
        }
        extension.turret_target = self.extension.turret_target;
        extension.turret_aim_remaining = self.extension.turret_aim_remaining;
        extension.altitude_target = self.extension.altitude_target;
        extension.altitude =
            if new_data.sub_kind == SubKind::Submarine { SUBMARINE_STARTING_ALTITUDE } else { self.extension.altitude };

        self.entity_type = new_type;
        self.extension = extension;
    }
}

const TICK_PERIOD_SECONDS: f32 = 0.1;

#[cfg(test)]
mod tests {
    use super::*;

    fn boat_type() -> EntityTypeId {
        Catalog::global().by_name("fairmileD").unwrap()
    }

    #[test]
    fn fresh_entity_has_zero_damage_and_is_alive() {
        let entity = Entity::new(boat_type(), Vec2::ZERO, None);
        assert!(!entity.is_dead());
        assert_eq!(entity.damage_fraction(), 0.0);
    }

    #[test]
    fn recent_spawn_factor_ramps_up_over_fifteen_seconds() {
        let mut entity = Entity::new(boat_type(), Vec2::ZERO, None);
        assert!((entity.recent_spawn_factor() - 0.25).abs() < 1e-6);
        entity.lifespan = Ticks::to_ticks(15.0);
        assert!((entity.recent_spawn_factor() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn consume_armament_sets_full_reload() {
        let mut entity = Entity::new(boat_type(), Vec2::ZERO, None);
        entity.consume_armament(0, false);
        let expected = entity.entity_type.data().armaments[0].reload;
        assert_eq!(entity.extension.armament_consumption[0], expected);
    }

    #[test]
    fn consume_armament_airdrop_quadruples_reload() {
        let mut entity = Entity::new(boat_type(), Vec2::ZERO, None);
        entity.consume_armament(0, true);
        let base = entity.entity_type.data().armaments[0].reload.float();
        assert!((entity.extension.armament_consumption[0].float() - base * 4.0).abs() < 0.2);
    }

    #[test]
    fn initialize_preserves_average_consumption_fraction() {
        let mut entity = Entity::new(boat_type(), Vec2::ZERO, None);
        for i in 0..entity.extension.armament_consumption.len() {
            entity.consume_armament(i, false);
        }
        let destroyer = Catalog::global().by_name("destroyerMk2").unwrap();
        entity.initialize(destroyer);
        assert!(entity.extension.armament_consumption.iter().any(|t| *t > Ticks::ZERO));
    }

    #[test]
    fn armament_transform_without_turret_uses_hull_pose() {
        let entity = Entity::new(boat_type(), Vec2::ZERO, None);
        let (pos, _dir) = entity.armament_transform(0);
        assert!(pos.is_finite());
    }

    #[test]
    fn camera_reports_zero_sonar_on_the_surface() {
        let entity = Entity::new(boat_type(), Vec2::ZERO, None);
        let (_, _, _, sonar) = entity.camera();
        assert_eq!(sonar, 0.0);
    }

    #[test]
    fn update_kills_entity_past_max_health() {
        let mut entity = Entity::new(boat_type(), Vec2::ZERO, None);
        entity.damage = Ticks::from_damage(1.0);
        let terrain = Terrain::new(0);
        let outcome = entity.update(Ticks(1), 10_000.0, &terrain, Catalog::global());
        assert!(outcome.is_some());
    }
}
