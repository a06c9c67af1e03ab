//! The single-threaded neighbor sweep: friendliness and altitude-overlap checks, gravitation
//! toward magnetized targets, weapon homing, aircraft/ASROC attack runs, anti-aircraft fire,
//! friendly aircraft landing, and the collision-resolution switch over collider-kind pairs.
//!
//! `World::for_each_and_others` invokes its pair callback once per *directed* edge: a touching
//! pair `(x, y)` is visited both as `(x, y)` and `(y, x)`. A resolution rule whose trigger
//! condition distinguishes `a`'s kind from `b`'s (boat-vs-weapon, coin-vs-platform, boat-vs-
//! obstacle) can only match one of the two directed calls, so it is free to mutate both sides.
//! A rule whose condition is symmetric under swapping `a` and `b` (boat-vs-boat) matches both
//! directed calls and must mutate only `a`: each call handles its own side, and the reverse call
//! handles the other.

use glam::Vec2;
use ironclad_catalog::{Catalog, EntityTypeData, EntityTypeId, Kind, SubKind};
use ironclad_entity::Entity;
use ironclad_numerics::{Angle, Ticks};
use ironclad_player::{DeathReason, DeathTag, PlayerId, Roster};
use ironclad_spatial::World;

use crate::{DeathEvent, PhysicsOutcome, ScoreCredit};

const ALTITUDE_OVERLAP_THRESHOLD: f32 = 0.25;
const DECOY_SONAR_REPORTED_ALTITUDE: f32 = -0.225;
const AIRCRAFT_ATTACK_RANGE_FACTOR: f32 = 1.7;
const AIRCRAFT_ATTACK_PERIOD_SECONDS: f32 = 3.0;
const AIRCRAFT_LANDING_MIN_LIFESPAN_SECONDS: f32 = 5.0;
const OBSTACLE_KILL_TICKS: Ticks = Ticks(60); // 6 s
const COLLISION_IMPULSE_STRENGTH: f32 = 40.0; // m/s^2 equivalent, applied as direct displacement
const RAM_SPAWN_PROTECTION_FLOOR_SECONDS: f32 = 15.0;
const GRAVITATION_RATE: f32 = 0.35; // fraction of the remaining gap closed per second
const FRESH_DROP_SECONDS: f32 = 5.0;
const MINE_HOMING_RATE: f32 = 0.15;
const ANGULAR_PERTURBATION_RADIANS: f32 = 0.15;

/// A request to spawn a new entity, recorded during the sweep and applied once the sweep's
/// mutable borrow of `world` has ended.
struct LaunchRequest {
    entity_type: EntityTypeId,
    position: Vec2,
    direction: Angle,
    owner: Option<PlayerId>,
}

pub fn sweep(world: &mut World<Entity>, ticks: Ticks, catalog: &Catalog, roster: &Roster, outcome: &mut PhysicsOutcome) {
    let mut dead: Vec<(Entity, DeathReason)> = Vec::new();
    let mut credits: Vec<ScoreCredit> = Vec::new();
    let mut launches: Vec<LaunchRequest> = Vec::new();

    world.for_each_and_others(
        |entity| sweep_radius(entity.entity_type.data()),
        |a, b| pair(a, b, ticks, catalog, roster, &mut dead, &mut credits, &mut launches),
    );

    for request in launches {
        let mut projectile = Entity::new(request.entity_type, request.position, request.owner);
        projectile.direction = request.direction;
        projectile.direction_target = request.direction;
        world.add(projectile);
    }

    outcome.credits.extend(credits);
    for (entity, reason) in dead {
        if entity.entity_type.data().kind == Kind::Boat {
            let victim_score = entity.owner.and_then(|id| roster.player(id)).map_or(0, |player| player.score);
            crate::loot::spawn(world, catalog, &entity, victim_score);
        }
        outcome.deaths.push(DeathEvent { owner: entity.owner, reason, position: entity.position });
    }
}

fn sweep_radius(data: &EntityTypeData) -> f32 {
    if data.kind == Kind::Collectible {
        return 0.0;
    }
    let base = 2.0 * data.radius;
    if matches!(data.kind, Kind::Aircraft | Kind::Weapon) {
        base.max(data.sensors.max_range())
    } else {
        base
    }
}

fn angle_to(from: Vec2, to: Vec2) -> Angle {
    let delta = to - from;
    Angle::to_angle(delta.y.atan2(delta.x))
}

fn same_team_or_owner(a: &Entity, b: &Entity, roster: &Roster) -> bool {
    match (a.owner, b.owner) {
        (Some(oa), Some(ob)) if oa == ob => true,
        (Some(oa), Some(ob)) => {
            let team_a = roster.player(oa).and_then(|p| p.team);
            let team_b = roster.player(ob).and_then(|p| p.team);
            matches!((team_a, team_b), (Some(ta), Some(tb)) if ta == tb)
        }
        _ => false,
    }
}

fn is_submerged(entity: &Entity, data: &EntityTypeData) -> bool {
    data.sub_kind == SubKind::Submarine && entity.extension.altitude < 0.0
}

fn reported_altitude(entity: &Entity, data: &EntityTypeData) -> f32 {
    if matches!(data.sub_kind, SubKind::Decoy | SubKind::Sonar) {
        DECOY_SONAR_REPORTED_ALTITUDE
    } else {
        entity.extension.altitude
    }
}

fn altitude_overlaps(a: &Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData) -> bool {
    let is_depth_weapon = |data: &EntityTypeData| matches!(data.sub_kind, SubKind::DepthCharge | SubKind::Torpedo | SubKind::Mine);
    if is_submerged(a, a_data) && is_depth_weapon(b_data) {
        return true;
    }
    if is_submerged(b, b_data) && is_depth_weapon(a_data) {
        return true;
    }
    (reported_altitude(a, a_data) - reported_altitude(b, b_data)).abs() <= ALTITUDE_OVERLAP_THRESHOLD
}

/// Separating-axis test between swept hulls, short-circuited to `true` within blast radius for
/// SAMs (simulating fragmentation rather than a direct-contact fuse).
fn collides(a: &Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData, seconds: f32) -> bool {
    let d2 = a.position.distance_squared(b.position);
    let sweep_a = a.velocity.float().abs() * seconds;
    let sweep_b = b.velocity.float().abs() * seconds;
    let reach = a_data.radius + b_data.radius + sweep_a + sweep_b;
    if d2 > reach * reach {
        return false;
    }

    if a_data.sub_kind == SubKind::Sam || b_data.sub_kind == SubKind::Sam {
        let blast = (a_data.radius + b_data.radius) * 3.0;
        if d2 <= blast * blast {
            return true;
        }
    }

    let hull_a = a.hull().swept(a.direction.vec2() * sweep_a);
    let hull_b = b.hull().swept(b.direction.vec2() * sweep_b);
    hull_a.intersects(&hull_b)
}

/// §4.5.B.3: magnetized drift that happens whether or not the pair actually intersects. Each
/// condition names `a`'s kind distinctly from `b`'s, so it fires from exactly one of the two
/// directed calls and may freely mutate `a`.
fn apply_gravitation(a: &mut Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData, seconds: f32) {
    if a_data.kind == Kind::Collectible && b_data.kind == Kind::Boat {
        let dropped_by_this_owner = a.owner.is_some() && a.owner == b.owner && a.lifespan.float() < FRESH_DROP_SECONDS;
        if !dropped_by_this_owner {
            a.position = a.position.lerp(b.position, (GRAVITATION_RATE * seconds).clamp(0.0, 1.0));
        }
        return;
    }
    if a_data.sub_kind == SubKind::Coin && b_data.kind == Kind::Obstacle && b_data.sub_kind == SubKind::Platform {
        a.position = a.position.lerp(b.position, (GRAVITATION_RATE * seconds).clamp(0.0, 1.0));
        return;
    }
    if a_data.sub_kind == SubKind::Mine && b_data.kind == Kind::Boat {
        let proximate = a.hull().bounding_radius() + b_data.radius * 2.0;
        if a.position.distance(b.position) <= proximate {
            let target = angle_to(a.position, b.position);
            a.direction_target = a.direction_target.lerp(target, MINE_HOMING_RATE * seconds);
            a.velocity_target = a.velocity_target.clamp_min(a_data.speed * 0.5);
        }
    }
}

/// §4.5.B.5. `a` is the attacker: an aircraft or a homing missile (ASROC) with armaments still
/// to fire, within loose range of an enemy boat `b`.
fn try_attack(
    a: &mut Entity,
    a_data: &EntityTypeData,
    b: &Entity,
    b_data: &EntityTypeData,
    friendly: bool,
    seconds: f32,
    launches: &mut Vec<LaunchRequest>,
) -> bool {
    let is_attacker = (a_data.kind == Kind::Aircraft || a_data.sub_kind == SubKind::Missile) && !a_data.armaments.is_empty();
    if !is_attacker || friendly || b_data.kind != Kind::Boat {
        return false;
    }
    let reach = (a_data.radius + b_data.radius) * AIRCRAFT_ATTACK_RANGE_FACTOR;
    if a.position.distance_squared(b.position) > reach * reach {
        return false;
    }

    let period = AIRCRAFT_ATTACK_PERIOD_SECONDS;
    let elapsed = a.lifespan.float();
    let previous = (elapsed - seconds).max(0.0);
    if (elapsed / period).floor() <= (previous / period).floor() {
        return false;
    }

    for i in 0..a_data.armaments.len() {
        if a.extension.armament_consumption[i] != Ticks::ZERO {
            continue;
        }
        let Some(launch_type) = a_data.armaments[i].launches else { continue };
        let (position, base_direction) = a.armament_transform(i);
        let perturbation = Angle::to_angle((fastrand::f32() * 2.0 - 1.0) * ANGULAR_PERTURBATION_RADIANS);
        let direction = Angle(base_direction.0.wrapping_add(perturbation.0));
        launches.push(LaunchRequest { entity_type: launch_type, position, direction, owner: a.owner });
        a.consume_armament(i, a_data.kind == Kind::Aircraft);
    }

    a_data.sub_kind == SubKind::Missile
}

/// §4.5.B.6: `a` is an aircraft, `b` a boat with anti-aircraft fire. Asymmetric on kind, so this
/// only ever matches one of the two directed calls.
fn try_anti_aircraft(a: &Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData, seconds: f32) -> bool {
    if a_data.kind != Kind::Aircraft || b_data.kind != Kind::Boat || b_data.anti_aircraft <= 0.0 {
        return false;
    }
    let r = 1.5 * b_data.radius;
    let d2 = a.position.distance_squared(b.position);
    let hit_probability = (b_data.anti_aircraft * (1.0 - d2 / (r * r)).max(0.0) * seconds).clamp(0.0, 1.0);
    fastrand::f32() < hit_probability
}

/// §4.5.B.7: `a` is a friendly aircraft home from patrol.
fn try_land(a: &Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData, friendly: bool) -> bool {
    if a_data.kind != Kind::Aircraft || b_data.kind != Kind::Boat || !friendly || a.owner != b.owner {
        return false;
    }
    if a.lifespan.float() < AIRCRAFT_LANDING_MIN_LIFESPAN_SECONDS {
        return false;
    }
    let reach = a_data.radius + b_data.radius;
    a.position.distance_squared(b.position) <= reach * reach
}

fn hq_type(catalog: &Catalog) -> Option<EntityTypeId> {
    catalog.iter().find(|id| {
        let data = catalog.get(*id);
        data.kind == Kind::Obstacle && data.sub_kind == SubKind::Hq
    })
}

fn push_apart(a: &mut Entity, a_data: &EntityTypeData, b: &Entity, b_data: &EntityTypeData, seconds: f32) {
    let away = (a.position - b.position).normalize_or_zero();
    let mass_a = (a_data.length * a_data.width).max(1.0);
    let mass_b = (b_data.length * b_data.width).max(1.0);
    let share = mass_b / (mass_a + mass_b);
    a.position += away * (COLLISION_IMPULSE_STRENGTH * share * seconds);
}

#[allow(clippy::too_many_arguments)]
fn pair(
    a: &mut Entity,
    b: &mut Entity,
    ticks: Ticks,
    catalog: &Catalog,
    roster: &Roster,
    dead: &mut Vec<(Entity, DeathReason)>,
    credits: &mut Vec<ScoreCredit>,
    launches: &mut Vec<LaunchRequest>,
) -> (bool, bool) {
    let seconds = ticks.float();
    let a_data = a.entity_type.data();
    let b_data = b.entity_type.data();
    let friendly = same_team_or_owner(a, b, roster);
    let altitude_ok = altitude_overlaps(a, a_data, b, b_data);

    apply_gravitation(a, a_data, b, b_data, seconds);

    if !friendly && altitude_ok && a_data.kind == Kind::Weapon {
        let is_decoy = matches!(b_data.sub_kind, SubKind::Decoy | SubKind::Sonar);
        a.update_sensor(b.position, is_decoy, b_data.radius);
    }

    let a_asrok_expired = try_attack(a, a_data, b, b_data, friendly, seconds, launches);

    let mut remove_a = a_asrok_expired;
    let mut remove_b = false;

    if try_anti_aircraft(a, a_data, b, b_data, seconds) {
        remove_a = true;
    }
    if try_land(a, a_data, b, b_data, friendly) {
        remove_a = true;
    }

    if !altitude_ok || !collides(a, a_data, b, b_data, seconds) {
        return (remove_a, remove_b);
    }

    // boat + collectible (single-fire: kinds differ).
    if a_data.kind == Kind::Boat && b_data.kind == Kind::Collectible {
        let mut points = i64::from(b_data.level);
        if a_data.sub_kind == SubKind::Tanker && b_data.sub_kind == SubKind::Barrel {
            points *= 2;
        }
        if let Some(owner) = a.owner {
            credits.push(ScoreCredit { player: owner, amount: points });
        }
        if b.owner != a.owner {
            a.damage = a.damage.saturating_sub(Ticks::from_damage(0.3));
            for slot in &mut a.extension.armament_consumption {
                *slot = slot.saturating_sub(b_data.reload);
            }
        }
        return (remove_a, true);
    }

    // payment-coin + oil-platform (single-fire: kinds differ).
    if a_data.sub_kind == SubKind::Coin && b_data.kind == Kind::Obstacle && b_data.sub_kind == SubKind::Platform {
        if fastrand::f32() < 0.1 {
            if let Some(hq) = hq_type(catalog) {
                b.initialize(hq);
            }
        }
        return (true, remove_b);
    }

    // boat + weapon, non-friendly (single-fire: kinds differ).
    if a_data.kind == Kind::Boat && b_data.kind == Kind::Weapon && !friendly {
        let proximity = 1.0 - (a.position.distance(b.position) / (a_data.radius + b_data.radius).max(1.0)).clamp(0.0, 1.0);
        let damage = b_data.damage * proximity.max(0.2) * a.recent_spawn_factor();
        a.damage = a.damage.saturating_add(Ticks::from_damage(damage));
        if let Some(victim_owner) = a.owner {
            if let Some(attacker_owner) = b.owner {
                let victim_score = roster.player(victim_owner).map_or(0, |p| p.score);
                credits.push(ScoreCredit { player: attacker_owner, amount: 10 + i64::from(victim_score) / 4 });
            }
        }
        if a.is_dead() {
            let attacker_name = b.owner.and_then(|id| roster.player(id)).map(|p| p.display_name.clone());
            dead.push((a.clone(), DeathReason { tag: DeathTag::Weapon, attacker_name, attacker_type: Some(b.entity_type) }));
            return (true, true);
        }
        return (remove_a, true);
    }

    // boat + boat, non-friendly (symmetric: mutate only `a`, reverse call handles `b`).
    if a_data.kind == Kind::Boat && b_data.kind == Kind::Boat && !friendly {
        let ram_a = a_data.sub_kind == SubKind::Ram;
        let ram_b = b_data.sub_kind == SubKind::Ram;
        let hp_factor = |data: &EntityTypeData, damage: Ticks| ((1.0 - damage.damage().clamp(0.0, 1.0)) * 0.5 + 0.5) * data.damage;
        let base = 1.1 * hp_factor(a_data, a.damage).min(hp_factor(b_data, b.damage));
        let multiplier = if ram_a {
            1.0 / 3.0
        } else if ram_b {
            3.0
        } else {
            1.0
        };
        a.damage = a.damage.saturating_add(Ticks::from_damage(base * multiplier * seconds));
        if ram_a {
            a.lifespan = a.lifespan.max(Ticks::to_ticks(RAM_SPAWN_PROTECTION_FLOOR_SECONDS));
        }
        push_apart(a, a_data, b, b_data, seconds);

        if a.is_dead() {
            let tag = if ram_a || ram_b { DeathTag::Ramming } else { DeathTag::Collision };
            let attacker_name = b.owner.and_then(|id| roster.player(id)).map(|p| p.display_name.clone());
            dead.push((a.clone(), DeathReason { tag, attacker_name, attacker_type: Some(b.entity_type) }));
            return (true, remove_b);
        }
        return (remove_a, remove_b);
    }

    // boat + obstacle (single-fire: kinds differ).
    if a_data.kind == Kind::Boat && b_data.kind == Kind::Obstacle {
        push_apart(a, a_data, b, b_data, seconds);
        a.extension.obstacle_contact = a.extension.obstacle_contact.saturating_add(ticks);
        if a.extension.obstacle_contact >= OBSTACLE_KILL_TICKS {
            a.damage = Ticks::from_damage(1.0);
            dead.push((a.clone(), DeathReason { tag: DeathTag::Collision, attacker_name: None, attacker_type: None }));
            return (true, remove_b);
        }
        return (remove_a, remove_b);
    }

    // boat + decoy, weapon + payment-coin, and any still-friendly pair: no-op.
    if a_data.kind == Kind::Decoy || b_data.kind == Kind::Decoy || a_data.sub_kind == SubKind::Coin || b_data.sub_kind == SubKind::Coin || friendly {
        return (remove_a, remove_b);
    }

    // Otherwise non-friendly: remove the non-obstacle side(s).
    if a_data.kind != Kind::Obstacle {
        remove_a = true;
    }
    if b_data.kind != Kind::Obstacle {
        remove_b = true;
    }
    (remove_a, remove_b)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use ironclad_catalog::Catalog;

    use super::*;
    use crate::loot::collectible_type;

    fn boats(catalog: &Catalog) -> (EntityTypeId, EntityTypeId) {
        (catalog.by_name("fairmileD").unwrap(), catalog.by_name("destroyerMk2").unwrap())
    }

    #[test]
    fn non_friendly_boats_overlap_into_symmetric_damage() {
        let catalog = Catalog::global();
        let (type_a, type_b) = boats(catalog);
        let mut roster = Roster::new();
        let now = Instant::now();
        let owner_a = roster.register("a".into(), false, now);
        let owner_b = roster.register("b".into(), false, now);

        let mut a = Entity::new(type_a, Vec2::ZERO, Some(owner_a));
        let mut b = Entity::new(type_b, Vec2::new(1.0, 0.0), Some(owner_b));
        let mut dead = Vec::new();
        let mut credits = Vec::new();
        let mut launches = Vec::new();

        let before = a.damage;
        let _ = pair(&mut a, &mut b, Ticks(1), catalog, &roster, &mut dead, &mut credits, &mut launches);

        assert!(a.damage > before);
    }

    #[test]
    fn friendly_boats_never_take_collision_damage() {
        let catalog = Catalog::global();
        let (type_a, type_b) = boats(catalog);
        let mut roster = Roster::new();
        let now = Instant::now();
        let owner = roster.register("solo".into(), false, now);

        let mut a = Entity::new(type_a, Vec2::ZERO, Some(owner));
        let mut b = Entity::new(type_b, Vec2::new(1.0, 0.0), Some(owner));
        let mut dead = Vec::new();
        let mut credits = Vec::new();
        let mut launches = Vec::new();

        let before = a.damage;
        let _ = pair(&mut a, &mut b, Ticks(1), catalog, &roster, &mut dead, &mut credits, &mut launches);

        assert_eq!(a.damage, before);
    }

    #[test]
    fn picking_up_a_collectible_credits_the_owner_and_removes_it() {
        let catalog = Catalog::global();
        let boat_type = catalog.by_name("fairmileD").unwrap();
        let scrap_type = collectible_type(catalog, SubKind::Scrap).expect("catalog defines scrap");
        let roster = Roster::new();

        let mut boat = Entity::new(boat_type, Vec2::ZERO, None);
        let mut scrap = Entity::new(scrap_type, Vec2::new(0.5, 0.0), None);
        let mut dead = Vec::new();
        let mut credits = Vec::new();
        let mut launches = Vec::new();

        let (remove_a, remove_b) = pair(&mut boat, &mut scrap, Ticks(1), catalog, &roster, &mut dead, &mut credits, &mut launches);

        assert!(!remove_a);
        assert!(remove_b);
    }

    #[test]
    fn altitude_overlap_lets_a_torpedo_reach_a_submerged_submarine() {
        let catalog = Catalog::global();
        let torpedo_type = catalog.iter().find(|id| catalog.get(*id).sub_kind == SubKind::Torpedo).unwrap();
        let sub_type = catalog.iter().find(|id| catalog.get(*id).sub_kind == SubKind::Submarine).unwrap();

        let torpedo = Entity::new(torpedo_type, Vec2::ZERO, None);
        let mut submarine = Entity::new(sub_type, Vec2::new(1.0, 0.0), None);
        submarine.extension.altitude = -0.8;

        let torpedo_data = torpedo.entity_type.data();
        let sub_data = submarine.entity_type.data();
        assert!(altitude_overlaps(&torpedo, torpedo_data, &submarine, sub_data));
    }
}
