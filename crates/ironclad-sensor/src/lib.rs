//! Per-observer contact construction: turns "what's near the observer" into "what the observer's
//! sensors actually resolve", with uncertainty shrinking per active channel and a disclosure
//! ladder gating which fields of a [`Contact`] get filled in.

use glam::Vec2;
use ironclad_catalog::{Kind, SubKind};
use ironclad_entity::Entity;
use ironclad_player::{player_id_to_hex, PlayerId, Roster, TeamId};
use ironclad_proto::{Contact, ContactOwner, Guidance, WireTeamId};

/// Distance within which teammates are fully disclosed even without dedicated sensor contact.
const TEAM_KNOWN_RANGE: f32 = 800.0;
/// Distance within which a contact's entity type is revealed regardless of uncertainty.
const TYPE_REVEAL_RANGE: f32 = 100.0;
const TYPE_REVEAL_UNCERTAINTY: f32 = 0.5;
const OWNER_REVEAL_UNCERTAINTY: f32 = 0.5;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Channel {
    Radar,
    Sonar,
    Visual,
}

/// The sensing entity's camera and identity, as handed to [`classify_contact`] once per update
/// recipient. Built from `Entity::camera()` for a live player or from the reduced dead-camera
/// view for a recently-killed one.
#[derive(Copy, Clone, Debug)]
pub struct ObserverContext {
    pub position: Vec2,
    pub visual_range: f32,
    pub radar_range: f32,
    pub sonar_range: f32,
    pub altitude: f32,
    pub velocity: f32,
    pub owner: Option<PlayerId>,
    pub team: Option<TeamId>,
    /// Whether this observer is a bot client, which gets optimistic (non-full) team-full reads
    /// so bots prefer joining rather than founding redundant teams.
    pub is_bot: bool,
}

impl ObserverContext {
    #[must_use]
    pub fn max_range(&self) -> f32 {
        self.visual_range.max(self.radar_range).max(self.sonar_range)
    }
}

fn radar_emission(target: &Entity) -> f32 {
    let data = target.entity_type.data();
    let mut emission = 5.0;
    if data.kind == Kind::Boat {
        emission += 5.0;
        if target.extension.active_sensors {
            emission += 20.0;
        }
    }
    if data.sub_kind == SubKind::Missile {
        emission += 30.0;
    }
    emission
}

fn sonar_noise(target: &Entity) -> f32 {
    let data = target.entity_type.data();
    let mut noise = (target.velocity.float().abs() - 5.0).max(10.0);
    if data.kind != Kind::Boat {
        noise += 100.0;
    } else if target.extension.active_sensors {
        noise += 20.0;
    }
    noise
}

/// Computes uncertainty and which channel produced it for `target` as seen by `observer`.
/// Returns `None` if no channel resolves the target at all (uncertainty would be `>= 1.0`).
fn channel_uncertainty(observer: &ObserverContext, target: &Entity, d2: f32) -> Option<(f32, Channel)> {
    let data = target.entity_type.data();
    let inv_size = data.inv_size;
    let inv_v = if observer.visual_range > 0.0 { 1.0 / (observer.visual_range * observer.visual_range) } else { 0.0 };
    let inv_r = if observer.radar_range > 0.0 { 1.0 / (observer.radar_range * observer.radar_range) } else { 0.0 };
    let inv_s = if observer.sonar_range > 0.0 { 1.0 / (observer.sonar_range * observer.sonar_range) } else { 0.0 };

    let mut best: Option<(f32, Channel)> = None;
    let mut consider = |value: f32, channel: Channel| {
        if best.is_none_or(|(current, _)| value < current) {
            best = Some((value, channel));
        }
    };

    if observer.radar_range > 0.0 && target.extension.altitude >= -0.1 {
        let base = d2 * inv_r * inv_size;
        let active = base * (15.0 / (15.0 + target.velocity.float().abs()));
        consider(active, Channel::Radar);
        let emission = radar_emission(target);
        let passive = base * (25.0 / emission);
        consider(passive, Channel::Radar);
    }

    if observer.sonar_range > 0.0 && target.extension.altitude <= 0.0 {
        let base = d2 * inv_s * inv_size;
        consider(base, Channel::Sonar);
        let noise = sonar_noise(target);
        let passive = (base / noise) * (10.0 + observer.velocity.abs());
        consider(passive, Channel::Sonar);
    }

    if observer.visual_range > 0.0 {
        let base = d2 * inv_v * inv_size;
        let depth_factor = if target.extension.altitude < 0.0 { (1.0 + target.extension.altitude).max(0.1) } else { 1.0 };
        consider(base / depth_factor, Channel::Visual);
    }

    best
}

/// Builds the [`Contact`] `observer` has on `target`, or `None` if `target` is not observed at
/// all (out of every sensor's range, or every channel's uncertainty came back `>= 1.0`).
#[must_use]
pub fn classify_contact(
    observer: &ObserverContext,
    target: &Entity,
    target_team: Option<TeamId>,
    roster: &Roster,
) -> Option<Contact> {
    let delta = target.position - observer.position;
    let d2 = delta.length_squared();
    let distance = d2.sqrt();

    let same_player = observer.owner.is_some() && observer.owner == target.owner;
    let same_team = observer.team.is_some() && observer.team == target_team;
    let known_ally = same_player || (same_team && distance <= TEAM_KNOWN_RANGE);

    let (uncertainty, visible_via_visual) = if known_ally {
        (0.0, true)
    } else {
        if d2 > observer.max_range() * observer.max_range() {
            return None;
        }
        let (value, channel) = channel_uncertainty(observer, target, d2)?;
        if value >= 1.0 {
            return None;
        }
        (value.clamp(0.0, 1.0), channel == Channel::Visual)
    };

    let data = target.entity_type.data();
    let reveal_type = known_ally
        || uncertainty < TYPE_REVEAL_UNCERTAINTY
        || distance < TYPE_REVEAL_RANGE
        || data.kind == Kind::Collectible;
    let reveal_kinematics = known_ally || visible_via_visual;
    let reveal_owner = known_ally || uncertainty < OWNER_REVEAL_UNCERTAINTY;

    let owner = if reveal_owner {
        target.owner.and_then(|owner_id| {
            roster.player(owner_id).map(|player| {
                let team = player.team.and_then(|tid| roster.team(tid));
                let team_full = match team {
                    Some(t) => !observer.is_bot && t.is_full(),
                    None => false,
                };
                ContactOwner {
                    id: player_id_to_hex(owner_id),
                    name: player.display_name.clone(),
                    score: player.score,
                    team: team.and_then(|t| WireTeamId::pack(&t.name).ok()),
                    team_full,
                }
            })
        })
    } else {
        None
    };

    Some(Contact {
        position: target.position,
        velocity: target.velocity,
        direction: target.direction,
        altitude: target.extension.altitude,
        uncertainty,
        entity_type: reveal_type.then_some(target.entity_type),
        armament_consumption: reveal_kinematics.then(|| target.extension.armament_consumption.clone()),
        turret_angles: reveal_kinematics.then(|| target.extension.turret_angle.clone()),
        damage_percent: reveal_kinematics.then(|| target.damage_fraction()),
        guidance: known_ally.then_some(Guidance { direction_target: target.direction_target, velocity_target: target.velocity_target }),
        friendly: (same_player || same_team).then_some(true),
        owner,
    })
}

#[cfg(test)]
mod tests {
    use ironclad_catalog::Catalog;
    use ironclad_player::Roster;

    use super::*;

    fn observer_at(position: Vec2, altitude: f32) -> ObserverContext {
        ObserverContext {
            position,
            visual_range: 300.0,
            radar_range: 0.0,
            sonar_range: 600.0,
            altitude,
            velocity: 0.0,
            owner: None,
            team: None,
            is_bot: false,
        }
    }

    fn stationary_boat() -> Entity {
        let boat_type = Catalog::global().by_name("fairmileD").unwrap();
        Entity::new(boat_type, Vec2::new(400.0, 0.0), None)
    }

    #[test]
    fn uncertainty_decreases_then_increases_as_observer_surfaces_then_dives() {
        let roster = Roster::new();
        let target = stationary_boat();

        let submerged = observer_at(Vec2::ZERO, -1.0);
        let rising = observer_at(Vec2::ZERO, -0.3);
        let surfaced = observer_at(Vec2::ZERO, 0.0);

        let u_submerged = classify_contact(&submerged, &target, None, &roster).map(|c| c.uncertainty);
        let u_rising = classify_contact(&rising, &target, None, &roster).map(|c| c.uncertainty);
        let u_surfaced = classify_contact(&surfaced, &target, None, &roster).map(|c| c.uncertainty);

        // Surfacing improves (or at worst holds) the visual channel's view as the depth
        // attenuation factor relaxes toward 1.0.
        if let (Some(a), Some(b)) = (u_submerged, u_rising) {
            assert!(b <= a + 1e-6);
        }
        if let (Some(a), Some(b)) = (u_rising, u_surfaced) {
            assert!(b <= a + 1e-6);
        }
    }

    #[test]
    fn contact_beyond_every_sensor_range_is_not_emitted() {
        let roster = Roster::new();
        let target = Entity::new(Catalog::global().by_name("fairmileD").unwrap(), Vec2::new(10_000.0, 0.0), None);
        let observer = observer_at(Vec2::ZERO, 0.0);
        assert!(classify_contact(&observer, &target, None, &roster).is_none());
    }

    #[test]
    fn known_teammate_is_fully_disclosed_regardless_of_distance() {
        let mut roster = Roster::new();
        let now = std::time::Instant::now();
        let owner = roster.register("ally".into(), false, now);
        let mut target = stationary_boat();
        target.owner = Some(owner);

        let observer = ObserverContext { owner: Some(owner), ..observer_at(Vec2::ZERO, 0.0) };
        let contact = classify_contact(&observer, &target, None, &roster).unwrap();
        assert_eq!(contact.uncertainty, 0.0);
        assert!(contact.entity_type.is_some());
        assert!(contact.guidance.is_some());
    }
}
