//! World population bookkeeping: player name sanitization, the world-radius-from-player-count
//! curve, the periodic collectible/obstacle seeding pass, and player spawn-point selection.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use ironclad_catalog::{Catalog, Kind};
use ironclad_entity::Entity;
use ironclad_player::{Moderation, TeamId};

use crate::{Hub, Moderator};

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 12;
const RESERVED_NAMES: &[&str] = &["admin", "moderator", "system", "server", "gm"];

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum NameError {
    #[error("name must be {MIN_NAME_LEN}-{MAX_NAME_LEN} characters after trimming")]
    BadLength,
    #[error("name contains disallowed characters")]
    DisallowedCharacters,
    #[error("name is reserved")]
    Reserved,
    #[error("name failed moderation")]
    Moderated,
}

/// Trims ordinary whitespace plus the two "invisible space" characters players use to dodge
/// length checks (U+2800 braille blank, U+200B zero-width space), then validates length,
/// disallowed characters, reserved names, and moderation in that order.
pub fn sanitize_name(raw: &str, hub: &Hub, authed: bool) -> Result<String, NameError> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{2800}' || c == '\u{200b}');
    let len = trimmed.chars().count();
    if len < MIN_NAME_LEN || len > MAX_NAME_LEN {
        return Err(NameError::BadLength);
    }
    if trimmed.contains(['[', ']', '*']) {
        return Err(NameError::DisallowedCharacters);
    }
    if !authed && RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(trimmed)) {
        return Err(NameError::Reserved);
    }
    if hub.moderator.classify(trimmed) == Moderation::Severe {
        return Err(NameError::Moderated);
    }
    Ok(trimmed.to_string())
}

/// World area budgeted per connected player, beyond a floor big enough for an empty server to
/// not feel claustrophobic. The radius lerps toward "the radius implied by the current
/// population" — this curve is the decision that phrase implies.
const MIN_WORLD_RADIUS: f32 = 2_000.0;
const WORLD_AREA_PER_PLAYER: f32 = 150_000.0;

#[must_use]
pub fn radius_for_population(players: usize) -> f32 {
    let floor_area = PI * MIN_WORLD_RADIUS * MIN_WORLD_RADIUS;
    let area = floor_area + WORLD_AREA_PER_PLAYER * players as f32;
    (area / PI).sqrt()
}

/// Target world population of each seeded kind, proportional to world area so sparser early-game
/// worlds aren't flooded and later, bigger worlds don't feel empty.
const COLLECTIBLE_AREA_PER_UNIT: f32 = 40_000.0;
const OBSTACLE_AREA_PER_UNIT: f32 = 600_000.0;
const MIN_OBSTACLES: usize = 2;

const COLLECTIBLE_TYPES: &[&str] = &["scrap", "coin", "barrel"];
const OBSTACLE_TYPES: &[&str] = &["oilPlatform", "reef"];

/// Tops up collectibles and obstacles to their area-scaled targets. Headquarters are never seeded
/// here: they only come into existence via the coin-lands-on-platform upgrade in
/// `ironclad_physics::collision`.
pub fn seed_pass(hub: &mut Hub) {
    let area = PI * hub.world_radius * hub.world_radius;
    let target_collectibles = (area / COLLECTIBLE_AREA_PER_UNIT) as usize;
    let target_obstacles = ((area / OBSTACLE_AREA_PER_UNIT) as usize).max(MIN_OBSTACLES);

    let mut collectibles = 0usize;
    let mut obstacles = 0usize;
    hub.world.for_each_id(|_, entity| match entity.entity_type.data().kind {
        Kind::Collectible => collectibles += 1,
        Kind::Obstacle => obstacles += 1,
        _ => {}
    });

    let catalog = hub.catalog;
    let world_radius = hub.world_radius;
    for _ in collectibles..target_collectibles {
        spawn_catalog_entry(hub, catalog, COLLECTIBLE_TYPES, world_radius);
    }
    for _ in obstacles..target_obstacles {
        spawn_catalog_entry(hub, catalog, OBSTACLE_TYPES, world_radius);
    }
}

fn spawn_catalog_entry(hub: &mut Hub, catalog: &'static Catalog, names: &[&str], world_radius: f32) {
    let name = names[fastrand::usize(..names.len())];
    let Some(type_id) = catalog.by_name(name) else { return };
    let position = random_point_within(world_radius);
    hub.world.add(Entity::new(type_id, position, None));
}

/// Uniformly samples a point within a disk of the given radius (`sqrt` of a uniform draw, not a
/// bare uniform radius, so points don't cluster toward the center).
#[must_use]
pub fn random_point_within(radius: f32) -> Vec2 {
    let r = radius * fastrand::f32().sqrt();
    let theta = fastrand::f32() * TAU;
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Fraction of the time a spawning player with a living teammate spawns near them instead of at a
/// random point.
const SPAWN_NEAR_TEAMMATE_CHANCE: f32 = 0.5;
const SPAWN_NEAR_TEAMMATE_RADIUS: f32 = 200.0;
const SPAWN_WORLD_FRACTION: f32 = 0.75;

/// Picks a spawn point: near a living teammate's boat half the time when one exists, otherwise a
/// random point within 75% of the world radius.
#[must_use]
pub fn spawn_point(hub: &mut Hub, team: Option<TeamId>) -> Vec2 {
    if let Some(team_id) = team {
        if fastrand::f32() < SPAWN_NEAR_TEAMMATE_CHANCE {
            if let Some(anchor) = nearest_living_teammate(hub, team_id) {
                let offset = random_point_within(SPAWN_NEAR_TEAMMATE_RADIUS);
                return anchor + offset;
            }
        }
    }
    random_point_within(hub.world_radius * SPAWN_WORLD_FRACTION)
}

fn nearest_living_teammate(hub: &mut Hub, team_id: TeamId) -> Option<Vec2> {
    let Some(team) = hub.roster.team(team_id) else { return None };
    let candidates: Vec<_> = team.members().to_vec();
    for player_id in candidates {
        let Some(entity_id) = hub.roster.player(player_id).and_then(|p| p.entity) else { continue };
        let mut found = None;
        hub.world.get(entity_id, |entity| {
            found = Some(entity.position);
            false
        });
        if let Some(position) = found {
            return Some(position);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_grows_with_population() {
        assert!(radius_for_population(100) > radius_for_population(0));
    }

    #[test]
    fn rejects_short_and_long_names() {
        let hub = Hub::new(2000.0, 1, 2, None);
        assert_eq!(sanitize_name("ab", &hub, false), Err(NameError::BadLength));
        assert_eq!(sanitize_name("waytoolongname", &hub, false), Err(NameError::BadLength));
    }

    #[test]
    fn rejects_bracket_characters() {
        let hub = Hub::new(2000.0, 1, 2, None);
        assert_eq!(sanitize_name("[cap]tain", &hub, false), Err(NameError::DisallowedCharacters));
    }

    #[test]
    fn trims_invisible_padding_characters() {
        let hub = Hub::new(2000.0, 1, 2, None);
        assert_eq!(sanitize_name("\u{200b}skipper\u{200b}", &hub, false).unwrap(), "skipper");
    }

    #[test]
    fn reserved_names_rejected_unless_authed() {
        let hub = Hub::new(2000.0, 1, 2, None);
        assert_eq!(sanitize_name("admin", &hub, false), Err(NameError::Reserved));
        assert!(sanitize_name("admin", &hub, true).is_ok());
    }
}
