//! Bot AI policy: turns each [`UpdatePayload`] a bot client receives into zero or
//! more outbound intents, using exactly the same filtered, uncertain view a human client gets —
//! no privileged access to `ironclad-spatial`/`ironclad-entity` internals. A bot is just a client
//! whose human is a policy function; submitting through `ironclad-proto::Inbound` keeps it
//! indistinguishable from a real player at every layer below this crate.

mod terrain_view;

use fastrand::Rng;
use glam::Vec2;
use ironclad_catalog::{Catalog, EntityTypeId, Kind, SubKind};
use ironclad_numerics::Angle;
use ironclad_proto::{Contact, Guidance, Inbound, UpdatePayload};

pub use terrain_view::TerrainView;

/// Tunables the hub threads through from its own environment/flags.
#[derive(Copy, Clone, Debug)]
pub struct BotConfig {
    /// Highest boat level a freshly-spawned bot may pick (`botMaxSpawnLevel`).
    pub max_spawn_level: u8,
    /// Highest boat level a bot will proactively `upgrade` into.
    pub level_ambition: u8,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self { max_spawn_level: 2, level_ambition: 3 }
    }
}

/// Everything this bot remembers between updates. Destinations persist so "wander toward a
/// random point" doesn't jitter to a new heading every 100ms.
#[derive(Default, Debug)]
pub struct BotState {
    wander_destination: Option<Vec2>,
}

/// What the hub does with one decision: either forward an [`Inbound`] through the same channel a
/// real client's messages arrive on, or disconnect the bot entirely (the "quit" branch of dying).
pub enum BotAction {
    Send(Inbound),
    Disconnect,
}

const COLLISION_LOOKAHEAD_SECONDS: f32 = 2.0;
const COLLISION_REACT_DISTANCE: f32 = 120.0;
const LAND_PROBE_DISTANCE: f32 = 150.0;
const LAND_PROBE_SPREAD: f32 = 0.5;
const LAND_PROBE_ANGLES: usize = 5;
const FIRE_CONE: f32 = std::f32::consts::FRAC_PI_3;
const FIRE_RANGE_LENGTH_FACTOR: f32 = 4.0;
const WANDER_RADIUS: f32 = 4000.0;
const DEAD_QUIT_PROBABILITY: f32 = 0.25;
const LEAVE_TEAM_PROBABILITY: f32 = 0.01;
const CREATE_TEAM_PROBABILITY: f32 = 0.01;
const JOIN_HIGHER_TEAM_PROBABILITY: f32 = 0.02;
const TEAM_SCORE_ACCEPT_TOLERANCE: f32 = 0.5;
const TEAM_SCORE_JOIN_MARGIN: f32 = 1.25;

fn self_contact<'a>(update: &'a UpdatePayload) -> Option<(&'a str, &'a Contact)> {
    let entity_id = update.entity_id.as_deref()?;
    update.contacts.get(entity_id).map(|c| (entity_id, c))
}

fn self_entity_type(contact: &Contact) -> Option<EntityTypeId> {
    contact.entity_type
}

fn distance_to(observer: Vec2, contact: &Contact) -> f32 {
    observer.distance(contact.position)
}

/// Picks the nearest contact matching `predicate`, other than the observer's own entity.
fn nearest<'a>(
    update: &'a UpdatePayload,
    self_id: &str,
    observer_position: Vec2,
    mut predicate: impl FnMut(&Contact) -> bool,
) -> Option<(&'a str, &'a Contact, f32)> {
    update
        .contacts
        .iter()
        .filter(|(id, _)| id.as_str() != self_id)
        .filter(|(_, contact)| predicate(contact))
        .map(|(id, contact)| (id.as_str(), contact, distance_to(observer_position, contact)))
        .min_by(|(_, _, a), (_, _, b)| a.total_cmp(b))
}

fn is_friendly(contact: &Contact) -> bool {
    contact.friendly.unwrap_or(false)
}

fn kind_of(contact: &Contact) -> Option<Kind> {
    contact.entity_type.map(|t| t.data().kind)
}

/// §4.9 pathfinding precedence, cheapest-first: land in the way, then an imminent collision, then
/// social/economic motion, finally idle wander. Returns a direction target, never a velocity —
/// speed is always "as fast as the hull allows", matching a bot's lack of fine throttle control.
fn choose_heading(
    state: &mut BotState,
    update: &UpdatePayload,
    self_id: &str,
    self_contact: &Contact,
    terrain: Option<&TerrainView>,
    rng: &mut Rng,
) -> Angle {
    let position = self_contact.position;
    let heading = self_contact.direction;

    if let Some(terrain) = terrain {
        if let Some(clear) = avoid_land(position, heading, terrain) {
            return clear;
        }
    }

    if let Some(away) = avoid_imminent_collision(update, self_id, self_contact) {
        return away;
    }

    if let Some((_, friendly, _)) = nearest(update, self_id, position, |c| is_friendly(c) && kind_of(c) == Some(Kind::Boat)) {
        state.wander_destination = None;
        return angle_to(position, friendly.position);
    }

    if let Some((_, enemy, _)) =
        nearest(update, self_id, position, |c| !is_friendly(c) && kind_of(c) == Some(Kind::Boat))
    {
        state.wander_destination = None;
        return angle_to(position, enemy.position);
    }

    if let Some((_, crate_, _)) = nearest(update, self_id, position, |c| kind_of(c) == Some(Kind::Collectible)) {
        state.wander_destination = None;
        return angle_to(position, crate_.position);
    }

    let destination = *state.wander_destination.get_or_insert_with(|| {
        let radius = update.world_radius.min(WANDER_RADIUS).max(500.0);
        Vec2::new(rng.f32() * 2.0 - 1.0, rng.f32() * 2.0 - 1.0).normalize_or_zero() * (radius * rng.f32())
    });
    if position.distance(destination) < 200.0 {
        state.wander_destination = None;
    }
    angle_to(position, destination)
}

fn angle_to(from: Vec2, to: Vec2) -> Angle {
    let delta = to - from;
    Angle::to_angle(delta.y.atan2(delta.x))
}

/// Samples `LAND_PROBE_ANGLES` directions around the current heading and steers toward whichever
/// sampled angle closest to straight ahead is actually clear, or `None` if the lane dead ahead
/// has no land in it to begin with.
fn avoid_land(position: Vec2, heading: Angle, terrain: &TerrainView) -> Option<Angle> {
    let ahead = position + heading.vec2() * LAND_PROBE_DISTANCE;
    if !terrain.is_land(ahead) {
        return None;
    }
    for i in 0..LAND_PROBE_ANGLES {
        let spread = LAND_PROBE_SPREAD * (i as f32 / (LAND_PROBE_ANGLES - 1) as f32 * 2.0 - 1.0);
        let probe_heading = Angle(heading.0.wrapping_add(Angle::to_angle(spread).0));
        let probe_point = position + probe_heading.vec2() * LAND_PROBE_DISTANCE;
        if !terrain.is_land(probe_point) {
            return Some(probe_heading);
        }
    }
    // every sampled lane is blocked: turn hard away from the nearest land sample as a last resort.
    Some(Angle(heading.0.wrapping_add(Angle::to_angle(LAND_PROBE_SPREAD * 3.0).0)))
}

/// Turns away from the nearest contact on a closing course within reaction distance. Friendly
/// boats get a gentler (slower) evasive turn than anything else, favoring cooperative rather than
/// adversarial default behavior among allies.
fn avoid_imminent_collision(update: &UpdatePayload, self_id: &str, self_contact: &Contact) -> Option<Angle> {
    let position = self_contact.position;
    let heading = self_contact.direction;
    let self_speed = self_contact.velocity.float().abs().max(1.0);

    let (_, contact, distance) = nearest(update, self_id, position, |c| {
        matches!(kind_of(c), Some(Kind::Boat) | Some(Kind::Obstacle))
    })?;
    if distance > COLLISION_REACT_DISTANCE {
        return None;
    }
    let future_self = position + heading.vec2() * (self_speed * COLLISION_LOOKAHEAD_SECONDS);
    let future_other = contact.position + contact.direction.vec2() * (contact.velocity.float() * COLLISION_LOOKAHEAD_SECONDS);
    if future_self.distance(future_other) > distance {
        return None; // paths are diverging already.
    }
    let away_angle = angle_to(contact.position, position);
    let turn_sharpness = if is_friendly(contact) { 0.5 } else { 1.0 };
    Some(Angle(heading.0.wrapping_add(Angle::to_angle(away_angle.diff(heading).float() * turn_sharpness).0)))
}

/// World-space `(position, direction)` for armament `index` on `self_contact`, recomputed from
/// the catalog and the contact's own disclosed turret angles — a contact-only echo of
/// `ironclad_entity::Entity::armament_transform` that never touches the real `Entity`.
fn contact_armament_transform(contact: &Contact, data: &ironclad_catalog::EntityTypeData, index: usize) -> (Vec2, Angle) {
    let mount = &data.armaments[index];
    let (base_pos, base_dir) = match mount.turret {
        Some(turret_index) => {
            let turret = &data.turrets[turret_index];
            let turret_angle = contact
                .turret_angles
                .as_ref()
                .and_then(|angles| angles.get(turret_index))
                .copied()
                .unwrap_or(turret.base_angle);
            let offset = rotate(turret.offset, contact.direction);
            (contact.position + offset, Angle(contact.direction.0.wrapping_add(turret_angle.0)))
        }
        None => (contact.position, contact.direction),
    };
    let world_pos = base_pos + rotate(mount.offset, base_dir);
    let world_dir = Angle(base_dir.0.wrapping_add(mount.angle.0));
    (world_pos, world_dir)
}

fn rotate(v: Vec2, angle: Angle) -> Vec2 {
    let dir = angle.vec2();
    Vec2::new(v.x * dir.x - v.y * dir.y, v.x * dir.y + v.y * dir.x)
}

/// Picks the armament mount whose current aim is closest to the target enemy, skipping SAMs
/// (anti-aircraft, not useful against a surface target) and anything reloading.
fn choose_fire_index(
    contact: &Contact,
    data: &ironclad_catalog::EntityTypeData,
    target: Vec2,
) -> Option<(usize, Vec2)> {
    let consumption = contact.armament_consumption.as_ref()?;
    let mut best: Option<(usize, f32)> = None;
    for (index, mount) in data.armaments.iter().enumerate() {
        let Some(launch_type) = mount.launches else { continue };
        if launch_type.data().sub_kind == SubKind::Sam {
            continue;
        }
        if consumption.get(index).copied().unwrap_or_default() != ironclad_numerics::Ticks::ZERO {
            continue;
        }
        let (pos, dir) = contact_armament_transform(contact, data, index);
        let desired = angle_to(pos, target);
        let diff = desired.diff(dir).float().abs();
        if diff > FIRE_CONE {
            continue;
        }
        let reach = data.length * FIRE_RANGE_LENGTH_FACTOR;
        if pos.distance(target) > reach {
            continue;
        }
        if best.is_none_or(|(_, best_diff)| diff < best_diff) {
            best = Some((index, diff));
        }
    }
    best.map(|(index, _)| (index, target))
}

/// Runs the full per-update policy for one bot and returns the intents it wants to submit this
/// tick (typically zero or one; `manual` and `fire` may both fire the same update).
#[must_use]
pub fn decide(
    state: &mut BotState,
    config: &BotConfig,
    update: &UpdatePayload,
    terrain: Option<&TerrainView>,
    rng: &mut Rng,
) -> Vec<BotAction> {
    let Some((self_id, contact)) = self_contact(update) else {
        return decide_dead(update, config, rng);
    };

    let mut actions = Vec::new();
    let Some(entity_type) = self_entity_type(contact) else {
        return actions;
    };
    let data = entity_type.data();

    if rng.f32() < LEAVE_TEAM_PROBABILITY && !update.team_members.is_empty() {
        if let Some(player_id) = update.player_id.clone() {
            actions.push(BotAction::Send(Inbound::RemoveFromTeam { player_id }));
        }
    } else if rng.f32() < CREATE_TEAM_PROBABILITY && update.team_members.is_empty() {
        actions.push(BotAction::Send(Inbound::CreateTeam { name: random_team_name(rng) }));
    }

    for requester in &update.team_join_requests {
        if let Some(self_score) = update.team_members.first().map(|m| m.score) {
            let close_enough = (requester.score as f32 - self_score as f32).abs() <= self_score as f32 * TEAM_SCORE_ACCEPT_TOLERANCE + 10.0;
            if close_enough {
                actions.push(BotAction::Send(Inbound::AddToTeam { team_id: None, player_id: Some(requester.id.clone()) }));
            }
        }
    }

    if rng.f32() < JOIN_HIGHER_TEAM_PROBABILITY && update.team_members.is_empty() {
        let own_score = contact.owner.as_ref().map_or(0, |o| o.score);
        let richer_team = nearest(update, self_id, contact.position, |c| {
            c.owner.as_ref().is_some_and(|o| o.team.is_some() && o.score as f32 > own_score as f32 * TEAM_SCORE_JOIN_MARGIN)
        })
        .and_then(|(_, richer, _)| richer.owner.as_ref().and_then(|o| o.team));
        if let Some(team) = richer_team {
            actions.push(BotAction::Send(Inbound::AddToTeam { team_id: Some(team), player_id: None }));
        }
    }

    let heading = choose_heading(state, update, self_id, contact, terrain, rng);
    actions.push(BotAction::Send(Inbound::Manual {
        guidance: Some(Guidance { direction_target: heading, velocity_target: ironclad_numerics::Velocity::to_velocity(data.speed) }),
        ang_vel_target: None,
        altitude_target: None,
        turret_target: None,
        entity_id: parse_entity_id(self_id),
    }));

    if let Some((_, enemy, _)) = nearest(update, self_id, contact.position, |c| !is_friendly(c) && kind_of(c) == Some(Kind::Boat)) {
        if let Some((index, target)) = choose_fire_index(contact, data, enemy.position) {
            actions.push(BotAction::Send(Inbound::Fire {
                index: index as u8,
                position_target: target,
                guidance: None,
            }));
        }
    }

    if data.kind == Kind::Boat && data.level < config.level_ambition {
        if let Some(next) = next_upgrade(data) {
            actions.push(BotAction::Send(Inbound::Upgrade { entity_type: next.data().name.clone() }));
        }
    }

    actions
}

fn decide_dead(update: &UpdatePayload, config: &BotConfig, rng: &mut Rng) -> Vec<BotAction> {
    if rng.f32() < DEAD_QUIT_PROBABILITY {
        return vec![BotAction::Disconnect];
    }

    let mut actions = Vec::new();
    if !update.team_members.is_empty() && rng.f32() < 0.1 {
        if let Some(player_id) = update.player_id.clone() {
            actions.push(BotAction::Send(Inbound::RemoveFromTeam { player_id }));
        }
    }

    let level = 1 + rng.u8(0..config.max_spawn_level.max(1));
    let boats = Catalog::global().boats_at_level(level);
    let chosen = boats.first().copied().unwrap_or_else(|| {
        Catalog::global().boats_at_level(1).first().copied().expect("catalog defines at least one level-1 boat")
    });
    actions.push(BotAction::Send(Inbound::Spawn {
        name: random_bot_name(rng),
        entity_type: chosen.data().name.clone(),
        auth: None,
        invite: None,
    }));
    actions
}

fn next_upgrade(current: &ironclad_catalog::EntityTypeData) -> Option<EntityTypeId> {
    let next_level = current.level.checked_add(1)?;
    Catalog::global().boats_at_level(next_level).first().copied()
}

fn parse_entity_id(hex: &str) -> ironclad_spatial::EntityId {
    // bots only ever reference their own, currently-live entity, so this always parses.
    ironclad_spatial::EntityId::from_hex(hex).expect("bot's own entity id is well-formed hex")
}

fn random_bot_name(rng: &mut Rng) -> String {
    const SYLLABLES: &[&str] = &["Mor", "Tide", "Grim", "Blue", "Iron", "Salt", "Drift", "Storm", "Ash", "Reef"];
    let mut name = String::new();
    for _ in 0..2 {
        name.push_str(SYLLABLES[rng.usize(0..SYLLABLES.len())]);
    }
    name
}

fn random_team_name(rng: &mut Rng) -> String {
    const NAMES: &[&str] = &["Fleet", "Armada", "Wolves", "Reef", "Tide", "Squad"];
    NAMES[rng.usize(0..NAMES.len())].to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ironclad_numerics::{Ticks, Velocity};

    use super::*;

    fn contact_at(position: Vec2, entity_type: EntityTypeId, friendly: Option<bool>) -> Contact {
        Contact {
            position,
            velocity: Velocity::ZERO,
            direction: Angle::ZERO,
            altitude: 0.0,
            uncertainty: 0.0,
            entity_type: Some(entity_type),
            armament_consumption: Some(vec![Ticks::ZERO; entity_type.data().armaments.len()]),
            turret_angles: Some(vec![Angle::ZERO; entity_type.data().turrets.len()]),
            damage_percent: Some(0.0),
            guidance: None,
            friendly,
            owner: None,
        }
    }

    #[test]
    fn dead_bot_either_quits_or_respawns() {
        let mut rng = Rng::with_seed(7);
        let update = UpdatePayload { world_radius: 5000.0, entity_id: None, ..Default::default() };
        let config = BotConfig::default();
        let actions = decide_dead(&update, &config, &mut rng);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            BotAction::Disconnect => {}
            BotAction::Send(Inbound::Spawn { .. }) => {}
            _ => panic!("unexpected action"),
        }
    }

    #[test]
    fn alive_bot_steers_toward_nearest_collectible_when_nothing_else_is_around() {
        let boat_type = Catalog::global().by_name("fairmileD").unwrap();
        let scrap_type = Catalog::global().iter().find(|id| id.data().sub_kind == SubKind::Scrap).unwrap();

        let mut contacts = BTreeMap::new();
        let self_contact = contact_at(Vec2::ZERO, boat_type, None);
        contacts.insert("1".to_owned(), self_contact.clone());
        contacts.insert("2".to_owned(), contact_at(Vec2::new(300.0, 0.0), scrap_type, None));

        let update = UpdatePayload {
            world_radius: 5000.0,
            entity_id: Some("1".to_owned()),
            contacts,
            ..Default::default()
        };

        let mut state = BotState::default();
        let mut rng = Rng::with_seed(1);
        let heading = choose_heading(&mut state, &update, "1", &self_contact, None, &mut rng);
        // the collectible sits due +x from the origin; the chosen heading should point roughly
        // that way rather than off at a random wander angle.
        assert!(heading.float().abs() < 0.2);
    }

    #[test]
    fn fire_selection_picks_the_turreted_shell_aimed_down_the_bow() {
        let boat_type = Catalog::global().by_name("fairmileD").unwrap();
        let contact = contact_at(Vec2::ZERO, boat_type, None);
        let data = boat_type.data();
        let target = Vec2::new(50.0, 0.0);

        let (index, _) = choose_fire_index(&contact, data, target).expect("a mount lines up with a dead-ahead target");
        let launches = data.armaments[index].launches.expect("chosen mount launches something");
        assert_eq!(launches.data().sub_kind, SubKind::Shell);
    }

    #[test]
    fn fire_selection_never_picks_a_sam_mount() {
        let carrier = Catalog::global().by_name("escortCarrier").unwrap();
        let contact = contact_at(Vec2::ZERO, carrier, None);
        let data = carrier.data();
        if let Some((index, _)) = choose_fire_index(&contact, data, Vec2::new(50.0, 0.0)) {
            let launches = data.armaments[index].launches.expect("chosen mount launches something");
            assert_ne!(launches.data().sub_kind, SubKind::Sam);
        }
    }
}
