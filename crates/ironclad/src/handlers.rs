//! Inbound message dispatch. Every handler takes the acting player's id rather
//! than trusting anything in the message itself for identity, and every entity lookup re-verifies
//! ownership and liveness instead of assuming the player's recorded `entity` handle still matches
//! what's in the world.

use std::time::Instant;

use glam::Vec2;
use ironclad_catalog::{EntityTypeId, Kind, SubKind};
use ironclad_entity::Entity;
use ironclad_numerics::{Angle, Ticks, Velocity};
use ironclad_player::{ChatVerdict, PlayerId, TeamId};
use ironclad_proto::{Guidance, Inbound};
use ironclad_spatial::EntityId;

use crate::Hub;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Authority(String),
    #[error("temporarily unavailable: {0}")]
    Transient(String),
}

fn angle_to(from: Vec2, to: Vec2) -> Angle {
    let delta = to - from;
    Angle::to_angle(delta.y.atan2(delta.x))
}

/// One manual-rudder tick's worth of seconds: `angVelTarget` is a single-tick nudge, not a
/// continuous rate, so it is scaled by the fixed tick period rather than wall-clock elapsed time.
const MANUAL_ANG_VEL_TICK_SECONDS: f32 = 0.1;
const PAY_REACH_FACTOR: f32 = 2.0;
const DEPOSITOR_RANGE: f32 = 60.0;
const DEPOSITOR_SCULPT_RADIUS: f32 = 60.0;
const DEPOSITOR_SCULPT_AMOUNT: f32 = 40.0;
const ROCKET_SCATTER_RADIANS: f32 = 0.05;

impl Hub {
    pub fn handle_inbound(&mut self, player: PlayerId, msg: Inbound, now: Instant) -> Result<(), HandlerError> {
        match msg {
            Inbound::Spawn { name, entity_type, auth, invite } => self.handle_spawn(player, name, entity_type, auth, invite, now),
            Inbound::Upgrade { entity_type } => self.handle_upgrade(player, entity_type),
            Inbound::Fire { index, position_target, guidance } => self.handle_fire(player, index, position_target, guidance),
            Inbound::Manual { guidance, ang_vel_target, altitude_target, turret_target, entity_id } => {
                self.handle_manual(player, entity_id, guidance, ang_vel_target, altitude_target, turret_target)
            }
            Inbound::AimTurrets { target } => self.handle_aim_turrets(player, target),
            Inbound::CreateTeam { name } => self.handle_create_team(player, name),
            Inbound::AddToTeam { team_id, player_id } => self.handle_add_to_team(player, team_id, player_id),
            Inbound::RemoveFromTeam { player_id } => self.handle_remove_from_team(player, player_id),
            Inbound::SendChat { message, team } => self.handle_send_chat(player, message, team, now),
            Inbound::Pay { position } => self.handle_pay(player, position),
            Inbound::Trace { fps } => {
                self.record_fps(player, fps);
                Ok(())
            }
        }
    }

    fn handle_spawn(
        &mut self,
        player: PlayerId,
        name: String,
        entity_type: String,
        auth: Option<String>,
        invite: Option<ironclad_proto::WireTeamId>,
        now: Instant,
    ) -> Result<(), HandlerError> {
        if self.roster.player(player).is_some_and(|p| p.entity.is_some()) {
            return Err(HandlerError::Validation("already has a live entity".into()));
        }

        let authed = auth.is_some() && auth == self.auth;
        let sanitized = crate::spawn::sanitize_name(&name, self, authed).map_err(|e| HandlerError::Validation(e.to_string()))?;

        let type_id = self.catalog.by_name(&entity_type).ok_or_else(|| HandlerError::Validation(format!("unknown entity type {entity_type:?}")))?;
        let data = type_id.data();
        if data.kind != Kind::Boat {
            return Err(HandlerError::Validation("spawn type must be a boat".into()));
        }
        if data.level != 1 {
            let is_bot = self.roster.player(player).is_some_and(|p| p.is_bot);
            let allowed = authed || (is_bot && data.level <= self.bot_max_spawn_level);
            if !allowed {
                return Err(HandlerError::Authority("insufficient privilege to spawn above level 1".into()));
            }
        }

        if let Some(player_mut) = self.roster.player_mut(player) {
            player_mut.display_name = sanitized;
        }

        if let Some(wire_team) = invite {
            let name = wire_team.name();
            if let Some((team_id, owner, full)) = self.roster.teams().find(|(_, t)| t.name == name).map(|(id, t)| (id, t.owner(), t.is_full())) {
                if !full && self.roster.request_join(team_id, player) {
                    self.roster.accept_join(team_id, player, owner);
                }
            }
        }

        let team = self.roster.player(player).and_then(|p| p.team);
        let position = crate::spawn::spawn_point(self, team);
        let entity_id = self.world.add(Entity::new(type_id, position, Some(player)));

        if let Some(player_mut) = self.roster.player_mut(player) {
            player_mut.respawn(entity_id);
        }
        let _ = now;
        Ok(())
    }

    fn handle_upgrade(&mut self, player: PlayerId, entity_type: String) -> Result<(), HandlerError> {
        let entity_id = self.roster.player(player).and_then(|p| p.entity).ok_or_else(|| HandlerError::Authority("no live entity".into()))?;
        let new_type = self.catalog.by_name(&entity_type).ok_or_else(|| HandlerError::Validation(format!("unknown entity type {entity_type:?}")))?;
        let new_data = new_type.data();
        let score = self.roster.player(player).map(|p| p.score).unwrap_or(0);

        let mut error: Option<HandlerError> = None;
        let mut found = false;
        self.world.get(entity_id, |entity| {
            found = true;
            let current = entity.entity_type.data();
            if current.kind != new_data.kind {
                error = Some(HandlerError::Validation("upgrade must stay within the same kind".into()));
                return false;
            }
            if new_data.level <= current.level {
                error = Some(HandlerError::Validation("upgrade must move to a higher level".into()));
                return false;
            }
            let threshold = ironclad_player::Player::upgrade_threshold(new_data.level);
            if score < threshold {
                error = Some(HandlerError::Validation("insufficient score for this upgrade".into()));
                return false;
            }
            entity.initialize(new_type);
            false
        });

        if !found {
            return Err(HandlerError::Transient("entity no longer exists".into()));
        }
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn handle_fire(&mut self, player: PlayerId, index: u8, position_target: Vec2, guidance: Option<Guidance>) -> Result<(), HandlerError> {
        let entity_id = self.roster.player(player).and_then(|p| p.entity).ok_or_else(|| HandlerError::Authority("no live entity".into()))?;
        let index = index as usize;

        let mut error: Option<HandlerError> = None;
        let mut spawn_request: Option<(EntityTypeId, Vec2, Angle)> = None;
        let mut sculpt_request: Option<Vec2> = None;

        self.world.get(entity_id, |entity| {
            let data = entity.entity_type.data();
            let Some(mount) = data.armaments.get(index) else {
                error = Some(HandlerError::Validation("armament index out of range".into()));
                return false;
            };
            if entity.extension.armament_consumption[index] > Ticks::ZERO {
                error = Some(HandlerError::Transient("armament still reloading".into()));
                return false;
            }

            let launch_data = mount.launches.map(|id| id.data());
            let submerged = data.sub_kind == SubKind::Submarine && entity.extension.altitude < 0.0;
            if submerged {
                if let Some(launch) = launch_data {
                    if matches!(launch.sub_kind, SubKind::Shell | SubKind::Sam) {
                        error = Some(HandlerError::Validation("cannot fire this armament while submerged".into()));
                        return false;
                    }
                }
            }

            let (mount_pos, mount_dir) = entity.armament_transform(index);

            if let Some(turret_index) = mount.turret {
                let turret = &data.turrets[turret_index];
                let world_angle = angle_to(mount_pos, position_target);
                let relative = world_angle.diff(entity.direction);
                let delta_from_base = relative.diff(turret.base_angle);
                if delta_from_base.abs().float() > turret.azimuth_limit.float() {
                    error = Some(HandlerError::Validation("target is outside this turret's azimuth sweep".into()));
                    return false;
                }
            }

            let Some(launch) = launch_data else {
                error = Some(HandlerError::Validation("armament mount has nothing to launch".into()));
                return false;
            };

            if launch.sub_kind == SubKind::Depositor {
                if mount_pos.distance(position_target) > DEPOSITOR_RANGE {
                    error = Some(HandlerError::Validation("depositor target out of range".into()));
                    return false;
                }
                sculpt_request = Some(position_target);
            } else {
                let mut fire_dir = if mount.vertical { mount_dir } else { angle_to(mount_pos, position_target) };
                if launch.sub_kind == SubKind::Rocket {
                    let scatter = (fastrand::f32() * 2.0 - 1.0) * ROCKET_SCATTER_RADIANS;
                    fire_dir = Angle(fire_dir.0.wrapping_add(Angle::to_angle(scatter).0));
                }
                spawn_request = Some((mount.launches.expect("launch resolved above"), mount_pos, fire_dir));
            }

            entity.consume_armament(index, false);
            let _ = guidance;
            false
        });

        if let Some(e) = error {
            return Err(e);
        }

        if let Some(target) = sculpt_request {
            self.terrain.sculpt(target, DEPOSITOR_SCULPT_RADIUS, DEPOSITOR_SCULPT_AMOUNT);
        }

        if let Some((launch_type, position, direction)) = spawn_request {
            let speed = launch_type.data().speed;
            let mut launched = Entity::new(launch_type, position, Some(player));
            launched.direction = direction;
            launched.direction_target = direction;
            launched.velocity = Velocity::to_velocity(speed);
            launched.velocity_target = launched.velocity;
            self.world.add(launched);
        }

        Ok(())
    }

    fn handle_manual(
        &mut self,
        player: PlayerId,
        entity_id: EntityId,
        guidance: Option<Guidance>,
        ang_vel_target: Option<f32>,
        altitude_target: Option<f32>,
        turret_target: Option<Vec2>,
    ) -> Result<(), HandlerError> {
        if self.roster.player(player).and_then(|p| p.entity) != Some(entity_id) {
            return Err(HandlerError::Authority("not the owner of this entity".into()));
        }

        let mut found = false;
        self.world.get(entity_id, |entity| {
            found = true;
            if let Some(g) = guidance {
                entity.direction_target = g.direction_target;
                entity.velocity_target = g.velocity_target;
            }
            if let Some(ang_vel) = ang_vel_target {
                let delta = Angle::to_angle(ang_vel * MANUAL_ANG_VEL_TICK_SECONDS);
                entity.direction_target = Angle(entity.direction.0.wrapping_add(delta.0));
            }
            if let Some(altitude) = altitude_target {
                if entity.entity_type.data().sub_kind == SubKind::Submarine {
                    entity.extension.altitude_target = altitude.clamp(-1.0, 1.0);
                }
            }
            if let Some(target) = turret_target {
                entity.extension.set_turret_target(target);
            }
            false
        });

        if !found {
            return Err(HandlerError::Transient("entity no longer exists".into()));
        }
        Ok(())
    }

    fn handle_aim_turrets(&mut self, player: PlayerId, target: Vec2) -> Result<(), HandlerError> {
        let entity_id = self.roster.player(player).and_then(|p| p.entity).ok_or_else(|| HandlerError::Authority("no live entity".into()))?;
        let mut found = false;
        self.world.get(entity_id, |entity| {
            found = true;
            entity.extension.set_turret_target(target);
            false
        });
        if !found {
            return Err(HandlerError::Transient("entity no longer exists".into()));
        }
        Ok(())
    }

    fn handle_pay(&mut self, player: PlayerId, position: Vec2) -> Result<(), HandlerError> {
        let entity_id = self.roster.player(player).and_then(|p| p.entity).ok_or_else(|| HandlerError::Authority("no live entity".into()))?;

        let mut snapshot: Option<(Vec2, f32, u8)> = None;
        self.world.get(entity_id, |entity| {
            let data = entity.entity_type.data();
            snapshot = Some((entity.position, data.radius, data.level));
            false
        });
        let Some((entity_position, radius, level)) = snapshot else {
            return Err(HandlerError::Transient("entity no longer exists".into()));
        };
        if entity_position.distance(position) > radius * PAY_REACH_FACTOR {
            return Err(HandlerError::Validation("drop point is too far from the boat".into()));
        }

        let coin_id = self.catalog.by_name("coin").ok_or_else(|| HandlerError::Transient("catalog has no coin entry".into()))?;
        let coin_level = u32::from(coin_id.data().level);
        let cost = 2 * coin_level;
        let required = ironclad_player::Player::upgrade_threshold(level) + cost;

        let score = self.roster.player(player).map(|p| p.score).unwrap_or(0);
        if score < required {
            return Err(HandlerError::Validation("insufficient score to pay".into()));
        }

        if let Some(player_mut) = self.roster.player_mut(player) {
            player_mut.score -= cost;
        }
        self.world.add(Entity::new(coin_id, position, Some(player)));
        Ok(())
    }

    fn handle_create_team(&mut self, player: PlayerId, name: String) -> Result<(), HandlerError> {
        let wire = ironclad_proto::WireTeamId::pack(&name).map_err(|e| HandlerError::Validation(e.to_string()))?;
        if self.roster.teams().any(|(_, t)| t.name == name) {
            return Err(HandlerError::Validation("team name already taken".into()));
        }
        let invite_code = fastrand::u32(..);
        self.roster.create_team(player, name, invite_code).ok_or_else(|| HandlerError::Validation("already on a team".into()))?;
        let _ = wire;
        Ok(())
    }

    fn handle_add_to_team(&mut self, player: PlayerId, team_id: Option<ironclad_proto::WireTeamId>, player_id: Option<String>) -> Result<(), HandlerError> {
        if let Some(wire_team) = team_id {
            let name = wire_team.name();
            let Some((target, full)) = self.roster.teams().find(|(_, t)| t.name == name).map(|(id, t)| (id, t.is_full())) else {
                return Err(HandlerError::Validation("no such team".into()));
            };
            if full {
                return Err(HandlerError::Validation("team is full".into()));
            }
            if !self.roster.request_join(target, player) {
                return Err(HandlerError::Validation("unable to request to join this team".into()));
            }
            return Ok(());
        }

        if let Some(hex) = player_id {
            let requester = ironclad_player::player_id_from_hex(&hex).ok_or_else(|| HandlerError::Validation("malformed player id".into()))?;
            let team_id = self.roster.player(player).and_then(|p| p.team).ok_or_else(|| HandlerError::Authority("not on a team".into()))?;
            if !self.roster.accept_join(team_id, requester, player) {
                return Err(HandlerError::Authority("only the team owner may accept join requests".into()));
            }
            return Ok(());
        }

        Err(HandlerError::Validation("addToTeam requires either teamId or playerId".into()))
    }

    fn handle_remove_from_team(&mut self, player: PlayerId, player_id: String) -> Result<(), HandlerError> {
        let target = ironclad_player::player_id_from_hex(&player_id).ok_or_else(|| HandlerError::Validation("malformed player id".into()))?;
        let acting_team = self.roster.player(player).and_then(|p| p.team);
        let target_team = self.roster.player(target).and_then(|p| p.team);
        let Some(team_id) = acting_team else {
            return Err(HandlerError::Authority("not on a team".into()));
        };
        if target_team != Some(team_id) {
            return Err(HandlerError::Validation("that player is not on your team".into()));
        }
        if target != player {
            let is_owner = self.roster.team(team_id).is_some_and(|t| t.owner() == player);
            if !is_owner {
                return Err(HandlerError::Authority("only the team owner may remove other members".into()));
            }
        }
        self.roster.leave_team(target);
        Ok(())
    }

    fn handle_send_chat(&mut self, player: PlayerId, message: String, team_only: bool, now: Instant) -> Result<(), HandlerError> {
        let sanitized: String = message.chars().filter(|c| !c.is_control()).collect();
        let trimmed = sanitized.trim();
        let len = trimmed.chars().count();
        if !(1..=128).contains(&len) {
            return Err(HandlerError::Validation("message must be 1-128 characters".into()));
        }

        let moderation = self.moderator.classify(trimmed);
        let team = self.roster.player(player).and_then(|p| p.team);
        let verdict = {
            let Some(player_mut) = self.roster.player_mut(player) else {
                return Err(HandlerError::Transient("player no longer registered".into()));
            };
            player_mut.chat.record(len, moderation, now)
        };
        if verdict == ChatVerdict::Block {
            return Err(HandlerError::Transient("chat message throttled".into()));
        }

        tracing::info!(player = %ironclad_player::player_id_to_hex(player), team_only, "{trimmed}");
        self.record_chat(player, team, trimmed.to_string(), team_only);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn hub_with_player() -> (Hub, PlayerId) {
        let mut hub = Hub::new(2000.0, 1, 2, None);
        let now = Instant::now();
        let client = hub.connect("tester", false, now);
        let player = hub.player_of(client).unwrap();
        (hub, player)
    }

    #[test]
    fn spawn_rejects_above_level_one_without_auth() {
        let (mut hub, player) = hub_with_player();
        let now = Instant::now();
        let result = hub.handle_inbound(player, Inbound::Spawn { name: "skip".into(), entity_type: "destroyerMk2".into(), auth: None, invite: None }, now);
        assert!(matches!(result, Err(HandlerError::Authority(_))));
    }

    #[test]
    fn spawn_then_fire_without_ammo_fails_cleanly() {
        let (mut hub, player) = hub_with_player();
        let now = Instant::now();
        hub.handle_inbound(player, Inbound::Spawn { name: "skip".into(), entity_type: "fairmileD".into(), auth: None, invite: None }, now).unwrap();
        let position = hub.roster.player(player).unwrap().entity.unwrap();
        let mut target = Vec2::ZERO;
        hub.world.get(position, |e| {
            target = e.position + Vec2::new(100.0, 0.0);
            false
        });
        let result = hub.handle_inbound(player, Inbound::Fire { index: 0, position_target: target, guidance: None }, now);
        assert!(result.is_ok());
        let result_again = hub.handle_inbound(player, Inbound::Fire { index: 0, position_target: target, guidance: None }, now);
        assert!(matches!(result_again, Err(HandlerError::Transient(_))));
    }

    #[test]
    fn chat_spam_is_eventually_throttled() {
        let (mut hub, player) = hub_with_player();
        let now = Instant::now();
        let mut last = Ok(());
        for _ in 0..12 {
            last = hub.handle_inbound(player, Inbound::SendChat { message: "hello there".into(), team: false }, now);
        }
        assert!(matches!(last, Err(HandlerError::Transient(_))));
    }

    #[test]
    fn create_and_join_team_round_trip() {
        let (mut hub, owner) = hub_with_player();
        let now = Instant::now();
        hub.handle_inbound(owner, Inbound::CreateTeam { name: "RED".into() }, now).unwrap();

        let joiner_client = hub.connect("joiner", false, now);
        let joiner = hub.player_of(joiner_client).unwrap();
        let wire = ironclad_proto::WireTeamId::pack("RED").unwrap();
        hub.handle_inbound(joiner, Inbound::AddToTeam { team_id: Some(wire), player_id: None }, now).unwrap();
        assert!(hub.roster.team(hub.roster.player(owner).unwrap().team.unwrap()).unwrap().join_requests().contains(&joiner));

        let joiner_hex = ironclad_player::player_id_to_hex(joiner);
        hub.handle_inbound(owner, Inbound::AddToTeam { team_id: None, player_id: Some(joiner_hex) }, now).unwrap();
        assert_eq!(hub.roster.player(joiner).unwrap().team, hub.roster.player(owner).unwrap().team);
    }
}
