//! The hub: the single piece of mutable state every other `ironclad-*` crate is blind to the
//! existence of. Owns the world, the terrain, the player/team roster, and everything a running
//! server needs to turn "a tick happened" and "a message arrived" into a consistent next state.
//!
//! Nothing below the hub knows about clients, sockets, or the driver loop — they operate on
//! `World<Entity>`, `Roster`, `Terrain` directly. The hub is where those pieces meet the outside
//! world: client registration, inbound message handling, per-client update construction, and the
//! bookkeeping (despawn queue, chat buffers, score deltas) that only makes sense once you have
//! `&mut Roster` and `&mut World` in the same hand.

pub mod driver;
pub mod handlers;
pub mod http;
pub mod leaderboard;
pub mod moderation;
pub mod spawn;
pub mod transport;

use std::collections::HashMap;
use std::time::Instant;

use glam::Vec2;
use ironclad_bot::BotState;
use ironclad_catalog::Catalog;
use ironclad_entity::Entity;
use ironclad_geometry::Aabb;
use ironclad_numerics::Ticks;
use ironclad_physics::PhysicsOutcome;
use ironclad_player::{DeathReason, PlayerId, Roster, TeamId};
use ironclad_proto::{ChatMessage, Contact, UpdatePayload};
use ironclad_sensor::{classify_contact, ObserverContext};
use ironclad_sinks::{CloudSink, NullSink};
use ironclad_spatial::World;
use ironclad_terrain::Terrain;

pub use handlers::HandlerError;
pub use moderation::Moderator;

/// Radius beyond which score is lost no faster: the maximum amount of score a death can cost.
const DEATH_SCORE_LOSS_CAP: u32 = 80;

/// A live boat's camera extends the visual/radar AABB force-send cadence this many ticks for a
/// connected player; a player who has been dead longer falls back to `DEAD_TERRAIN_CADENCE_TICKS`.
/// An adaptive cadence: a live connection gets frequent terrain pushes, a dead one falls back to
/// an infrequent one.
const LIVE_TERRAIN_CADENCE_TICKS: u32 = 10;
const DEAD_TERRAIN_CADENCE_TICKS: u32 = 500;

/// Handle for one connected transport session. Stable for the lifetime of the connection,
/// independent of the [`PlayerId`] the hub assigns on [`Hub::connect`] — a transport only ever
/// needs to route outbound frames back to the right socket, never touch the roster directly.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ClientId(u64);

/// Per-player state the hub needs that doesn't belong on [`ironclad_player::Player`] itself: the
/// terrain force-send cadence counter, and (for bots) the AI's persistent wander state.
#[derive(Default)]
struct ClientView {
    last_terrain_aabb: Option<Aabb>,
    ticks_since_terrain: u32,
    is_bot: bool,
    bot_state: BotState,
    fps: f32,
}

struct PendingChat {
    sender: PlayerId,
    team: Option<TeamId>,
    message: String,
    team_only: bool,
}

pub struct Hub {
    pub world: World<Entity>,
    pub terrain: Terrain,
    pub roster: Roster,
    pub catalog: &'static Catalog,
    pub world_radius: f32,
    pub bot_max_spawn_level: u8,
    pub auth: Option<String>,
    pub moderator: Box<dyn Moderator>,
    pub sink: Box<dyn CloudSink>,
    clients: HashMap<ClientId, PlayerId>,
    players: HashMap<PlayerId, ClientId>,
    views: HashMap<PlayerId, ClientView>,
    despawn_queue: Vec<PlayerId>,
    pending_chats: Vec<PendingChat>,
    next_client: u64,
}

impl Hub {
    #[must_use]
    pub fn new(world_radius: f32, terrain_seed: u64, bot_max_spawn_level: u8, auth: Option<String>) -> Self {
        Self {
            world: World::new(world_radius),
            terrain: Terrain::new(terrain_seed),
            roster: Roster::new(),
            catalog: Catalog::global(),
            world_radius,
            bot_max_spawn_level,
            auth,
            moderator: Box::new(moderation::DefaultModerator::default()),
            sink: Box::new(NullSink),
            clients: HashMap::new(),
            players: HashMap::new(),
            views: HashMap::new(),
            despawn_queue: Vec::new(),
            pending_chats: Vec::new(),
            next_client: 1,
        }
    }

    /// Registers a new player and hands back the [`ClientId`] the caller (transport or the bot
    /// population maintainer) should use to refer to them from now on. Non-bot registrations are
    /// reported to the cloud sink.
    pub fn connect(&mut self, display_name: impl Into<String>, is_bot: bool, now: Instant) -> ClientId {
        let display_name = display_name.into();
        let client = ClientId(self.next_client);
        self.next_client += 1;
        if !is_bot {
            self.sink.register_player(&display_name);
        }
        let player = self.roster.register(display_name, is_bot, now);
        self.clients.insert(client, player);
        self.players.insert(player, client);
        self.views.insert(player, ClientView { is_bot, ..ClientView::default() });
        client
    }

    /// Removes a client's player-to-client mapping immediately so no further inbound is accepted
    /// from them, and queues their owned entities for removal on the next despawn pass.
    pub fn disconnect(&mut self, client: ClientId) {
        let Some(player) = self.clients.remove(&client) else { return };
        self.players.remove(&player);
        if let Some(p) = self.roster.player(player) {
            if !p.is_bot {
                self.sink.unregister_player(&p.display_name);
            }
        }
        self.despawn_queue.push(player);
    }

    /// Cloud timer body: per-player best scores, current boat count, and a terrain snapshot. No
    /// image-encoding crate is part of this workspace's dependency stack, so the "snapshot" is
    /// the same run-length encoding the wire protocol already uses for terrain.
    pub fn cloud_report(&self) {
        let best_scores: std::collections::BTreeMap<String, u32> = self.roster.players().map(|(_, p)| (p.display_name.clone(), p.score)).collect();
        let fleet_size = self.roster.players().filter(|(_, p)| p.is_alive()).count() as u32;
        let window = Aabb::centered(Vec2::ZERO, self.world_radius);
        let snapshot = self.terrain.slice(self.terrain.clamp(window)).encode();
        self.sink.report(&best_scores, fleet_size, &snapshot);
    }

    #[must_use]
    pub fn player_of(&self, client: ClientId) -> Option<PlayerId> {
        self.clients.get(&client).copied()
    }

    #[must_use]
    pub fn client_of(&self, player: PlayerId) -> Option<ClientId> {
        self.players.get(&player).copied()
    }

    /// Every currently-registered client, for the driver's broadcast loop.
    pub fn connected_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.keys().copied()
    }

    pub fn connected_bots(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.views.iter().filter(|(_, view)| view.is_bot).map(|(player, _)| *player)
    }

    /// Hands the driver's bot-policy loop this player's persistent wander state, leaving a
    /// default behind so a concurrent lookup never observes a missing value. Paired with
    /// [`Hub::put_bot_state`] once the policy has run.
    pub(crate) fn take_bot_state(&mut self, player: PlayerId) -> Option<BotState> {
        self.views.get_mut(&player).map(|view| std::mem::take(&mut view.bot_state))
    }

    pub(crate) fn put_bot_state(&mut self, player: PlayerId, state: BotState) {
        if let Some(view) = self.views.get_mut(&player) {
            view.bot_state = state;
        }
    }

    pub(crate) fn record_fps(&mut self, player: PlayerId, fps: f32) {
        if let Some(view) = self.views.get_mut(&player) {
            view.fps = fps.clamp(0.0, 60.0);
        }
    }

    pub(crate) fn record_chat(&mut self, sender: PlayerId, team: Option<TeamId>, message: String, team_only: bool) {
        self.pending_chats.push(PendingChat { sender, team, message, team_only });
    }

    /// Clears the per-tick chat buffer. Must run only after every client's update for this tick
    /// has been constructed — the chat buffer is cleared immediately after broadcast.
    pub fn clear_chat_buffer(&mut self) {
        self.pending_chats.clear();
    }

    /// Runs one physics step and folds its outcome back into the roster: score credits, death
    /// bookkeeping, and the score-loss-on-death rule physics has no `&mut Roster` to apply itself.
    pub fn tick(&mut self, ticks: Ticks, now: Instant) -> PhysicsOutcome {
        let outcome = ironclad_physics::step(&mut self.world, ticks, self.world_radius, &mut self.terrain, self.catalog, &self.roster);

        for credit in &outcome.credits {
            if let Some(player) = self.roster.player_mut(credit.player) {
                player.score = (i64::from(player.score) + credit.amount).max(0) as u32;
            }
        }

        self.apply_deaths(&outcome.deaths, now);
        outcome
    }

    /// Matches each reported death back to the player whose live boat it was (a `DeathEvent`'s
    /// `owner` can just as well be a fired weapon's owner, so ownership alone isn't enough — the
    /// player's `entity` must have actually gone missing from the world this tick) and applies
    /// the §4.5.C loot rule's score side: half the player's score is lost, capped at 80.
    fn apply_deaths(&mut self, deaths: &[ironclad_physics::DeathEvent], now: Instant) {
        for death in deaths {
            let Some(owner) = death.owner else { continue };
            let still_alive = self.roster.player(owner).and_then(|p| p.entity).is_some_and(|id| {
                let mut found = false;
                self.world.get(id, |_| {
                    found = true;
                    false
                });
                found
            });
            if still_alive {
                continue;
            }
            if let Some(player) = self.roster.player_mut(owner) {
                let loss = (player.score / 2).min(DEATH_SCORE_LOSS_CAP);
                player.score = player.score.saturating_sub(loss);
                player.mark_dead(death.position, death.reason.clone(), now);
            }
        }
    }

    /// Leaderboard-timer body minus the leaderboard computation itself: repairs terrain one
    /// step, drains the despawn queue, and runs the world-seeding spawn pass.
    pub fn maintenance_pass(&mut self) {
        self.terrain.repair();
        self.drain_despawn_queue();
        spawn::seed_pass(self);
    }

    /// Removes every entity owned by a queued-for-removal player in one pass, then drops their
    /// roster entry entirely. Entities are matched by `owner`, not by the player's recorded
    /// `entity` handle, since a disconnecting player may also own in-flight weapons.
    fn drain_despawn_queue(&mut self) {
        if self.despawn_queue.is_empty() {
            return;
        }
        let leaving: std::collections::HashSet<PlayerId> = self.despawn_queue.drain(..).collect();
        self.world.for_each(|entity| {
            let remove = entity.owner.is_some_and(|owner| leaving.contains(&owner));
            (false, remove)
        });
        for player in leaving {
            self.views.remove(&player);
            self.roster.unregister(player);
        }
    }

    /// Lerps the world radius toward the target implied by the current population and resizes
    /// the world grid to match.
    pub fn restep_world_radius(&mut self) {
        let target = spawn::radius_for_population(self.roster.players().count());
        self.world_radius += (target - self.world_radius) * 0.25;
        self.world.resize(self.world_radius);
    }

    /// Builds the filtered [`UpdatePayload`] one client is owed this tick: sensor contacts,
    /// pending chats relevant to them, team state, and (on the adaptive cadence) a terrain slice.
    pub fn build_update(&mut self, player: PlayerId, now: Instant) -> UpdatePayload {
        let Some(p) = self.roster.player(player) else { return UpdatePayload::default() };
        let team = p.team;
        let is_bot = self.views.get(&player).map(|v| v.is_bot).unwrap_or(false);

        let observer = match p.entity.and_then(|id| {
            let mut found = None;
            self.world.get(id, |e| {
                found = Some((e.position, e.camera(), e.extension.altitude, e.velocity.float()));
                false
            });
            found
        }) {
            Some((position, (_, visual, radar, sonar), altitude, velocity)) => {
                ObserverContext { position, visual_range: visual, radar_range: radar, sonar_range: sonar, altitude, velocity, owner: Some(player), team, is_bot }
            }
            None => {
                let age = p.death_time.map_or(0.0, |t| (now - t).as_secs_f32());
                let fade = (1.0 - age / 30.0).clamp(0.05, 1.0);
                ObserverContext {
                    position: p.death_position,
                    visual_range: 400.0 * fade,
                    radar_range: 0.0,
                    sonar_range: 0.0,
                    altitude: 0.0,
                    velocity: 0.0,
                    owner: Some(player),
                    team,
                    is_bot,
                }
            }
        };

        let mut contacts: std::collections::BTreeMap<String, Contact> = std::collections::BTreeMap::new();
        let roster = &self.roster;
        let range = observer.max_range();
        self.world.for_in_radius_with_id(observer.position, range.max(1.0), |id, entity: &Entity| {
            let target_team = entity.owner.and_then(|owner| roster.player(owner)).and_then(|pl| pl.team);
            if let Some(contact) = classify_contact(&observer, entity, target_team, roster) {
                contacts.insert(id.to_string(), contact);
            }
        });

        let (chats, team_chats) = self.drain_chats_for(team);

        let mut payload = UpdatePayload {
            world_radius: self.world_radius,
            player_id: Some(ironclad_player::player_id_to_hex(player)),
            entity_id: p.entity.map(|id| id.to_string()),
            contacts,
            chats,
            team_chats,
            ..UpdatePayload::default()
        };

        if let Some(team_id) = team {
            if let Some(team) = self.roster.team(team_id) {
                let members: Vec<_> = team
                    .members()
                    .iter()
                    .filter_map(|id| self.roster.player(*id).map(|pl| ironclad_proto::TeamMember { id: ironclad_player::player_id_to_hex(*id), name: pl.display_name.clone(), score: pl.score }))
                    .collect();
                payload.team_members = members;
                if team.owner() == player {
                    payload.team_invite = ironclad_proto::WireTeamId::pack(&team.name).ok();
                    payload.team_join_requests = team
                        .join_requests()
                        .iter()
                        .filter_map(|id| self.roster.player(*id).map(|pl| ironclad_proto::TeamMember { id: ironclad_player::player_id_to_hex(*id), name: pl.display_name.clone(), score: pl.score }))
                        .collect();
                }
            }
        }

        if let Some(reason) = p.death_reason.clone() {
            payload.death_reason = Some(death_reason_wire(&reason));
        }

        self.attach_terrain_if_due(player, observer.position, &mut payload, p.entity.is_some());

        payload
    }

    fn drain_chats_for(&self, team: Option<TeamId>) -> (Vec<ChatMessage>, Vec<ChatMessage>) {
        let mut chats = Vec::new();
        let mut team_chats = Vec::new();
        for pending in &self.pending_chats {
            let Some(sender) = self.roster.player(pending.sender) else { continue };
            let message = ChatMessage { sender: sender.display_name.clone(), message: pending.message.clone() };
            if pending.team_only {
                if pending.team.is_some() && pending.team == team {
                    team_chats.push(message);
                }
            } else {
                chats.push(message);
            }
        }
        (chats, team_chats)
    }

    fn attach_terrain_if_due(&mut self, player: PlayerId, observer_position: Vec2, payload: &mut UpdatePayload, alive: bool) {
        const VISUAL_WINDOW: f32 = 400.0;
        let aabb = self.terrain.clamp(Aabb::centered(observer_position, VISUAL_WINDOW));
        let cadence = if alive { LIVE_TERRAIN_CADENCE_TICKS } else { DEAD_TERRAIN_CADENCE_TICKS };

        let view = self.views.entry(player).or_default();
        view.ticks_since_terrain += 1;
        let changed = view.last_terrain_aabb.as_ref() != Some(&aabb);
        let force = view.ticks_since_terrain >= cadence;
        if !changed && !force {
            return;
        }
        view.last_terrain_aabb = Some(aabb);
        view.ticks_since_terrain = 0;

        let slice = self.terrain.slice(aabb);
        payload.terrain = Some(ironclad_proto::TerrainWire::encode(&slice));
    }

    #[must_use]
    pub fn leaderboard(&self) -> ironclad_proto::LeaderboardPayload {
        leaderboard::compute(&self.roster)
    }
}

fn death_reason_wire(reason: &DeathReason) -> ironclad_proto::DeathReasonWire {
    use ironclad_player::DeathTag;
    let tag = match reason.tag {
        DeathTag::Weapon => "sinking",
        DeathTag::Collision => "collision",
        DeathTag::Ramming => "ramming",
        DeathTag::Terrain => "terrain",
        DeathTag::Border => "border",
        DeathTag::Unknown => "unknown",
    };
    ironclad_proto::DeathReasonWire { tag: tag.to_string(), player: reason.attacker_name.clone(), entity: reason.attacker_type.map(|t| t.data().name.clone()) }
}
