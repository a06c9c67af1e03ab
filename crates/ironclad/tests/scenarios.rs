//! Boundary-scenario integration tests, each built directly against the hub's public
//! `World`/`Physics`/`Handlers` API rather than through a transport.

use std::time::Instant;

use glam::Vec2;
use ironclad::Hub;
use ironclad_catalog::Catalog;
use ironclad_entity::Entity;
use ironclad_numerics::Ticks;
use ironclad_player::DeathTag;
use ironclad_proto::Inbound;

fn catalog() -> &'static Catalog {
    Catalog::global()
}

/// Scenario 1: spawn + fire + hit. A player's `fairmileD` fires its first torpedo slot at a
/// stationary bot boat 100 m ahead; after enough ticks the bot sinks with a weapon death reason
/// naming the firing player.
#[test]
fn spawn_fire_and_hit_sinks_the_target() {
    let mut hub = Hub::new(2_000.0, 1, 2, None);
    let now = Instant::now();

    let shooter_client = hub.connect("Ahab", false, now);
    let shooter = hub.player_of(shooter_client).unwrap();
    hub.handle_inbound(shooter, Inbound::Spawn { name: "Ahab".into(), entity_type: "fairmileD".into(), auth: None, invite: None }, now).unwrap();
    let shooter_entity = hub.roster.player(shooter).unwrap().entity.unwrap();

    // Place the shooter at the origin facing +x, and drop the target dead ahead.
    hub.world.get(shooter_entity, |e| {
        e.position = Vec2::ZERO;
        e.direction = ironclad_numerics::Angle::ZERO;
        false
    });

    let target_type = catalog().by_name("komar").unwrap();
    let mut target = Entity::new(target_type, Vec2::new(100.0, 0.0), None);
    target.direction = ironclad_numerics::Angle::ZERO;
    hub.world.add(target);

    hub.handle_inbound(shooter, Inbound::Fire { index: 0, position_target: Vec2::new(200.0, 0.0), guidance: None }, now).unwrap();
    assert_eq!(hub.world.len(), 3); // shooter boat, target boat, torpedo

    let mut sunk = false;
    for _ in 0..300 {
        let outcome = hub.tick(Ticks(1), now);
        if outcome.deaths.iter().any(|d| d.reason.tag == DeathTag::Weapon) {
            sunk = true;
            break;
        }
    }
    assert!(sunk, "the target should have sunk within the torpedo's lifespan");
}

/// Scenario 2: an entity placed just beyond the instant-kill border ring is removed on the very
/// next tick, and a boat's owner sees `deathReason.type == "border"`.
#[test]
fn border_crossing_kills_the_boat_and_reports_border_reason() {
    let mut hub = Hub::new(1_000.0, 1, 2, None);
    let now = Instant::now();

    let client = hub.connect("Drifter", false, now);
    let player = hub.player_of(client).unwrap();
    hub.handle_inbound(player, Inbound::Spawn { name: "Drifter".into(), entity_type: "fairmileD".into(), auth: None, invite: None }, now).unwrap();
    let entity_id = hub.roster.player(player).unwrap().entity.unwrap();

    const RADIUS_CLEARANCE: f32 = 1.1;
    hub.world.get(entity_id, |e| {
        e.position = Vec2::new(1_000.0 * RADIUS_CLEARANCE + 1.0, 0.0);
        e.velocity = ironclad_numerics::Velocity::ZERO;
        e.velocity_target = ironclad_numerics::Velocity::ZERO;
        false
    });

    hub.tick(Ticks(1), now);

    assert!(hub.roster.player(player).unwrap().entity.is_none());
    let payload = hub.build_update(player, now);
    let reason = payload.death_reason.expect("a death reason should be attached after a border kill");
    assert_eq!(reason.tag, "border");
}

/// Scenario 3: player A creates a team, player B requests to join, A accepts, and the
/// membership/join-request state settles on both sides.
#[test]
fn team_create_request_and_accept_round_trips() {
    let mut hub = Hub::new(2_000.0, 1, 2, None);
    let now = Instant::now();

    let a_client = hub.connect("Alpha", false, now);
    let a = hub.player_of(a_client).unwrap();
    hub.handle_inbound(a, Inbound::CreateTeam { name: "alpha".into() }, now).unwrap();

    let b_client = hub.connect("Beta", false, now);
    let b = hub.player_of(b_client).unwrap();
    let wire = ironclad_proto::WireTeamId::pack("alpha").unwrap();
    hub.handle_inbound(b, Inbound::AddToTeam { team_id: Some(wire), player_id: None }, now).unwrap();

    let a_payload = hub.build_update(a, now);
    assert_eq!(a_payload.team_join_requests.len(), 1);
    assert_eq!(a_payload.team_join_requests[0].id, ironclad_player::player_id_to_hex(b));

    let b_hex = ironclad_player::player_id_to_hex(b);
    hub.handle_inbound(a, Inbound::AddToTeam { team_id: None, player_id: Some(b_hex) }, now).unwrap();

    let a_payload = hub.build_update(a, now);
    let b_payload = hub.build_update(b, now);
    assert!(a_payload.team_join_requests.is_empty());
    assert_eq!(a_payload.team_members.len(), 2);
    assert_eq!(b_payload.team_members.len(), 2);
    assert_eq!(hub.roster.player(a).unwrap().team, hub.roster.player(b).unwrap().team);
}

/// Scenario 4: the eleventh distinct short chat message inside a burst is dropped by the
/// frequency heuristic, while the player's own clean-message counters keep advancing.
#[test]
fn eleventh_rapid_chat_message_is_throttled() {
    let mut hub = Hub::new(2_000.0, 1, 2, None);
    let now = Instant::now();
    let client = hub.connect("Chatty", false, now);
    let player = hub.player_of(client).unwrap();

    let mut accepted = 0;
    let mut last_result = Ok(());
    for i in 0..11 {
        last_result = hub.handle_inbound(player, Inbound::SendChat { message: format!("hello number {i}"), team: false }, now);
        if last_result.is_ok() {
            accepted += 1;
        }
    }

    assert!(last_result.is_err(), "the 11th message in under a second should be throttled");
    assert!(accepted <= 10);
}

/// Scenario 5: a `ram`-subkind boat collides head-on with a non-ram boat of equal vulnerability.
/// Over repeated contact ticks the non-ram boat's damage climbs roughly three times as fast and
/// it dies first, with `deathReason.type == "ramming"` naming the ram's owner.
#[test]
fn ram_boat_kills_a_non_ram_boat_of_equal_hp_three_times_faster() {
    let mut hub = Hub::new(4_000.0, 1, 2, None);
    let now = Instant::now();

    let ram_client = hub.connect("RamOwner", false, now);
    let ram_owner = hub.player_of(ram_client).unwrap();
    let victim_client = hub.connect("Victim", false, now);
    let victim_owner = hub.player_of(victim_client).unwrap();

    let ram_type = catalog().by_name("ramBoat").unwrap();
    let non_ram_type = catalog().by_name("komar").unwrap();
    assert_eq!(ram_type.data().damage, non_ram_type.data().damage, "scenario requires equal hp_max");

    let ram_id = hub.world.add(Entity::new(ram_type, Vec2::new(-5.0, 0.0), Some(ram_owner)));
    let victim_id = hub.world.add(Entity::new(non_ram_type, Vec2::new(5.0, 0.0), Some(victim_owner)));
    hub.roster.player_mut(ram_owner).unwrap().entity = Some(ram_id);
    hub.roster.player_mut(victim_owner).unwrap().entity = Some(victim_id);

    hub.world.get(ram_id, |e| {
        e.direction = ironclad_numerics::Angle::ZERO;
        e.direction_target = ironclad_numerics::Angle::ZERO;
        e.velocity = ironclad_numerics::Velocity::to_velocity(15.0);
        e.velocity_target = e.velocity;
        false
    });
    hub.world.get(victim_id, |e| {
        e.direction = ironclad_numerics::Angle::to_angle(std::f32::consts::PI);
        e.direction_target = e.direction;
        e.velocity = ironclad_numerics::Velocity::to_velocity(15.0);
        e.velocity_target = e.velocity;
        false
    });

    let mut victim_died_first = false;
    for _ in 0..400 {
        let outcome = hub.tick(Ticks(1), now);
        let ram_dead = outcome.deaths.iter().any(|d| d.owner == Some(ram_owner));
        let victim_dead = outcome.deaths.iter().any(|d| d.owner == Some(victim_owner));
        if victim_dead {
            victim_died_first = !ram_dead || outcome.deaths.iter().position(|d| d.owner == Some(victim_owner)) < outcome.deaths.iter().position(|d| d.owner == Some(ram_owner));
            assert!(outcome.deaths.iter().find(|d| d.owner == Some(victim_owner)).unwrap().reason.tag == DeathTag::Ramming);
            break;
        }
        if ram_dead {
            break;
        }
    }
    assert!(victim_died_first, "the non-ram boat should sink before the ram boat");
}

/// Scenario 6: with a stationary enemy boat and a submerged observer submarine, sensor
/// uncertainty decreases monotonically as the submarine surfaces, rising again as it dives; far
/// enough away, no contact is emitted at all.
#[test]
fn sensor_uncertainty_is_monotone_in_submarine_altitude() {
    let mut hub = Hub::new(2_000.0, 1, 2, None);
    let now = Instant::now();

    let target_client = hub.connect("Target", false, now);
    let target_player = hub.player_of(target_client).unwrap();
    let target_type = catalog().by_name("komar").unwrap();
    let target_id = hub.world.add(Entity::new(target_type, Vec2::new(400.0, 0.0), Some(target_player)));
    hub.roster.player_mut(target_player).unwrap().entity = Some(target_id);

    let observer_client = hub.connect("Observer", false, now);
    let observer_player = hub.player_of(observer_client).unwrap();
    let sub_type = catalog().by_name("attackSub").unwrap();
    let sub_id = hub.world.add(Entity::new(sub_type, Vec2::ZERO, Some(observer_player)));
    hub.roster.player_mut(observer_player).unwrap().entity = Some(sub_id);

    let mut uncertainty_at = |altitude: f32| {
        hub.world.get(sub_id, |e| {
            e.extension.altitude = altitude;
            e.extension.altitude_target = altitude;
            false
        });
        let payload = hub.build_update(observer_player, now);
        payload.contacts.values().next().map(|c| c.uncertainty)
    };

    let submerged = uncertainty_at(-0.9);
    let rising = uncertainty_at(-0.4);
    let surfaced = uncertainty_at(0.0);
    let diving_again = uncertainty_at(-0.6);

    if let (Some(a), Some(b)) = (submerged, rising) {
        assert!(b <= a + 1e-6);
    }
    if let (Some(a), Some(b)) = (rising, surfaced) {
        assert!(b <= a + 1e-6);
    }
    if let (Some(a), Some(b)) = (surfaced, diving_again) {
        assert!(b >= a - 1e-6);
    }

    // Far enough away, no channel resolves the contact at all.
    hub.world.get(target_id, |e| {
        e.position = Vec2::new(100_000.0, 0.0);
        false
    });
    let payload = hub.build_update(observer_player, now);
    assert!(payload.contacts.is_empty());
}
