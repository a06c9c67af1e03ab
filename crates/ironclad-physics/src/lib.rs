//! The physics step: a parallel per-entity update pass, a single-threaded neighbor sweep that
//! resolves collisions and combat, and loot spawning for boats that died this step. Pairwise
//! effects follow a "mutate only `self`, read `other`" discipline, so that the sector grid's
//! double-directed pair visitation (`World::for_each_and_others` calls `pair_fn(a, b)` once from
//! each side of every touching pair) never double-applies an additive effect.

mod collision;
mod loot;

use flume::unbounded;
use glam::Vec2;
use ironclad_catalog::{Catalog, Kind, SubKind};
use ironclad_entity::Entity;
use ironclad_numerics::Ticks;
use ironclad_player::{DeathReason, DeathTag, PlayerId, Roster};
use ironclad_spatial::World;
use ironclad_terrain::Terrain;

/// One entity's death this physics step. Physics only reports what happened — applying score
/// deltas, clearing the owning player's `entity` handle, and respawn bookkeeping are the hub's
/// job, since those require `&mut Roster` which physics never holds.
#[derive(Clone, Debug)]
pub struct DeathEvent {
    pub owner: Option<PlayerId>,
    pub reason: DeathReason,
    pub position: Vec2,
}

/// A score delta earned this step (a kill, a collectible pickup), applied by the hub.
#[derive(Copy, Clone, Debug)]
pub struct ScoreCredit {
    pub player: PlayerId,
    pub amount: i64,
}

#[derive(Default, Debug)]
pub struct PhysicsOutcome {
    pub deaths: Vec<DeathEvent>,
    pub credits: Vec<ScoreCredit>,
}

/// Runs one physics step of `ticks` simulated ticks.
pub fn step(
    world: &mut World<Entity>,
    ticks: Ticks,
    world_radius: f32,
    terrain: &mut Terrain,
    catalog: &Catalog,
    roster: &Roster,
) -> PhysicsOutcome {
    let mut outcome = PhysicsOutcome::default();
    run_update_pass(world, ticks, world_radius, terrain, catalog, roster, &mut outcome);
    collision::sweep(world, ticks, catalog, roster, &mut outcome);
    outcome
}

/// Parallel per-entity update, with dying torpedoes/shells and active dredgers recording terrain
/// sculpt requests into a side channel drained serially afterward.
fn run_update_pass(
    world: &mut World<Entity>,
    ticks: Ticks,
    world_radius: f32,
    terrain: &mut Terrain,
    catalog: &Catalog,
    roster: &Roster,
    outcome: &mut PhysicsOutcome,
) {
    let (death_tx, death_rx) = unbounded::<(Entity, DeathTag)>();
    let (sculpt_tx, sculpt_rx) = unbounded::<(Vec2, f32, f32)>();

    world.for_each_parallel(|entity| {
        let data = entity.entity_type.data();
        let is_active_dredger = data.kind == Kind::Boat && data.sub_kind == SubKind::Dredger;

        let tag = entity.update(ticks, world_radius, terrain, catalog);

        if is_active_dredger && tag.is_none() {
            sculpt_tx.send((entity.position, data.radius, -40.0 * ticks.float())).ok();
        }

        match tag {
            Some(death_tag) => {
                if matches!(data.sub_kind, SubKind::Torpedo | SubKind::Shell) {
                    let severity = entity.damage.damage().clamp(0.0, 1.0);
                    if fastrand::f32() < severity {
                        sculpt_tx.send((entity.position, data.radius * 3.0, data.damage * 80.0)).ok();
                    }
                }
                death_tx.send((entity.clone(), death_tag)).ok();
                (false, true)
            }
            None => (false, false),
        }
    });
    drop(death_tx);
    drop(sculpt_tx);

    for (dying, tag) in death_rx.drain() {
        let data = dying.entity_type.data();
        if data.kind == Kind::Boat {
            let victim_score = dying.owner.and_then(|id| roster.player(id)).map_or(0, |player| player.score);
            loot::spawn(world, catalog, &dying, victim_score);
        }
        outcome.deaths.push(DeathEvent {
            owner: dying.owner,
            reason: DeathReason { tag, attacker_name: None, attacker_type: None },
            position: dying.position,
        });
    }
    for (position, radius, delta) in sculpt_rx.drain() {
        terrain.sculpt(position, radius, delta);
    }
}
