//! Scatters collectible crates inside a boat's hull footprint when it dies. The dropped value is
//! half the victim's score, capped at 80, and is spent down across however many crates the hull
//! size allows — each crate type's catalog `level` is its value.

use glam::Vec2;
use ironclad_catalog::{Catalog, EntityTypeId, Kind, SubKind};
use ironclad_entity::Entity;
use ironclad_spatial::World;

const EXTRA_SPREAD: f32 = 5.0;
const MAX_DROP_VALUE: u32 = 80;

pub(crate) fn collectible_type(catalog: &Catalog, sub_kind: SubKind) -> Option<EntityTypeId> {
    catalog.iter().find(|id| {
        let data = catalog.get(*id);
        data.kind == Kind::Collectible && data.sub_kind == sub_kind
    })
}

pub fn spawn(world: &mut World<Entity>, catalog: &Catalog, dead: &Entity, victim_score: u32) {
    let mut remaining_value = (victim_score / 2).min(MAX_DROP_VALUE);
    if remaining_value == 0 {
        return;
    }

    let data = dead.entity_type.data();
    let max_count = (data.length * 0.25 * (0.9 + fastrand::f32() * 0.2)).round().max(0.0) as u32;
    if max_count == 0 {
        return;
    }

    let hull = dead.hull();
    for _ in 0..max_count {
        if remaining_value == 0 {
            break;
        }

        let sub_kind = if data.sub_kind == SubKind::Pirate && fastrand::f32() < 0.5 {
            SubKind::Coin
        } else if data.sub_kind == SubKind::Tanker && fastrand::f32() < 0.5 {
            SubKind::Barrel
        } else {
            SubKind::Scrap
        };
        let Some(loot_type) = collectible_type(catalog, sub_kind).or_else(|| collectible_type(catalog, SubKind::Scrap)) else {
            break;
        };

        let value = u32::from(catalog.get(loot_type).level);
        if value > remaining_value {
            break;
        }
        remaining_value -= value;

        let local_x = (fastrand::f32() * 2.0 - 1.0) * hull.half_length;
        let local_y = (fastrand::f32() * 2.0 - 1.0) * hull.half_width;
        let spread = Vec2::new((fastrand::f32() * 2.0 - 1.0) * EXTRA_SPREAD, (fastrand::f32() * 2.0 - 1.0) * EXTRA_SPREAD);
        let position = hull.center + hull.forward * local_x + hull.right() * local_y + spread;
        world.add(Entity::new(loot_type, position, None));
    }
}
