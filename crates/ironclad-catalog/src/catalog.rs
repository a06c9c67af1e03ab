use std::collections::HashMap;

use ironclad_numerics::Ticks;
use once_cell::sync::Lazy;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{ArmamentMount, Kind, RawEntityType, Sensors, SubKind, TurretMount};

/// An index into the global [`Catalog`]. Cheap to copy, and the only thing an entity stores to
/// refer to its type — the catalog itself is loaded once and never mutated afterward.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EntityTypeId(pub(crate) u16);

impl EntityTypeId {
    #[must_use]
    pub fn data(self) -> &'static EntityTypeData {
        &Catalog::global().entries[self.0 as usize]
    }
}

impl Serialize for EntityTypeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data().name)
    }
}

impl<'de> Deserialize<'de> for EntityTypeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Catalog::global()
            .by_name(&name)
            .ok_or_else(|| D::Error::custom(format!("unknown entity type {name:?}")))
    }
}

/// A fully resolved armament mount: `launches` has been turned into an [`EntityTypeId`] and the
/// reload time into [`Ticks`].
#[derive(Copy, Clone, Debug)]
pub struct ResolvedArmamentMount {
    pub offset: glam::Vec2,
    pub angle: ironclad_numerics::Angle,
    pub vertical: bool,
    pub turret: Option<usize>,
    pub launches: Option<EntityTypeId>,
    pub reload: Ticks,
    pub submerged_reload_factor: f32,
}

/// A catalog entry with every derived field (`radius`, `inv_size`) computed and every
/// cross-reference (armament → launched type) resolved.
#[derive(Debug)]
pub struct EntityTypeData {
    pub name: String,
    pub kind: Kind,
    pub sub_kind: SubKind,
    pub level: u8,
    pub length: f32,
    pub width: f32,
    pub radius: f32,
    pub inv_size: f32,
    pub speed: f32,
    pub lifespan: Ticks,
    pub damage: f32,
    pub reload: Ticks,
    pub anti_aircraft: f32,
    pub stealth: f32,
    pub sensors: Sensors,
    pub turrets: Vec<TurretMount>,
    pub armaments: Vec<ResolvedArmamentMount>,
    pub npc_only: bool,
}

impl EntityTypeData {
    #[must_use]
    pub fn is_unlimited_lifespan(&self) -> bool {
        self.lifespan == Ticks::ZERO
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("entity type {owner:?} has an armament that launches unknown type {launches:?}")]
    UnknownLaunchType { owner: String, launches: String },
    #[error("entity type {owner:?} has an armament referencing turret index {index} but only {turret_count} turrets exist")]
    TurretOutOfRange {
        owner: String,
        index: usize,
        turret_count: usize,
    },
    #[error("duplicate entity type name {0:?}")]
    DuplicateName(String),
}

/// The full set of entity types, loaded once at process start from an embedded JSON blob and
/// never mutated afterward.
pub struct Catalog {
    entries: Vec<EntityTypeData>,
    by_name: HashMap<String, EntityTypeId>,
    boats_by_level: HashMap<u8, Vec<EntityTypeId>>,
}

const EMBEDDED_CATALOG_JSON: &str = include_str!("../data/catalog.json");

static GLOBAL: Lazy<Catalog> = Lazy::new(|| {
    Catalog::load_from_str(EMBEDDED_CATALOG_JSON).expect("embedded entity catalog failed to load")
});

impl Catalog {
    /// The process-wide catalog, parsed on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Parse and validate a catalog from JSON text. Exposed for tests; production code only ever
    /// needs [`Catalog::global`].
    pub fn load_from_str(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawEntityType> = serde_json::from_str(json)?;

        let mut by_name = HashMap::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            if by_name.insert(entry.name.clone(), EntityTypeId(index as u16)).is_some() {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
        }

        let mut entries = Vec::with_capacity(raw.len());
        for entry in &raw {
            let radius = 0.5 * entry.length.hypot(entry.width);
            let inv_size = 1.0 / (radius / 30.0 * (1.0 - entry.stealth)).min(1.0);

            let mut armaments = Vec::with_capacity(entry.armaments.len());
            for mount in &entry.armaments {
                if let Some(index) = mount.turret {
                    if index >= entry.turrets.len() {
                        return Err(CatalogError::TurretOutOfRange {
                            owner: entry.name.clone(),
                            index,
                            turret_count: entry.turrets.len(),
                        });
                    }
                }
                let launches = match &mount.launches {
                    Some(name) => Some(*by_name.get(name).ok_or_else(|| CatalogError::UnknownLaunchType {
                        owner: entry.name.clone(),
                        launches: name.clone(),
                    })?),
                    None => None,
                };
                armaments.push(ResolvedArmamentMount {
                    offset: mount.offset,
                    angle: mount.angle,
                    vertical: mount.vertical,
                    turret: mount.turret,
                    launches,
                    reload: Ticks::to_ticks(mount.reload_seconds),
                    submerged_reload_factor: mount.submerged_reload_factor,
                });
            }

            entries.push(EntityTypeData {
                name: entry.name.clone(),
                kind: entry.kind,
                sub_kind: entry.sub_kind,
                level: entry.level,
                length: entry.length,
                width: entry.width,
                radius,
                inv_size,
                speed: entry.speed,
                lifespan: Ticks::to_ticks(entry.lifespan_seconds),
                damage: entry.damage,
                reload: Ticks::to_ticks(entry.reload_seconds),
                anti_aircraft: entry.anti_aircraft,
                stealth: entry.stealth,
                sensors: entry.sensors,
                turrets: entry.turrets.clone(),
                armaments,
                npc_only: entry.npc_only,
            });
        }

        let mut boats_by_level: HashMap<u8, Vec<EntityTypeId>> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.kind == Kind::Boat {
                boats_by_level.entry(entry.level).or_default().push(EntityTypeId(index as u16));
            }
        }

        Ok(Self { entries, by_name, boats_by_level })
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<EntityTypeId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, id: EntityTypeId) -> &EntityTypeData {
        &self.entries[id.0 as usize]
    }

    #[must_use]
    pub fn boats_at_level(&self, level: u8) -> &[EntityTypeId] {
        self.boats_by_level.get(&level).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn max_boat_level(&self) -> u8 {
        self.boats_by_level.keys().copied().max().unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityTypeId> + '_ {
        (0..self.entries.len()).map(|i| EntityTypeId(i as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = Catalog::global();
        assert!(catalog.iter().count() > 0);
    }

    #[test]
    fn derived_radius_matches_formula() {
        let catalog = Catalog::global();
        for id in catalog.iter() {
            let data = catalog.get(id);
            let expected = 0.5 * data.length.hypot(data.width);
            assert!((data.radius - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn unknown_launch_type_fails_loudly() {
        let json = r#"[{"name":"bad","kind":"boat","subKind":"ram","length":10,"width":2,
            "armaments":[{"offset":[0,0],"angle":0,"launches":"does-not-exist","reloadSeconds":1}]}]"#;
        let result = Catalog::load_from_str(json);
        assert!(matches!(result, Err(CatalogError::UnknownLaunchType { .. })));
    }

    #[test]
    fn unknown_sub_kind_string_fails_to_parse() {
        let json = r#"[{"name":"bad","kind":"boat","subKind":"not-a-real-subkind","length":10,"width":2}]"#;
        let result = Catalog::load_from_str(json);
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn boats_grouped_by_level() {
        let catalog = Catalog::global();
        for level in 1..=catalog.max_boat_level() {
            for id in catalog.boats_at_level(level) {
                assert_eq!(catalog.get(*id).level, level);
            }
        }
    }
}
