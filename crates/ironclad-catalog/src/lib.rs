//! The static entity-type catalog.
//!
//! Every [`EntityTypeId`] is an index into a table parsed once, at process start, from a JSON
//! blob embedded in the binary (`data/catalog.json`), then never mutated again. Unknown
//! `kind`/`subKind` strings, or an armament that launches a type the catalog doesn't define,
//! fail the load instead of silently falling back to a default.

mod catalog;
mod types;

pub use catalog::{Catalog, CatalogError, EntityTypeData, EntityTypeId, ResolvedArmamentMount};
pub use types::{ArmamentMount, Kind, RawEntityType, Sensors, SensorType, SubKind, TurretMount};
