//! Sector-grid spatial index shared by the physics step, the sensor filter, and bot scanning.
//!
//! Entities are bucketed into 500m sectors keyed by `floor(position / 500)`. The grid is a flat
//! `Vec` sized to the next power of two covering the configured world radius, which keeps sector
//! lookup a single multiply-add rather than a hash.

mod id;
mod world;

pub use id::EntityId;
pub use world::{Positioned, World, SECTOR_SIZE};
