//! Compressed height-grid terrain: a logically infinite surface backed by a finite window of
//! cells that have actually been sculpted, with everything else derived from seeded noise.

mod noise;
mod rle;
mod terrain;

pub use rle::{decode as decode_rle, encode as encode_rle};
pub use terrain::{Terrain, TerrainSlice, CELL_SIZE, OCEAN_LEVEL};
