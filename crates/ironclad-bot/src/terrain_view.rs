//! Decodes a [`TerrainWire`] slice into a queryable height grid, entirely independent of
//! `ironclad_terrain::Terrain` itself: a bot only ever sees the same wire-compressed window a
//! real client's map would, never the simulation's own terrain store.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use glam::Vec2;
use ironclad_proto::TerrainWire;
use ironclad_terrain::{decode_rle, CELL_SIZE, OCEAN_LEVEL};

pub struct TerrainView {
    origin_x: i32,
    origin_y: i32,
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl TerrainView {
    /// Decodes `wire`, or `None` if the payload is malformed (truncated base64, or a `width` of
    /// zero). A bot with no decodable terrain simply skips land-avoidance for that update.
    #[must_use]
    pub fn decode(wire: &TerrainWire) -> Option<Self> {
        if wire.width == 0 {
            return None;
        }
        let bytes = BASE64.decode(&wire.data).ok()?;
        let data = decode_rle(&bytes);
        if data.is_empty() {
            return None;
        }
        let height = data.len() / wire.width;
        Some(Self { origin_x: wire.x, origin_y: wire.y, width: wire.width, height, data })
    }

    /// True if the cell under `world` is land (height at or above [`OCEAN_LEVEL`]). Points
    /// outside the disclosed window are treated as clear — the bot simply hasn't seen that far.
    #[must_use]
    pub fn is_land(&self, world: Vec2) -> bool {
        let cell_x = (world.x / CELL_SIZE).floor() as i32 - self.origin_x;
        let cell_y = (world.y / CELL_SIZE).floor() as i32 - self.origin_y;
        if cell_x < 0 || cell_y < 0 {
            return false;
        }
        let (cell_x, cell_y) = (cell_x as usize, cell_y as usize);
        if cell_x >= self.width || cell_y >= self.height {
            return false;
        }
        self.data[cell_y * self.width + cell_x] >= OCEAN_LEVEL
    }
}
