use std::collections::HashMap;

use glam::Vec2;
use ironclad_geometry::Aabb;

use crate::noise::baseline_height;

/// Side length of one terrain cell, in meters.
pub const CELL_SIZE: f32 = 10.0;

/// Height at or above which a cell is land (blocks non-boats, slows and damages boats).
pub const OCEAN_LEVEL: u8 = 128;

/// A tile of cell heights, as returned by [`Terrain::slice`]. `stride` lets a caller pad rows
/// without re-copying; for slices produced here `stride == width`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainSlice {
    pub x: i32,
    pub y: i32,
    pub stride: usize,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl TerrainSlice {
    /// Wire-compresses this slice's `data` with [`crate::rle::encode`].
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        crate::rle::encode(&self.data)
    }
}

fn world_to_cell(p: Vec2) -> (i32, i32) {
    ((p.x / CELL_SIZE).floor() as i32, (p.y / CELL_SIZE).floor() as i32)
}

/// An infinite logical height surface (0..255 per cell) with a finite materialized window.
///
/// Only cells a [`Terrain::sculpt`] has touched are stored; everything else is computed on
/// demand from a seeded noise function, so an untouched map carries no per-cell memory at all.
/// [`Terrain::repair`] diffuses materialized cells back toward their noise baseline, evicting
/// them once they settle, which keeps the materialized window bounded to active damage rather
/// than growing forever.
pub struct Terrain {
    seed: u64,
    cells: HashMap<(i32, i32), u8>,
}

impl Terrain {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed, cells: HashMap::new() }
    }

    fn baseline(&self, cell: (i32, i32)) -> u8 {
        baseline_height(self.seed, cell.0, cell.1)
    }

    /// Height of the cell containing world point `p`.
    #[must_use]
    pub fn at(&self, p: Vec2) -> u8 {
        let cell = world_to_cell(p);
        self.cells.get(&cell).copied().unwrap_or_else(|| self.baseline(cell))
    }

    /// Samples along a straight-line sweep from `position` for `seconds` of travel at `speed`
    /// along unit vector `forward`; true iff any sample's height is at or above ocean level.
    #[must_use]
    pub fn collides(&self, position: Vec2, forward: Vec2, speed: f32, seconds: f32) -> bool {
        const SAMPLES: usize = 8;
        let travel = forward * (speed * seconds);
        (0..=SAMPLES).any(|i| {
            let t = i as f32 / SAMPLES as f32;
            self.at(position + travel * t) >= OCEAN_LEVEL
        })
    }

    /// Snaps `aabb` outward to whole cells.
    #[must_use]
    pub fn clamp(&self, aabb: Aabb) -> Aabb {
        aabb.clamp_to_grid(CELL_SIZE)
    }

    /// Returns a dense tile of cell heights covering `aabb`, clamped to the cell grid first.
    #[must_use]
    pub fn slice(&self, aabb: Aabb) -> TerrainSlice {
        let clamped = self.clamp(aabb);
        let (min_x, min_y) = world_to_cell(clamped.min);
        let (max_x, max_y) = world_to_cell(clamped.max);
        let width = (max_x - min_x).max(1) as usize;
        let height = (max_y - min_y).max(1) as usize;

        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let cell = (min_x + col as i32, min_y + row as i32);
                data.push(self.cells.get(&cell).copied().unwrap_or_else(|| self.baseline(cell)));
            }
        }

        TerrainSlice { x: min_x, y: min_y, stride: width, width, height, data }
    }

    /// Adds (or subtracts, for negative `delta`) height in a disk of `radius` meters around `p`,
    /// saturating at `0`/`255`. Falloff is linear from `delta` at the center to `0` at the edge.
    pub fn sculpt(&mut self, p: Vec2, radius: f32, delta: f32) {
        if radius <= 0.0 || delta == 0.0 {
            return;
        }
        let cell_radius = (radius / CELL_SIZE).ceil() as i32;
        let (cx, cy) = world_to_cell(p);
        for dy in -cell_radius..=cell_radius {
            for dx in -cell_radius..=cell_radius {
                let cell = (cx + dx, cy + dy);
                let cell_center = Vec2::new(
                    (cell.0 as f32 + 0.5) * CELL_SIZE,
                    (cell.1 as f32 + 0.5) * CELL_SIZE,
                );
                let distance = cell_center.distance(p);
                if distance > radius {
                    continue;
                }
                let falloff = 1.0 - distance / radius;
                let current = self.cells.get(&cell).copied().unwrap_or_else(|| self.baseline(cell));
                let applied = (delta * falloff).round();
                let next = (f32::from(current) + applied).clamp(0.0, 255.0) as u8;
                self.cells.insert(cell, next);
            }
        }
    }

    /// Diffuses every materialized cell one step toward its noise baseline, evicting cells that
    /// have fully settled so the materialized window stays bounded to recently-damaged terrain.
    pub fn repair(&mut self) {
        let mut settled = Vec::new();
        for (&cell, height) in &mut self.cells {
            let baseline = baseline_height(self.seed, cell.0, cell.1);
            let diff = i16::from(baseline) - i16::from(*height);
            if diff == 0 {
                settled.push(cell);
                continue;
            }
            let step = diff.signum() * (diff.abs() / 10).max(1);
            let next = i16::from(*height) + step;
            *height = next.clamp(0, 255) as u8;
            if *height == baseline {
                settled.push(cell);
            }
        }
        for cell in settled {
            self.cells.remove(&cell);
        }
    }

    #[must_use]
    pub fn materialized_cell_count(&self) -> usize {
        self.cells.len()
    }
}
