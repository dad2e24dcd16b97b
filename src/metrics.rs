//! Geometry constants and the pure functions that shape the terrain.
//!
//! Everything here is stateless except [`HexMetrics`], which bundles the two
//! seeded lookup tables (noise field and hash grid) a map needs for
//! perturbation and feature selection.

mod edge_vertices;
mod hash_grid;
mod noise_field;

pub use edge_vertices::EdgeVertices;
pub use hash_grid::{HashGrid, HexHash};
pub use noise_field::NoiseField;

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::coordinates::HexDirection;

// ── Constants ───────────────────────────────────────────────────────

/// Ratio between inner and outer radius of a regular hexagon.
pub const OUTER_TO_INNER: f32 = 0.866025404;
/// Inverse of [`OUTER_TO_INNER`].
pub const INNER_TO_OUTER: f32 = 1.0 / OUTER_TO_INNER;
/// Center-to-corner distance.
pub const OUTER_RADIUS: f32 = 1.0;
/// Center-to-edge distance.
pub const INNER_RADIUS: f32 = OUTER_RADIUS * OUTER_TO_INNER;

/// Fraction of the hexagon covered by the flat cell interior.
pub const SOLID_FACTOR: f32 = 0.8;
/// Fraction left for the blend region between cells.
pub const BLEND_FACTOR: f32 = 1.0 - SOLID_FACTOR;

/// World height of one elevation level.
pub const ELEVATION_STEP: f32 = 0.3;
/// Flat terraces inserted into a one-level slope.
pub const TERRACES_PER_SLOPE: usize = 2;
/// Interpolation steps across a terraced slope (always odd).
pub const TERRACE_STEPS: usize = TERRACES_PER_SLOPE * 2 + 1;
const HORIZONTAL_TERRACE_STEP_SIZE: f32 = 1.0 / TERRACE_STEPS as f32;
const VERTICAL_TERRACE_STEP_SIZE: f32 = 1.0 / (TERRACES_PER_SLOPE + 1) as f32;

/// Maximum horizontal vertex displacement from the noise field.
pub const CELL_PERTURB_STRENGTH: f32 = 0.4;
/// Maximum vertical offset applied to a cell center.
pub const ELEVATION_PERTURB_STRENGTH: f32 = 0.15;

/// Cells per chunk along X.
pub const CHUNK_SIZE_X: usize = 5;
/// Cells per chunk along Z.
pub const CHUNK_SIZE_Z: usize = 5;

/// River bed depth in elevation levels.
pub const STREAM_BED_ELEVATION_OFFSET: f32 = -1.75;
/// Water and river surfaces sit this many levels below their nominal height.
pub const WATER_ELEVATION_OFFSET: f32 = -0.5;

/// Fraction of the hexagon covered by the open water surface.
pub const WATER_FACTOR: f32 = 0.6;
/// Fraction left for water bridges.
pub const WATER_BLEND_FACTOR: f32 = 1.0 - WATER_FACTOR;

/// World size covered by one tile of the noise field before it wraps.
pub const NOISE_TILE_SIZE: f32 = 40.0 * OUTER_RADIUS * 2.0;

/// Side length of the square hash grid.
pub const HASH_GRID_SIZE: usize = 256;
/// World-to-hash-grid scale.
pub const HASH_GRID_SCALE: f32 = 2.5;

const FEATURE_THRESHOLDS: [[f32; 3]; 3] = [[0.0, 0.0, 0.4], [0.0, 0.4, 0.6], [0.4, 0.6, 0.8]];

/// Wall height above its base.
pub const WALL_HEIGHT: f32 = 0.4;
/// Hash value below which a level wall junction gets a tower.
pub const WALL_TOWER_THRESHOLD: f32 = 0.5;
const WALL_Y_OFFSET: f32 = -0.1;
const WALL_THICKNESS: f32 = 0.075;
const WALL_ELEVATION_OFFSET: f32 = VERTICAL_TERRACE_STEP_SIZE;

/// Span a bridge prop is modelled for; longer spans stretch it.
pub const BRIDGE_DESIGN_LENGTH: f32 = 0.7;

const CORNERS: [Vec3; 7] = [
    Vec3::new(0.0, 0.0, OUTER_RADIUS),
    Vec3::new(-INNER_RADIUS, 0.0, 0.5 * OUTER_RADIUS),
    Vec3::new(-INNER_RADIUS, 0.0, -0.5 * OUTER_RADIUS),
    Vec3::new(0.0, 0.0, -OUTER_RADIUS),
    Vec3::new(INNER_RADIUS, 0.0, -0.5 * OUTER_RADIUS),
    Vec3::new(INNER_RADIUS, 0.0, 0.5 * OUTER_RADIUS),
    Vec3::new(0.0, 0.0, OUTER_RADIUS),
];

// ── Corners and bridges ─────────────────────────────────────────────

/// First corner of the edge facing `direction`.
pub fn first_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index()]
}

/// Second corner of the edge facing `direction`.
pub fn second_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index() + 1]
}

/// First corner of the solid interior.
pub fn first_solid_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index()] * SOLID_FACTOR
}

/// Second corner of the solid interior.
pub fn second_solid_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index() + 1] * SOLID_FACTOR
}

/// First corner of the open water surface.
pub fn first_water_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index()] * WATER_FACTOR
}

/// Second corner of the open water surface.
pub fn second_water_corner(direction: HexDirection) -> Vec3 {
    CORNERS[direction.index() + 1] * WATER_FACTOR
}

/// Offset from a solid edge to the neighbor's matching solid edge.
pub fn bridge(direction: HexDirection) -> Vec3 {
    (CORNERS[direction.index()] + CORNERS[direction.index() + 1]) * BLEND_FACTOR
}

/// Offset from a water edge to the neighbor's matching water edge.
pub fn water_bridge(direction: HexDirection) -> Vec3 {
    (CORNERS[direction.index()] + CORNERS[direction.index() + 1]) * WATER_BLEND_FACTOR
}

/// Midpoint of the solid edge facing `direction`.
pub fn solid_edge_middle(direction: HexDirection) -> Vec3 {
    (CORNERS[direction.index()] + CORNERS[direction.index() + 1]) * (0.5 * SOLID_FACTOR)
}

// ── Terraces and edges ──────────────────────────────────────────────

/// Position of terrace `step` between `a` and `b`.
///
/// X and Z advance on every step; Y only advances on odd steps, which turns a
/// slope into a staircase of flat terraces.
pub fn terrace_lerp(a: Vec3, b: Vec3, step: usize) -> Vec3 {
    let h = step as f32 * HORIZONTAL_TERRACE_STEP_SIZE;
    let v = ((step + 1) / 2) as f32 * VERTICAL_TERRACE_STEP_SIZE;
    Vec3::new(a.x + (b.x - a.x) * h, a.y + (b.y - a.y) * v, a.z + (b.z - a.z) * h)
}

/// Blend weights for terrace `step`; weights advance linearly.
pub fn terrace_lerp_weights(a: Vec3, b: Vec3, step: usize) -> Vec3 {
    a.lerp(b, step as f32 * HORIZONTAL_TERRACE_STEP_SIZE)
}

/// Shape of the connection between two elevations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum HexEdgeType {
    /// Same elevation.
    Flat,
    /// One level apart; rendered as terraces.
    Slope,
    /// Two or more levels apart.
    Cliff,
}

/// Classifies the connection between two elevations.
pub fn edge_type(elevation1: i32, elevation2: i32) -> HexEdgeType {
    match elevation2 - elevation1 {
        0 => HexEdgeType::Flat,
        1 | -1 => HexEdgeType::Slope,
        _ => HexEdgeType::Cliff,
    }
}

// ── Heights ─────────────────────────────────────────────────────────

/// Unperturbed world height of an elevation level.
pub fn elevation_height(elevation: i32) -> f32 {
    elevation as f32 * ELEVATION_STEP
}

/// Height of a river bed running through a cell.
pub fn stream_bed_y(elevation: i32) -> f32 {
    (elevation as f32 + STREAM_BED_ELEVATION_OFFSET) * ELEVATION_STEP
}

/// Height of a river surface running through a cell.
pub fn river_surface_y(elevation: i32) -> f32 {
    (elevation as f32 + WATER_ELEVATION_OFFSET) * ELEVATION_STEP
}

/// Height of a standing water surface.
pub fn water_surface_y(water_level: i32) -> f32 {
    (water_level as f32 + WATER_ELEVATION_OFFSET) * ELEVATION_STEP
}

/// Flat world position of the cell at offset `(col, row)`.
pub fn cell_center(col: i32, row: i32) -> Vec3 {
    Vec3::new(
        (col as f32 + row as f32 * 0.5 - (row / 2) as f32) * (INNER_RADIUS * 2.0),
        0.0,
        row as f32 * (OUTER_RADIUS * 1.5),
    )
}

// ── Features ────────────────────────────────────────────────────────

/// Hash thresholds for the three feature sizes at density `level` (1-based).
///
/// Returns `None` for level 0 or levels past the table.
pub fn feature_thresholds(level: i32) -> Option<[f32; 3]> {
    let index = usize::try_from(level).ok()?.checked_sub(1)?;
    FEATURE_THRESHOLDS.get(index).copied()
}

/// Half-thickness offset of a wall running from `near` to `far`.
pub fn wall_thickness_offset(near: Vec3, far: Vec3) -> Vec3 {
    Vec3::new(far.x - near.x, 0.0, far.z - near.z) * (WALL_THICKNESS * 0.5)
}

/// Base point of a wall between `near` and `far`.
///
/// Horizontally halfway; vertically biased toward the lower side so the wall
/// sits on the terrace rather than floating.
pub fn wall_lerp(near: Vec3, far: Vec3) -> Vec3 {
    let v = if near.y < far.y {
        WALL_ELEVATION_OFFSET
    } else {
        1.0 - WALL_ELEVATION_OFFSET
    };
    Vec3::new(
        near.x + (far.x - near.x) * 0.5,
        near.y + (far.y - near.y) * v + WALL_Y_OFFSET,
        near.z + (far.z - near.z) * 0.5,
    )
}

// ── Seeded tables ───────────────────────────────────────────────────

/// Seeded lookup tables shared by every chunk of one map.
#[derive(Clone, Debug)]
pub struct HexMetrics {
    noise: NoiseField,
    hash_grid: HashGrid,
}

impl HexMetrics {
    /// Builds the noise field and hash grid.
    ///
    /// `rng` is the map's shared random stream; it is left exactly where it
    /// was, see [`HashGrid::generate`].
    pub fn new(hash_seed: u64, noise_seed: u32, noise_resolution: usize, rng: &mut ChaCha8Rng) -> Self {
        Self {
            noise: NoiseField::generate(noise_seed, noise_resolution),
            hash_grid: HashGrid::generate(hash_seed, rng),
        }
    }

    /// Bilinear sample of the noise field at a world position.
    pub fn sample_noise(&self, position: Vec3) -> Vec4 {
        self.noise.sample(position)
    }

    /// Displaces a vertex horizontally by the noise field.
    pub fn perturb(&self, position: Vec3) -> Vec3 {
        let sample = self.noise.sample(position);
        Vec3::new(
            position.x + (sample.x * 2.0 - 1.0) * CELL_PERTURB_STRENGTH,
            position.y,
            position.z + (sample.z * 2.0 - 1.0) * CELL_PERTURB_STRENGTH,
        )
    }

    /// Vertical offset of a cell center at `position`.
    pub fn elevation_perturbation(&self, position: Vec3) -> f32 {
        (self.noise.sample(position).y * 2.0 - 1.0) * ELEVATION_PERTURB_STRENGTH
    }

    /// Hash tuple of the grid slot containing `position`.
    pub fn sample_hash_grid(&self, position: Vec3) -> HexHash {
        self.hash_grid.sample(position)
    }
}
