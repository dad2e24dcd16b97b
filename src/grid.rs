//! The cell arena and everything that mutates it.
//!
//! [`HexGrid`] owns cells, chunks, units, the seeded metrics tables and the
//! shared random stream. Edits only mark chunks dirty; [`HexGrid::tick`]
//! rebuilds each dirty chunk once and then releases queued [`GridEvent`]s.

mod edit;
mod persistence;
mod search;
mod shader_data;
mod units;

pub use persistence::{MAP_FILE_VERSION, MapError};
pub use shader_data::CellShaderData;
pub use units::{HexUnit, UnitId, VISION_RANGE};

use std::collections::BTreeSet;
use std::fmt;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cell::HexCell;
use crate::chunk::{ChunkGeometry, ChunkTriangulator};
use crate::coordinates::{HexCoordinates, HexDirection};
use crate::frontier::PriorityFrontier;
use crate::list_pool::ListPool;
use crate::metrics::{self, CHUNK_SIZE_X, CHUNK_SIZE_Z, HexMetrics, NoiseField};

/// Map dimensions and seeds.
#[derive(Clone, Debug, Reflect)]
pub struct MapSettings {
    /// Cells per row; a positive multiple of [`CHUNK_SIZE_X`].
    pub cell_count_x: usize,
    /// Rows; a positive multiple of [`CHUNK_SIZE_Z`].
    pub cell_count_z: usize,
    /// Seed of the hash grid and the shared random stream.
    pub seed: u64,
    /// Seed of the Perlin noise field.
    pub noise_seed: u32,
    /// Side length of the noise table in texels.
    pub noise_resolution: usize,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            cell_count_x: 20,
            cell_count_z: 15,
            seed: 1234,
            noise_seed: 1,
            noise_resolution: NoiseField::DEFAULT_RESOLUTION,
        }
    }
}

/// Notifications released by [`HexGrid::tick`] after the rebuild they
/// describe has completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridEvent {
    /// A fresh map was created.
    MapCreated {
        /// Cells per row.
        cell_count_x: usize,
        /// Rows.
        cell_count_z: usize,
    },
    /// A saved map replaced the current one.
    MapLoaded {
        /// Cells per row.
        cell_count_x: usize,
        /// Rows.
        cell_count_z: usize,
        /// Units restored from the file.
        units: usize,
    },
}

/// Errors from grid construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Dimensions are zero or not a multiple of the chunk size.
    InvalidMapSize {
        /// Requested cells per row.
        x: usize,
        /// Requested rows.
        z: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::InvalidMapSize { x, z } => write!(
                f,
                "Invalid map size {x}x{z}: both sides must be positive multiples of \
                 {CHUNK_SIZE_X}x{CHUNK_SIZE_Z}"
            ),
        }
    }
}

impl std::error::Error for GridError {}

/// Whether `x × z` is an acceptable map size.
pub fn is_valid_map_size(x: usize, z: usize) -> bool {
    x > 0 && x % CHUNK_SIZE_X == 0 && z > 0 && z % CHUNK_SIZE_Z == 0
}

/// A block of `CHUNK_SIZE_X × CHUNK_SIZE_Z` cells triangulated together.
#[derive(Clone, Debug, Default)]
pub struct HexGridChunk {
    cells: Vec<usize>,
    geometry: Option<ChunkGeometry>,
}

impl HexGridChunk {
    /// Cell indices in local row-major order.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Geometry from the latest rebuild, `None` before the first tick.
    pub fn geometry(&self) -> Option<&ChunkGeometry> {
        self.geometry.as_ref()
    }
}

/// Result of the most recent [`HexGrid::find_path`].
///
/// The path is copied out of the search scratch when found, so later walks
/// over the same scratch fields leave it intact.
#[derive(Clone, Debug, Default)]
struct CurrentPath {
    from: usize,
    to: usize,
    /// Cell and cost of every step from start to goal; empty when unreachable.
    steps: Vec<(usize, i32)>,
}

/// Hex cell arena with chunked mesh rebuilds.
pub struct HexGrid {
    cell_count_x: usize,
    cell_count_z: usize,
    chunk_count_x: usize,
    chunk_count_z: usize,
    cells: Vec<HexCell>,
    chunks: Vec<HexGridChunk>,
    units: Vec<HexUnit>,
    next_unit_id: u32,
    dirty_chunks: BTreeSet<usize>,
    frontier: PriorityFrontier,
    search_phase: u32,
    current_path: Option<CurrentPath>,
    pending_events: Vec<GridEvent>,
    events: Vec<GridEvent>,
    shader_data: CellShaderData,
    cell_lists: ListPool<usize>,
    metrics: HexMetrics,
    rng: ChaCha8Rng,
}

impl HexGrid {
    /// Builds the metrics tables and creates the initial map.
    pub fn new(settings: &MapSettings) -> Result<Self, GridError> {
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let metrics = HexMetrics::new(
            settings.seed,
            settings.noise_seed,
            settings.noise_resolution,
            &mut rng,
        );
        let mut grid = Self {
            cell_count_x: 0,
            cell_count_z: 0,
            chunk_count_x: 0,
            chunk_count_z: 0,
            cells: Vec::new(),
            chunks: Vec::new(),
            units: Vec::new(),
            next_unit_id: 0,
            dirty_chunks: BTreeSet::new(),
            frontier: PriorityFrontier::new(),
            search_phase: 0,
            current_path: None,
            pending_events: Vec::new(),
            events: Vec::new(),
            shader_data: CellShaderData::default(),
            cell_lists: ListPool::default(),
            metrics,
            rng,
        };
        grid.create_map(settings.cell_count_x, settings.cell_count_z)?;
        Ok(grid)
    }

    /// Replaces every cell with a flat, empty map of `x × z` cells.
    ///
    /// Fails without touching the grid when the size is invalid.
    pub fn create_map(&mut self, x: usize, z: usize) -> Result<(), GridError> {
        if !is_valid_map_size(x, z) {
            error!("Invalid map size {x}x{z}");
            return Err(GridError::InvalidMapSize { x, z });
        }
        self.build_cells(x, z);
        self.pending_events.push(GridEvent::MapCreated {
            cell_count_x: x,
            cell_count_z: z,
        });
        info!(
            "Created {x}x{z} map ({} chunks)",
            self.chunk_count_x * self.chunk_count_z
        );
        Ok(())
    }

    /// Allocates cells and chunks for a valid size.
    fn build_cells(&mut self, x: usize, z: usize) {
        self.clear_path();
        self.clear_units();

        self.cell_count_x = x;
        self.cell_count_z = z;
        self.chunk_count_x = x / CHUNK_SIZE_X;
        self.chunk_count_z = z / CHUNK_SIZE_Z;

        self.chunks = vec![HexGridChunk::default(); self.chunk_count_x * self.chunk_count_z];
        self.cells = Vec::with_capacity(x * z);
        for row in 0..z {
            for col in 0..x {
                self.create_cell(col, row);
            }
        }

        self.shader_data.reset(x, z);
        self.dirty_chunks = (0..self.chunks.len()).collect();
    }

    fn create_cell(&mut self, col: usize, row: usize) {
        let index = self.cells.len();
        let chunk = col / CHUNK_SIZE_X + (row / CHUNK_SIZE_Z) * self.chunk_count_x;
        let mut position = metrics::cell_center(col as i32, row as i32);
        position.y = metrics::elevation_height(0) + self.metrics.elevation_perturbation(position);

        let coordinates = HexCoordinates::from_offset(col as i32, row as i32);
        self.cells.push(HexCell::new(index, coordinates, chunk, position));
        self.chunks[chunk].cells.push(index);

        let width = self.cell_count_x;
        if col > 0 {
            self.set_neighbor(index, HexDirection::W, index - 1);
        }
        if row > 0 {
            if row % 2 == 0 {
                self.set_neighbor(index, HexDirection::NE, index - width);
                if col > 0 {
                    self.set_neighbor(index, HexDirection::NW, index - width - 1);
                }
            } else {
                self.set_neighbor(index, HexDirection::NW, index - width);
                if col < width - 1 {
                    self.set_neighbor(index, HexDirection::NE, index - width + 1);
                }
            }
        }
    }

    fn set_neighbor(&mut self, index: usize, direction: HexDirection, other: usize) {
        self.cells[index].neighbors[direction.index()] = Some(other);
        self.cells[other].neighbors[direction.opposite().index()] = Some(index);
    }

    // ── Rebuild ─────────────────────────────────────────────────────

    /// Rebuilds every dirty chunk once and returns their indices in order.
    ///
    /// Events queued before this call become visible to
    /// [`Self::drain_events`] afterwards.
    pub fn tick(&mut self) -> Vec<usize> {
        let rebuilt: Vec<usize> = std::mem::take(&mut self.dirty_chunks).into_iter().collect();
        for &chunk in &rebuilt {
            let geometry = ChunkTriangulator::new(self).triangulate(&self.chunks[chunk].cells);
            self.chunks[chunk].geometry = Some(geometry);
        }
        if !rebuilt.is_empty() {
            debug!("Rebuilt {} chunk(s)", rebuilt.len());
        }
        self.events.append(&mut self.pending_events);
        rebuilt
    }

    /// Takes all released events.
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    /// Chunks awaiting a rebuild.
    pub fn dirty_chunks(&self) -> impl Iterator<Item = usize> + '_ {
        self.dirty_chunks.iter().copied()
    }

    /// Marks the cell's chunk and every neighboring chunk dirty.
    pub(crate) fn refresh(&mut self, index: usize) {
        let cell = &self.cells[index];
        self.dirty_chunks.insert(cell.chunk);
        for neighbor in cell.neighbors.into_iter().flatten() {
            self.dirty_chunks.insert(self.cells[neighbor].chunk);
        }
    }

    /// Marks only the cell's own chunk dirty.
    pub(crate) fn refresh_self_only(&mut self, index: usize) {
        self.dirty_chunks.insert(self.cells[index].chunk);
    }

    fn mark_all_dirty(&mut self) {
        self.dirty_chunks = (0..self.chunks.len()).collect();
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// Cells per row.
    pub fn cell_count_x(&self) -> usize {
        self.cell_count_x
    }

    /// Rows.
    pub fn cell_count_z(&self) -> usize {
        self.cell_count_z
    }

    /// Chunks per row.
    pub fn chunk_count_x(&self) -> usize {
        self.chunk_count_x
    }

    /// Chunk rows.
    pub fn chunk_count_z(&self) -> usize {
        self.chunk_count_z
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// Cell by index.
    pub fn cell(&self, index: usize) -> Option<&HexCell> {
        self.cells.get(index)
    }

    /// Neighbor of `index` in `direction`.
    pub fn neighbor(&self, index: usize, direction: HexDirection) -> Option<&HexCell> {
        self.cells[index].neighbor(direction).map(|n| &self.cells[n])
    }

    /// All chunks in row-major order.
    pub fn chunks(&self) -> &[HexGridChunk] {
        &self.chunks
    }

    /// Latest geometry of a chunk.
    pub fn chunk_geometry(&self, chunk: usize) -> Option<&ChunkGeometry> {
        self.chunks.get(chunk).and_then(HexGridChunk::geometry)
    }

    /// Cell at a cube coordinate; `None` outside the map.
    pub fn cell_at_coordinates(&self, coordinates: HexCoordinates) -> Option<usize> {
        coordinates.to_cell_index(self.cell_count_x, self.cell_count_z)
    }

    /// Cell containing a world position; `None` outside the map.
    pub fn cell_at_position(&self, position: Vec3) -> Option<usize> {
        self.cell_at_coordinates(HexCoordinates::from_position(position))
    }

    /// First terrain cell hit by a ray.
    ///
    /// Tests the terrain colliders of every built chunk and resolves the
    /// nearest hit point with [`Self::cell_at_position`].
    pub fn cell_at_ray(&self, origin: Vec3, direction: Vec3) -> Option<usize> {
        let distance = self
            .chunks
            .iter()
            .filter_map(HexGridChunk::geometry)
            .filter_map(|geometry| geometry.terrain.raycast(origin, direction))
            .min_by(f32::total_cmp)?;
        self.cell_at_position(origin + direction * distance)
    }

    /// Seeded noise field and hash grid.
    pub fn metrics(&self) -> &HexMetrics {
        &self.metrics
    }

    /// Per-cell shading texels.
    pub fn shader_data(&self) -> &CellShaderData {
        &self.shader_data
    }

    /// Mutable shading texels, for hosts that consume the change flag.
    pub fn shader_data_mut(&mut self) -> &mut CellShaderData {
        &mut self.shader_data
    }

    /// The shared random stream.
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Returns a list obtained from [`Self::path_cells`] or
    /// [`Self::visible_cells`] to the pool.
    pub fn recycle_cell_list(&mut self, list: Vec<usize>) {
        self.cell_lists.add(list);
    }
}
