//! Chunk triangulation.
//!
//! [`ChunkTriangulator`] walks the cells of one chunk and emits every render
//! layer: terrain with cell blend data, river and road strips, open water,
//! shore and estuary water, walls and feature placements. It only reads the
//! grid, so a chunk can be rebuilt without touching its neighbors.
//!
//! Each cell owns the solid hexagon inside its blend region. Connections
//! (the quads between two cells) are built by the cell on their west side,
//! for directions `NE..=SE`, and the triangle where three cells meet by the
//! cell whose `E`/`SE` connection borders it.

mod rivers;
mod roads;
mod terrain;
mod water;

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::features::{FeaturePlacement, FeatureScatterer};
use crate::grid::HexGrid;
use crate::mesh::{MeshBuilder, MeshLayerFlags, MeshSurface};
use crate::metrics::{self, EdgeVertices, HexEdgeType, HexMetrics};

/// Blend weight of the first cell in a vertex's cell-index triple.
const WEIGHTS1: Vec3 = Vec3::X;
/// Blend weight of the second cell.
const WEIGHTS2: Vec3 = Vec3::Y;
/// Blend weight of the third cell.
const WEIGHTS3: Vec3 = Vec3::Z;

/// All layers of one rebuilt chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkGeometry {
    /// Ground, with cell data and a collider.
    pub terrain: MeshSurface,
    /// River beds' water surface.
    pub rivers: MeshSurface,
    /// Road strips.
    pub roads: MeshSurface,
    /// Open water.
    pub water: MeshSurface,
    /// Water meeting land.
    pub water_shore: MeshSurface,
    /// River mouths.
    pub estuaries: MeshSurface,
    /// Wall geometry.
    pub walls: MeshSurface,
    /// Props to instantiate.
    pub features: Vec<FeaturePlacement>,
}

/// Builds [`ChunkGeometry`] for a set of cells.
pub struct ChunkTriangulator<'a> {
    cells: &'a [HexCell],
    metrics: &'a HexMetrics,
    terrain: MeshBuilder<'a>,
    rivers: MeshBuilder<'a>,
    roads: MeshBuilder<'a>,
    water: MeshBuilder<'a>,
    water_shore: MeshBuilder<'a>,
    estuaries: MeshBuilder<'a>,
    features: FeatureScatterer<'a>,
}

impl<'a> ChunkTriangulator<'a> {
    /// Empty layers reading cells and metrics from `grid`.
    pub fn new(grid: &'a HexGrid) -> Self {
        let metrics = grid.metrics();
        Self {
            cells: grid.cells(),
            metrics,
            terrain: MeshBuilder::new(metrics, MeshLayerFlags::TERRAIN),
            rivers: MeshBuilder::new(metrics, MeshLayerFlags::TEXTURED),
            roads: MeshBuilder::new(metrics, MeshLayerFlags::TEXTURED),
            water: MeshBuilder::new(metrics, MeshLayerFlags::PLAIN),
            water_shore: MeshBuilder::new(metrics, MeshLayerFlags::TEXTURED),
            estuaries: MeshBuilder::new(metrics, MeshLayerFlags::ESTUARIES),
            features: FeatureScatterer::new(metrics),
        }
    }

    /// Triangulates `cells` (indices into the grid) in order.
    pub fn triangulate(mut self, cells: &[usize]) -> ChunkGeometry {
        let all = self.cells;
        for &index in cells {
            self.triangulate_cell(&all[index]);
        }
        let (walls, features) = self.features.finish();
        ChunkGeometry {
            terrain: self.terrain.commit(),
            rivers: self.rivers.commit(),
            roads: self.roads.commit(),
            water: self.water.commit(),
            water_shore: self.water_shore.commit(),
            estuaries: self.estuaries.commit(),
            walls,
            features,
        }
    }

    fn neighbor(&self, cell: &HexCell, direction: HexDirection) -> Option<&'a HexCell> {
        let cells = self.cells;
        cell.neighbor(direction).map(|index| &cells[index])
    }

    fn triangulate_cell(&mut self, cell: &'a HexCell) {
        for direction in HexDirection::ALL {
            self.triangulate_direction(direction, cell);
        }

        if !cell.is_underwater() {
            if !cell.has_river() && !cell.has_roads() {
                self.features.add_feature(cell, cell.position());
            }
            if cell.is_special() {
                self.features.add_special_feature(cell, cell.position());
            }
        }
    }

    fn triangulate_direction(&mut self, direction: HexDirection, cell: &'a HexCell) {
        let center = cell.position();
        let mut e = EdgeVertices::new(
            center + metrics::first_solid_corner(direction),
            center + metrics::second_solid_corner(direction),
        );

        if cell.has_river() {
            if cell.has_river_through_edge(direction) {
                e.v3.y = cell.stream_bed_y();
                if cell.has_river_begin_or_end() {
                    self.triangulate_with_river_begin_or_end(cell, center, e);
                } else {
                    self.triangulate_with_river(direction, cell, center, e);
                }
            } else {
                self.triangulate_adjacent_to_river(direction, cell, center, e);
            }
        } else {
            self.triangulate_without_river(direction, cell, center, e);
            if !cell.is_underwater() && !cell.has_road_through_edge(direction) {
                self.features
                    .add_feature(cell, (center + e.v1 + e.v5) * (1.0 / 3.0));
            }
        }

        if direction >= HexDirection::NE {
            self.triangulate_connection(direction, cell, &e);
        }

        if cell.is_underwater() {
            self.triangulate_water(direction, cell, center);
        }
    }

    // ── Connections ─────────────────────────────────────────────────

    fn triangulate_connection(&mut self, direction: HexDirection, cell: &'a HexCell, e1: &EdgeVertices) {
        let Some(neighbor) = self.neighbor(cell, direction) else {
            return;
        };

        let mut bridge = metrics::bridge(direction);
        bridge.y = neighbor.position().y - cell.position().y;
        let mut e2 = EdgeVertices::new(e1.v1 + bridge, e1.v5 + bridge);

        let has_river = cell.has_river_through_edge(direction);
        let has_road = cell.has_road_through_edge(direction);

        if has_river {
            e2.v3.y = neighbor.stream_bed_y();
            if !cell.is_underwater() {
                if !neighbor.is_underwater() {
                    self.triangulate_river_quad(
                        [e1.v2, e1.v4, e2.v2, e2.v4],
                        cell.river_surface_y(),
                        neighbor.river_surface_y(),
                        0.8,
                        cell.incoming_river() == Some(direction),
                    );
                } else if cell.elevation() > neighbor.elevation() {
                    self.triangulate_waterfall_in_water(
                        [e1.v2, e1.v4, e2.v2, e2.v4],
                        cell.river_surface_y(),
                        neighbor.river_surface_y(),
                        neighbor.water_surface_y(),
                    );
                }
            } else if !neighbor.is_underwater() && neighbor.elevation() > cell.elevation() {
                self.triangulate_waterfall_in_water(
                    [e2.v4, e2.v2, e1.v4, e1.v2],
                    neighbor.river_surface_y(),
                    cell.river_surface_y(),
                    cell.water_surface_y(),
                );
            }
        }

        if cell.edge_type_to(neighbor) == HexEdgeType::Slope {
            self.triangulate_edge_terraces(e1, cell, &e2, neighbor, has_road);
        } else {
            self.triangulate_edge_strip(
                e1,
                WEIGHTS1,
                cell.index(),
                &e2,
                WEIGHTS2,
                neighbor.index(),
                has_road,
            );
        }

        self.features
            .add_wall_edge(e1, cell, &e2, neighbor, has_river, has_road);

        if direction < HexDirection::E {
            return;
        }
        let Some(next_neighbor) = self.neighbor(cell, direction.next()) else {
            return;
        };
        let mut v5 = e1.v5 + metrics::bridge(direction.next());
        v5.y = next_neighbor.position().y;

        if cell.elevation() <= neighbor.elevation() {
            if cell.elevation() <= next_neighbor.elevation() {
                self.triangulate_corner(e1.v5, cell, e2.v5, neighbor, v5, next_neighbor);
            } else {
                self.triangulate_corner(v5, next_neighbor, e1.v5, cell, e2.v5, neighbor);
            }
        } else if neighbor.elevation() <= next_neighbor.elevation() {
            self.triangulate_corner(e2.v5, neighbor, v5, next_neighbor, e1.v5, cell);
        } else {
            self.triangulate_corner(v5, next_neighbor, e1.v5, cell, e2.v5, neighbor);
        }
    }

    /// Fills the triangle where three cells meet; `bottom` is the lowest.
    fn triangulate_corner(
        &mut self,
        bottom: Vec3,
        bottom_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let left_edge = bottom_cell.edge_type_to(left_cell);
        let right_edge = bottom_cell.edge_type_to(right_cell);

        match (left_edge, right_edge) {
            (HexEdgeType::Slope, HexEdgeType::Slope) => {
                self.triangulate_corner_terraces(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            (HexEdgeType::Slope, HexEdgeType::Flat) => {
                self.triangulate_corner_terraces(left, left_cell, right, right_cell, bottom, bottom_cell);
            }
            (HexEdgeType::Slope, HexEdgeType::Cliff) => {
                self.triangulate_corner_terraces_cliff(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            (HexEdgeType::Flat, HexEdgeType::Slope) => {
                self.triangulate_corner_terraces(right, right_cell, bottom, bottom_cell, left, left_cell);
            }
            (HexEdgeType::Cliff, HexEdgeType::Slope) => {
                self.triangulate_corner_cliff_terraces(bottom, bottom_cell, left, left_cell, right, right_cell);
            }
            _ if left_cell.edge_type_to(right_cell) == HexEdgeType::Slope => {
                if left_cell.elevation() > right_cell.elevation() {
                    self.triangulate_corner_terraces_cliff(
                        left, left_cell, right, right_cell, bottom, bottom_cell,
                    );
                } else {
                    self.triangulate_corner_cliff_terraces(
                        right, right_cell, bottom, bottom_cell, left, left_cell,
                    );
                }
            }
            _ => {
                self.terrain.add_triangle(bottom, left, right);
                self.terrain.add_triangle_cell_data(
                    cell_indices(bottom_cell.index(), left_cell.index(), right_cell.index()),
                    WEIGHTS1,
                    WEIGHTS2,
                    WEIGHTS3,
                );
            }
        }

        self.features
            .add_wall_corner(bottom, bottom_cell, left, left_cell, right, right_cell);
    }

    // ── Shared strips ───────────────────────────────────────────────

    fn triangulate_edge_fan(&mut self, center: Vec3, edge: &EdgeVertices, index: usize) {
        let indices = cell_indices(index, index, index);
        for (a, b) in edge_pairs(edge) {
            self.terrain.add_triangle(center, a, b);
            self.terrain.add_triangle_cell_data_uniform(indices, WEIGHTS1);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn triangulate_edge_strip(
        &mut self,
        e1: &EdgeVertices,
        w1: Vec3,
        index1: usize,
        e2: &EdgeVertices,
        w2: Vec3,
        index2: usize,
        has_road: bool,
    ) {
        let indices = cell_indices(index1, index2, index1);
        for ((a1, b1), (a2, b2)) in edge_pairs(e1).into_iter().zip(edge_pairs(e2)) {
            self.terrain.add_quad(a1, b1, a2, b2);
            self.terrain.add_quad_cell_data_pair(indices, w1, w2);
        }

        if has_road {
            self.triangulate_road_segment([e1.v2, e1.v3, e1.v4], [e2.v2, e2.v3, e2.v4]);
        }
    }
}

/// Cell-index triple stored per vertex.
fn cell_indices(a: usize, b: usize, c: usize) -> Vec3 {
    Vec3::new(a as f32, b as f32, c as f32)
}

/// The four consecutive point pairs along an edge.
fn edge_pairs(e: &EdgeVertices) -> [(Vec3, Vec3); 4] {
    [(e.v1, e.v2), (e.v2, e.v3), (e.v3, e.v4), (e.v4, e.v5)]
}
