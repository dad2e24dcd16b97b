//! River channels carved into cells, and the water flowing in them.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::metrics::{self, EdgeVertices, INNER_TO_OUTER};

use super::{ChunkTriangulator, WEIGHTS1, cell_indices};

impl<'a> ChunkTriangulator<'a> {
    /// Sixth of a cell with the river running through its edge and on
    /// through the cell.
    pub(super) fn triangulate_with_river(
        &mut self,
        direction: HexDirection,
        cell: &'a HexCell,
        mut center: Vec3,
        e: EdgeVertices,
    ) {
        let (center_l, center_r) = if cell.has_river_through_edge(direction.opposite()) {
            (
                center + metrics::first_solid_corner(direction.previous()) * 0.25,
                center + metrics::second_solid_corner(direction.next()) * 0.25,
            )
        } else if cell.has_river_through_edge(direction.next()) {
            (center, center.lerp(e.v5, 2.0 / 3.0))
        } else if cell.has_river_through_edge(direction.previous()) {
            (center.lerp(e.v1, 2.0 / 3.0), center)
        } else if cell.has_river_through_edge(direction.next2()) {
            (
                center,
                center + metrics::solid_edge_middle(direction.next()) * (0.5 * INNER_TO_OUTER),
            )
        } else {
            (
                center + metrics::solid_edge_middle(direction.previous()) * (0.5 * INNER_TO_OUTER),
                center,
            )
        };

        let mut m = EdgeVertices::with_outer_step(
            center_l.lerp(e.v1, 0.5),
            center_r.lerp(e.v5, 0.5),
            1.0 / 6.0,
        );
        center.y = e.v3.y;
        m.v3.y = e.v3.y;

        let index = cell.index();
        self.triangulate_edge_strip(&m, WEIGHTS1, index, &e, WEIGHTS1, index, false);

        let indices = cell_indices(index, index, index);
        self.terrain.add_triangle(center_l, m.v1, m.v2);
        self.terrain.add_triangle_cell_data_uniform(indices, WEIGHTS1);
        self.terrain.add_quad(center_l, center, m.v2, m.v3);
        self.terrain.add_quad_cell_data_uniform(indices, WEIGHTS1);
        self.terrain.add_quad(center, center_r, m.v3, m.v4);
        self.terrain.add_quad_cell_data_uniform(indices, WEIGHTS1);
        self.terrain.add_triangle(center_r, m.v4, m.v5);
        self.terrain.add_triangle_cell_data_uniform(indices, WEIGHTS1);

        if !cell.is_underwater() {
            let reversed = cell.incoming_river() == Some(direction);
            let y = cell.river_surface_y();
            self.triangulate_river_quad([center_l, center_r, m.v2, m.v4], y, y, 0.4, reversed);
            self.triangulate_river_quad([m.v2, m.v4, e.v2, e.v4], y, y, 0.6, reversed);
        }
    }

    /// Sixth of a cell where a river starts or ends.
    pub(super) fn triangulate_with_river_begin_or_end(
        &mut self,
        cell: &'a HexCell,
        mut center: Vec3,
        e: EdgeVertices,
    ) {
        let mut m = EdgeVertices::new(center.lerp(e.v1, 0.5), center.lerp(e.v5, 0.5));
        m.v3.y = e.v3.y;

        let index = cell.index();
        self.triangulate_edge_strip(&m, WEIGHTS1, index, &e, WEIGHTS1, index, false);
        self.triangulate_edge_fan(center, &m, index);

        if cell.is_underwater() {
            return;
        }

        let y = cell.river_surface_y();
        center.y = y;
        m.v2.y = y;
        m.v4.y = y;
        let reversed = cell.incoming_river().is_some();
        self.triangulate_river_quad([m.v2, m.v4, e.v2, e.v4], y, y, 0.6, reversed);
        self.rivers.add_triangle(center, m.v2, m.v4);
        if reversed {
            self.rivers.add_triangle_uv(
                Vec2::new(0.5, 0.4),
                Vec2::new(1.0, 0.2),
                Vec2::new(0.0, 0.2),
            );
        } else {
            self.rivers.add_triangle_uv(
                Vec2::new(0.5, 0.4),
                Vec2::new(0.0, 0.6),
                Vec2::new(1.0, 0.6),
            );
        }
    }

    /// Sixth of a cell that holds a river elsewhere; the center is pulled
    /// away from the channel.
    pub(super) fn triangulate_adjacent_to_river(
        &mut self,
        direction: HexDirection,
        cell: &'a HexCell,
        mut center: Vec3,
        e: EdgeVertices,
    ) {
        if cell.has_roads() {
            self.triangulate_road_adjacent_to_river(direction, cell, center, &e);
        }

        if cell.has_river_through_edge(direction.next()) {
            if cell.has_river_through_edge(direction.previous()) {
                center += metrics::solid_edge_middle(direction) * (INNER_TO_OUTER * 0.5);
            } else if cell.has_river_through_edge(direction.previous2()) {
                center += metrics::first_solid_corner(direction) * 0.25;
            }
        } else if cell.has_river_through_edge(direction.previous())
            && cell.has_river_through_edge(direction.next2())
        {
            center += metrics::second_solid_corner(direction) * 0.25;
        }

        let m = EdgeVertices::new(center.lerp(e.v1, 0.5), center.lerp(e.v5, 0.5));
        let index = cell.index();
        self.triangulate_edge_strip(&m, WEIGHTS1, index, &e, WEIGHTS1, index, false);
        self.triangulate_edge_fan(center, &m, index);

        if !cell.is_underwater() && !cell.has_road_through_edge(direction) {
            self.features
                .add_feature(cell, (center + e.v1 + e.v5) * (1.0 / 3.0));
        }
    }

    /// River surface quad from the `v1 v2` line (height `y1`) to `v3 v4`
    /// (height `y2`); V advances 0.2 along the flow.
    pub(super) fn triangulate_river_quad(
        &mut self,
        [v1, v2, v3, v4]: [Vec3; 4],
        y1: f32,
        y2: f32,
        v: f32,
        reversed: bool,
    ) {
        self.rivers.add_quad(
            v1.with_y(y1),
            v2.with_y(y1),
            v3.with_y(y2),
            v4.with_y(y2),
        );
        if reversed {
            self.rivers.add_quad_uv_rect(1.0, 0.0, 0.8 - v, 0.6 - v);
        } else {
            self.rivers.add_quad_uv_rect(0.0, 1.0, v, v + 0.2);
        }
    }

    /// River dropping into standing water, cut off at the water surface.
    pub(super) fn triangulate_waterfall_in_water(
        &mut self,
        [v1, v2, v3, v4]: [Vec3; 4],
        y1: f32,
        y2: f32,
        water_y: f32,
    ) {
        let m = self.metrics;
        let v1 = m.perturb(v1.with_y(y1));
        let v2 = m.perturb(v2.with_y(y1));
        let v3 = m.perturb(v3.with_y(y2));
        let v4 = m.perturb(v4.with_y(y2));

        let t = (water_y - y2) / (y1 - y2);
        self.rivers
            .add_quad_unperturbed(v1, v2, v3.lerp(v1, t), v4.lerp(v2, t));
        self.rivers.add_quad_uv_rect(0.0, 1.0, 0.8, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::test_grid;

    const CENTER: usize = 7 * 20 + 10;

    #[test]
    fn river_surface_sits_below_banks() {
        let mut grid = test_grid();
        grid.set_elevation(CENTER, 2);
        let east = grid.cells()[CENTER].neighbor(HexDirection::E).unwrap();
        grid.set_elevation(east, 2);
        assert!(grid.set_outgoing_river(CENTER, HexDirection::E));
        let chunk = grid.cells()[CENTER].chunk();
        let geometry = ChunkTriangulator::new(&grid).triangulate(grid.chunks()[chunk].cells());

        let surface = grid.cells()[CENTER].river_surface_y();
        assert!(geometry.rivers.positions.iter().all(|p| (p.y - surface).abs() < 1e-5));
        let lowest_ground = geometry
            .terrain
            .positions
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min);
        assert!(lowest_ground < surface, "the bed is carved below the surface");
    }

    #[test]
    fn waterfall_into_lake() {
        let mut grid = test_grid();
        let east = grid.cells()[CENTER].neighbor(HexDirection::E).unwrap();
        grid.set_elevation(CENTER, 4);
        grid.set_elevation(east, 1);
        grid.set_water_level(east, 2);
        assert!(grid.set_outgoing_river(CENTER, HexDirection::E));
        let chunk = grid.cells()[CENTER].chunk();
        let geometry = ChunkTriangulator::new(&grid).triangulate(grid.chunks()[chunk].cells());

        let water_y = grid.cells()[east].water_surface_y();
        let lowest = geometry
            .rivers
            .positions
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min);
        assert!((lowest - water_y).abs() < 1e-4, "waterfall stops at {water_y}, got {lowest}");
    }
}
