//! Standing water: open surfaces, shores and river mouths.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::metrics::{self, EdgeVertices};

use super::ChunkTriangulator;

impl<'a> ChunkTriangulator<'a> {
    pub(super) fn triangulate_water(&mut self, direction: HexDirection, cell: &'a HexCell, mut center: Vec3) {
        center.y = cell.water_surface_y();
        match self.neighbor(cell, direction) {
            Some(neighbor) if !neighbor.is_underwater() => {
                self.triangulate_water_shore(direction, cell, neighbor, center);
            }
            neighbor => self.triangulate_open_water(direction, cell, neighbor, center),
        }
    }

    fn triangulate_open_water(
        &mut self,
        direction: HexDirection,
        cell: &'a HexCell,
        neighbor: Option<&'a HexCell>,
        center: Vec3,
    ) {
        let c1 = center + metrics::first_water_corner(direction);
        let c2 = center + metrics::second_water_corner(direction);
        self.water.add_triangle(center, c1, c2);

        if direction < HexDirection::NE || neighbor.is_none() {
            return;
        }
        let bridge = metrics::water_bridge(direction);
        let (e1, e2) = (c1 + bridge, c2 + bridge);
        self.water.add_quad(c1, c2, e1, e2);

        if direction <= HexDirection::E {
            let Some(next) = self.neighbor(cell, direction.next()) else {
                return;
            };
            if !next.is_underwater() {
                return;
            }
            self.water
                .add_triangle(c2, e2, c2 + metrics::water_bridge(direction.next()));
        }
    }

    fn triangulate_water_shore(
        &mut self,
        direction: HexDirection,
        cell: &'a HexCell,
        neighbor: &'a HexCell,
        center: Vec3,
    ) {
        let e1 = EdgeVertices::new(
            center + metrics::first_water_corner(direction),
            center + metrics::second_water_corner(direction),
        );
        for (a, b) in super::edge_pairs(&e1) {
            self.water.add_triangle(center, a, b);
        }

        let center2 = neighbor.position().with_y(center.y);
        let e2 = EdgeVertices::new(
            center2 + metrics::second_solid_corner(direction.opposite()),
            center2 + metrics::first_solid_corner(direction.opposite()),
        );

        if cell.has_river_through_edge(direction) {
            self.triangulate_estuary(&e1, &e2, cell.incoming_river() == Some(direction));
        } else {
            for ((a1, b1), (a2, b2)) in super::edge_pairs(&e1).into_iter().zip(super::edge_pairs(&e2)) {
                self.water_shore.add_quad(a1, b1, a2, b2);
                self.water_shore.add_quad_uv_rect(0.0, 0.0, 0.0, 1.0);
            }
        }

        let Some(next) = self.neighbor(cell, direction.next()) else {
            return;
        };
        let corner = if next.is_underwater() {
            metrics::first_water_corner(direction.previous())
        } else {
            metrics::first_solid_corner(direction.previous())
        };
        let v3 = (next.position() + corner).with_y(center.y);
        self.water_shore.add_triangle(e1.v5, e2.v5, v3);
        self.water_shore.add_triangle_uv(
            Vec2::ZERO,
            Vec2::Y,
            Vec2::new(0.0, if next.is_underwater() { 0.0 } else { 1.0 }),
        );
    }

    /// Where a river meets the shore. UV2 describes the river's flow out
    /// into the water, mirrored when the river flows into the lake cell.
    fn triangulate_estuary(&mut self, e1: &EdgeVertices, e2: &EdgeVertices, incoming_river: bool) {
        self.water_shore.add_triangle(e2.v1, e1.v2, e1.v1);
        self.water_shore.add_triangle(e2.v5, e1.v5, e1.v4);
        self.water_shore
            .add_triangle_uv(Vec2::Y, Vec2::ZERO, Vec2::ZERO);
        self.water_shore
            .add_triangle_uv(Vec2::Y, Vec2::ZERO, Vec2::ZERO);

        self.estuaries.add_quad(e2.v1, e1.v2, e2.v2, e1.v3);
        self.estuaries.add_triangle(e1.v3, e2.v2, e2.v4);
        self.estuaries.add_quad(e1.v3, e1.v4, e2.v4, e2.v5);

        self.estuaries
            .add_quad_uv(Vec2::Y, Vec2::ZERO, Vec2::ONE, Vec2::ZERO);
        self.estuaries
            .add_triangle_uv(Vec2::ZERO, Vec2::ONE, Vec2::ONE);
        self.estuaries
            .add_quad_uv(Vec2::ZERO, Vec2::ZERO, Vec2::ONE, Vec2::Y);

        if incoming_river {
            self.estuaries.add_quad_uv2(
                Vec2::new(1.5, 1.0),
                Vec2::new(0.7, 1.15),
                Vec2::new(1.0, 0.8),
                Vec2::new(0.5, 1.1),
            );
            self.estuaries.add_triangle_uv2(
                Vec2::new(0.5, 1.1),
                Vec2::new(1.0, 0.8),
                Vec2::new(0.0, 0.8),
            );
            self.estuaries.add_quad_uv2(
                Vec2::new(0.5, 1.1),
                Vec2::new(0.3, 1.15),
                Vec2::new(0.0, 0.8),
                Vec2::new(-0.5, 1.0),
            );
        } else {
            self.estuaries.add_quad_uv2(
                Vec2::new(-0.5, -0.2),
                Vec2::new(0.3, -0.35),
                Vec2::ZERO,
                Vec2::new(0.5, -0.3),
            );
            self.estuaries.add_triangle_uv2(
                Vec2::new(0.5, -0.3),
                Vec2::ZERO,
                Vec2::X,
            );
            self.estuaries.add_quad_uv2(
                Vec2::new(0.5, -0.3),
                Vec2::new(0.7, -0.35),
                Vec2::X,
                Vec2::new(1.5, -0.2),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkGeometry;
    use crate::grid::tests::test_grid;

    const CENTER: usize = 7 * 20 + 10;

    fn flood(cells: &[usize]) -> ChunkGeometry {
        let mut grid = test_grid();
        for &index in cells {
            grid.set_water_level(index, 1);
        }
        let chunk = grid.cells()[CENTER].chunk();
        ChunkTriangulator::new(&grid).triangulate(grid.chunks()[chunk].cells())
    }

    #[test]
    fn lone_lake_is_all_shore() {
        let geometry = flood(&[CENTER]);
        // Four fan triangles per side.
        assert_eq!(geometry.water.triangle_count(), 6 * 4);
        assert!(!geometry.water_shore.is_empty());
    }

    #[test]
    fn water_surface_is_level() {
        let geometry = flood(&[CENTER, CENTER + 1, CENTER - 1]);
        let y = geometry.water.positions[0].y;
        assert!(geometry.water.positions.iter().all(|p| p.y == y));
        assert!(geometry.water_shore.positions.iter().all(|p| p.y == y));
    }

    #[test]
    fn joined_lakes_bridge_with_open_water() {
        let lone = flood(&[CENTER]).water.triangle_count();
        let pair = flood(&[CENTER, CENTER + 1]).water.triangle_count();
        // Each cell loses four shore triangles toward the other and gains a
        // single open one; the west cell also builds the connecting quad.
        assert_eq!(pair, 2 * lone - 2 * 4 + 2 + 2);
    }
}
