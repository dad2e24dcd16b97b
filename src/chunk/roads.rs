//! Road strips, including roads that have to dodge a river.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::metrics::{self, EdgeVertices, INNER_TO_OUTER};

use super::ChunkTriangulator;

impl<'a> ChunkTriangulator<'a> {
    /// Two quads across a connection; U runs 0 at the edges to 1 in the
    /// middle of the road.
    pub(super) fn triangulate_road_segment(&mut self, near: [Vec3; 3], far: [Vec3; 3]) {
        let [v1, v2, v3] = near;
        let [v4, v5, v6] = far;
        self.roads.add_quad(v1, v2, v4, v5);
        self.roads.add_quad_uv_rect(0.0, 1.0, 0.0, 0.0);
        self.roads.add_quad(v2, v3, v5, v6);
        self.roads.add_quad_uv_rect(1.0, 0.0, 0.0, 0.0);
    }

    /// Road inside one sixth of a cell, from `center` out to `e` or ending
    /// at the `m_l`..`m_r` line.
    pub(super) fn triangulate_road(
        &mut self,
        center: Vec3,
        m_l: Vec3,
        m_r: Vec3,
        e: &EdgeVertices,
        has_road_through_edge: bool,
    ) {
        if !has_road_through_edge {
            self.triangulate_road_edge(center, m_l, m_r);
            return;
        }

        let m_c = m_l.lerp(m_r, 0.5);
        self.triangulate_road_segment([m_l, m_c, m_r], [e.v2, e.v3, e.v4]);
        self.roads.add_triangle(center, m_l, m_c);
        self.roads
            .add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::ZERO, Vec2::new(1.0, 0.0));
        self.roads.add_triangle(center, m_c, m_r);
        self.roads
            .add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0), Vec2::ZERO);
    }

    pub(super) fn triangulate_road_edge(&mut self, center: Vec3, m_l: Vec3, m_r: Vec3) {
        self.roads.add_triangle(center, m_l, m_r);
        self.roads
            .add_triangle_uv(Vec2::new(1.0, 0.0), Vec2::ZERO, Vec2::ZERO);
    }

    /// Road piece of a cell a river flows through, pushed aside so it never
    /// crosses the water except over a bridge.
    pub(super) fn triangulate_road_adjacent_to_river(
        &mut self,
        direction: HexDirection,
        cell: &HexCell,
        center: Vec3,
        e: &EdgeVertices,
    ) {
        let has_road_through_edge = cell.has_road_through_edge(direction);
        let previous_has_river = cell.has_river_through_edge(direction.previous());
        let next_has_river = cell.has_river_through_edge(direction.next());
        let interpolators = road_interpolators(direction, cell);
        let mut road_center = center;
        let mut center = center;

        match (cell.incoming_river(), cell.outgoing_river()) {
            (Some(incoming), Some(outgoing)) if incoming == outgoing.opposite() => {
                // Straight river: keep to one bank.
                let corner = if previous_has_river {
                    if !has_road_through_edge && !cell.has_road_through_edge(direction.next()) {
                        return;
                    }
                    metrics::second_solid_corner(direction)
                } else {
                    if !has_road_through_edge && !cell.has_road_through_edge(direction.previous()) {
                        return;
                    }
                    metrics::first_solid_corner(direction)
                };
                road_center += corner * 0.5;
                if incoming == direction.next()
                    && (cell.has_road_through_edge(direction.next2())
                        || cell.has_road_through_edge(direction.opposite()))
                {
                    self.features
                        .add_bridge(road_center, center - corner * 0.5);
                }
                center += corner * 0.25;
            }
            (Some(incoming), Some(outgoing)) if incoming == outgoing.previous() => {
                road_center -= metrics::second_corner(incoming) * 0.2;
            }
            (Some(incoming), Some(outgoing)) if incoming == outgoing.next() => {
                road_center -= metrics::first_corner(incoming) * 0.2;
            }
            (Some(_), Some(_)) if previous_has_river && next_has_river => {
                // Inside of a curve.
                if !has_road_through_edge {
                    return;
                }
                let offset = metrics::solid_edge_middle(direction) * INNER_TO_OUTER;
                road_center += offset * 0.7;
                center += offset * 0.5;
            }
            (Some(_), Some(_)) => {
                // Outside of a curve.
                let middle = if previous_has_river {
                    direction.next()
                } else if next_has_river {
                    direction.previous()
                } else {
                    direction
                };
                if !cell.has_road_through_edge(middle)
                    && !cell.has_road_through_edge(middle.previous())
                    && !cell.has_road_through_edge(middle.next())
                {
                    return;
                }
                let offset = metrics::solid_edge_middle(middle);
                road_center += offset * 0.25;
                if direction == middle && cell.has_road_through_edge(direction.opposite()) {
                    self.features
                        .add_bridge(road_center, center - offset * (INNER_TO_OUTER * 0.7));
                }
            }
            (Some(end), None) | (None, Some(end)) => {
                road_center += metrics::solid_edge_middle(end.opposite()) * (1.0 / 3.0);
            }
            (None, None) => {}
        }

        let m_l = road_center.lerp(e.v1, interpolators.x);
        let m_r = road_center.lerp(e.v5, interpolators.y);
        self.triangulate_road(road_center, m_l, m_r, e, has_road_through_edge);

        if previous_has_river {
            self.triangulate_road_edge(road_center, center, m_l);
        }
        if next_has_river {
            self.triangulate_road_edge(road_center, m_r, center);
        }
    }
}

/// How far along the solid edge a road's side points sit.
///
/// A road through the edge runs down the middle; otherwise each side widens
/// toward a neighboring edge that also carries a road.
pub(super) fn road_interpolators(direction: HexDirection, cell: &HexCell) -> Vec2 {
    if cell.has_road_through_edge(direction) {
        return Vec2::splat(0.5);
    }
    let side = |d| if cell.has_road_through_edge(d) { 0.5 } else { 0.25 };
    Vec2::new(side(direction.previous()), side(direction.next()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::HexCoordinates;
    use crate::features::FeatureKind;
    use crate::grid::tests::test_grid;

    const CENTER: usize = 7 * 20 + 10;

    #[test]
    fn road_interpolators_widen_toward_roads() {
        let mut cell = HexCell::new(0, HexCoordinates::new(0, 0), 0, Vec3::ZERO);
        assert_eq!(road_interpolators(HexDirection::E, &cell), Vec2::splat(0.25));
        cell.roads[HexDirection::NE.index()] = true;
        assert_eq!(road_interpolators(HexDirection::E, &cell), Vec2::new(0.5, 0.25));
        cell.roads[HexDirection::E.index()] = true;
        assert_eq!(road_interpolators(HexDirection::E, &cell), Vec2::splat(0.5));
    }

    #[test]
    fn dead_end_road_is_a_single_strip() {
        let mut grid = test_grid();
        assert!(grid.add_road(CENTER, HexDirection::E));
        let chunk = grid.cells()[CENTER].chunk();
        let geometry = ChunkTriangulator::new(&grid).triangulate(grid.chunks()[chunk].cells());
        // Both cells: one segment (2 quads) and two center triangles through
        // the edge, one edge triangle for each other direction, plus the
        // connection segment.
        let per_cell = 2 * 2 + 2 + 5;
        assert_eq!(geometry.roads.triangle_count(), 2 * per_cell + 2 * 2);
    }

    #[test]
    fn road_across_straight_river_gets_a_bridge() {
        let mut grid = test_grid();
        let west = grid.cells()[CENTER].neighbor(HexDirection::W).unwrap();
        let east = grid.cells()[CENTER].neighbor(HexDirection::E).unwrap();
        grid.set_elevation(west, 2);
        grid.set_elevation(CENTER, 1);
        assert!(grid.set_outgoing_river(west, HexDirection::E));
        assert!(grid.set_outgoing_river(CENTER, HexDirection::E));
        assert!(grid.add_road(CENTER, HexDirection::NW));
        assert!(grid.add_road(CENTER, HexDirection::SE));
        assert!(!grid.cells()[east].has_roads());

        let chunk = grid.cells()[CENTER].chunk();
        let geometry = ChunkTriangulator::new(&grid).triangulate(grid.chunks()[chunk].cells());
        let bridges = geometry
            .features
            .iter()
            .filter(|f| f.kind == FeatureKind::Bridge)
            .count();
        assert_eq!(bridges, 1);
    }
}
