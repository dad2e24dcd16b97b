//! Terraced slopes and cliff corners.

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::coordinates::HexDirection;
use crate::metrics::{self, EdgeVertices, HexEdgeType, TERRACE_STEPS};

use super::roads::road_interpolators;
use super::{ChunkTriangulator, WEIGHTS1, WEIGHTS2, WEIGHTS3, cell_indices};

impl<'a> ChunkTriangulator<'a> {
    pub(super) fn triangulate_without_river(
        &mut self,
        direction: HexDirection,
        cell: &'a HexCell,
        center: Vec3,
        e: EdgeVertices,
    ) {
        self.triangulate_edge_fan(center, &e, cell.index());
        if cell.has_roads() {
            let interpolators = road_interpolators(direction, cell);
            self.triangulate_road(
                center,
                center.lerp(e.v1, interpolators.x),
                center.lerp(e.v5, interpolators.y),
                &e,
                cell.has_road_through_edge(direction),
            );
        }
    }

    /// Staircase across a one-level connection.
    pub(super) fn triangulate_edge_terraces(
        &mut self,
        begin: &EdgeVertices,
        begin_cell: &HexCell,
        end: &EdgeVertices,
        end_cell: &HexCell,
        has_road: bool,
    ) {
        let (i1, i2) = (begin_cell.index(), end_cell.index());
        let mut e2 = EdgeVertices::terrace_lerp(*begin, *end, 1);
        let mut w2 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS2, 1);
        self.triangulate_edge_strip(begin, WEIGHTS1, i1, &e2, w2, i2, has_road);

        for step in 2..TERRACE_STEPS {
            let (e1, w1) = (e2, w2);
            e2 = EdgeVertices::terrace_lerp(*begin, *end, step);
            w2 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS2, step);
            self.triangulate_edge_strip(&e1, w1, i1, &e2, w2, i2, has_road);
        }

        self.triangulate_edge_strip(&e2, w2, i1, end, WEIGHTS2, i2, has_road);
    }

    /// Corner where both sides rise one level from `begin`.
    pub(super) fn triangulate_corner_terraces(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let indices = cell_indices(begin_cell.index(), left_cell.index(), right_cell.index());
        let mut v3 = metrics::terrace_lerp(begin, left, 1);
        let mut v4 = metrics::terrace_lerp(begin, right, 1);
        let mut w3 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS2, 1);
        let mut w4 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS3, 1);

        self.terrain.add_triangle(begin, v3, v4);
        self.terrain.add_triangle_cell_data(indices, WEIGHTS1, w3, w4);

        for step in 2..TERRACE_STEPS {
            let (v1, v2, w1, w2) = (v3, v4, w3, w4);
            v3 = metrics::terrace_lerp(begin, left, step);
            v4 = metrics::terrace_lerp(begin, right, step);
            w3 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS2, step);
            w4 = metrics::terrace_lerp_weights(WEIGHTS1, WEIGHTS3, step);
            self.terrain.add_quad(v1, v2, v3, v4);
            self.terrain.add_quad_cell_data(indices, w1, w2, w3, w4);
        }

        self.terrain.add_quad(v3, v4, left, right);
        self.terrain
            .add_quad_cell_data(indices, w3, w4, WEIGHTS2, WEIGHTS3);
    }

    /// Corner with terraces on the left and a cliff on the right.
    pub(super) fn triangulate_corner_terraces_cliff(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let b = (1.0 / (right_cell.elevation() - begin_cell.elevation()) as f32).abs();
        let boundary = self
            .metrics
            .perturb(begin)
            .lerp(self.metrics.perturb(right), b);
        let boundary_weights = WEIGHTS1.lerp(WEIGHTS3, b);
        let indices = cell_indices(begin_cell.index(), left_cell.index(), right_cell.index());

        self.triangulate_boundary_triangle(
            (begin, WEIGHTS1),
            (left, WEIGHTS2),
            (boundary, boundary_weights),
            indices,
        );
        self.close_cliff_corner(
            (left, left_cell),
            (right, right_cell),
            (boundary, boundary_weights),
            indices,
        );
    }

    /// Corner with a cliff on the left and terraces on the right.
    pub(super) fn triangulate_corner_cliff_terraces(
        &mut self,
        begin: Vec3,
        begin_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        let b = (1.0 / (left_cell.elevation() - begin_cell.elevation()) as f32).abs();
        let boundary = self
            .metrics
            .perturb(begin)
            .lerp(self.metrics.perturb(left), b);
        let boundary_weights = WEIGHTS1.lerp(WEIGHTS2, b);
        let indices = cell_indices(begin_cell.index(), left_cell.index(), right_cell.index());

        self.triangulate_boundary_triangle(
            (right, WEIGHTS3),
            (begin, WEIGHTS1),
            (boundary, boundary_weights),
            indices,
        );
        self.close_cliff_corner(
            (left, left_cell),
            (right, right_cell),
            (boundary, boundary_weights),
            indices,
        );
    }

    /// Top of a cliff corner: terraced when left and right form a slope,
    /// otherwise one flat triangle to the boundary point.
    fn close_cliff_corner(
        &mut self,
        (left, left_cell): (Vec3, &HexCell),
        (right, right_cell): (Vec3, &HexCell),
        (boundary, boundary_weights): (Vec3, Vec3),
        indices: Vec3,
    ) {
        if left_cell.edge_type_to(right_cell) == HexEdgeType::Slope {
            self.triangulate_boundary_triangle(
                (left, WEIGHTS2),
                (right, WEIGHTS3),
                (boundary, boundary_weights),
                indices,
            );
        } else {
            let m = self.metrics;
            self.terrain
                .add_triangle_unperturbed(m.perturb(left), m.perturb(right), boundary);
            self.terrain
                .add_triangle_cell_data(indices, WEIGHTS2, WEIGHTS3, boundary_weights);
        }
    }

    /// Terrace steps from `begin` to `left`, fanned to an already perturbed
    /// `boundary` point so the cliff face stays straight.
    fn triangulate_boundary_triangle(
        &mut self,
        (begin, begin_weights): (Vec3, Vec3),
        (left, left_weights): (Vec3, Vec3),
        (boundary, boundary_weights): (Vec3, Vec3),
        indices: Vec3,
    ) {
        let m = self.metrics;
        let mut v2 = m.perturb(metrics::terrace_lerp(begin, left, 1));
        let mut w2 = metrics::terrace_lerp_weights(begin_weights, left_weights, 1);

        self.terrain
            .add_triangle_unperturbed(m.perturb(begin), v2, boundary);
        self.terrain
            .add_triangle_cell_data(indices, begin_weights, w2, boundary_weights);

        for step in 2..TERRACE_STEPS {
            let (v1, w1) = (v2, w2);
            v2 = m.perturb(metrics::terrace_lerp(begin, left, step));
            w2 = metrics::terrace_lerp_weights(begin_weights, left_weights, step);
            self.terrain.add_triangle_unperturbed(v1, v2, boundary);
            self.terrain
                .add_triangle_cell_data(indices, w1, w2, boundary_weights);
        }

        self.terrain
            .add_triangle_unperturbed(v2, m.perturb(left), boundary);
        self.terrain
            .add_triangle_cell_data(indices, w2, left_weights, boundary_weights);
    }
}
