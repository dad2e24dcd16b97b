//! Props and walls scattered over a chunk.
//!
//! Features are returned as [`FeaturePlacement`]s for the host to
//! instantiate; wall geometry goes straight into a plain mesh layer.

use std::f32::consts::TAU;

use bevy::prelude::*;

use crate::cell::HexCell;
use crate::math;
use crate::mesh::{MeshBuilder, MeshLayerFlags, MeshSurface};
use crate::metrics::{self, EdgeVertices, HexEdgeType, HexMetrics};

/// Model variants available for each feature size.
pub const FEATURE_VARIANTS: u8 = 2;

/// What to instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum FeatureKind {
    /// Buildings; `size` 0 is the largest.
    Urban {
        /// Size class, `0..3`.
        size: u8,
        /// Model variant, `0..FEATURE_VARIANTS`.
        variant: u8,
    },
    /// Fields.
    Farm {
        /// Size class, `0..3`.
        size: u8,
        /// Model variant, `0..FEATURE_VARIANTS`.
        variant: u8,
    },
    /// Trees.
    Plant {
        /// Size class, `0..3`.
        size: u8,
        /// Model variant, `0..FEATURE_VARIANTS`.
        variant: u8,
    },
    /// Landmark with a 1-based special index.
    Special(i32),
    /// Wall tower.
    Tower,
    /// Road bridge over a river.
    Bridge,
}

/// One prop instance in world space.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct FeaturePlacement {
    /// What to place.
    pub kind: FeatureKind,
    /// Base position.
    pub position: Vec3,
    /// Rotation about +Y in radians.
    pub yaw: f32,
    /// Non-uniform scale; bridges stretch along Z.
    pub scale: Vec3,
}

/// Collects features and wall geometry for one chunk.
pub struct FeatureScatterer<'a> {
    metrics: &'a HexMetrics,
    walls: MeshBuilder<'a>,
    placements: Vec<FeaturePlacement>,
}

impl<'a> FeatureScatterer<'a> {
    /// Empty scatterer.
    pub fn new(metrics: &'a HexMetrics) -> Self {
        Self {
            metrics,
            walls: MeshBuilder::new(metrics, MeshLayerFlags::PLAIN),
            placements: Vec::new(),
        }
    }

    /// Wall surface and placements.
    pub fn finish(self) -> (MeshSurface, Vec<FeaturePlacement>) {
        (self.walls.commit(), self.placements)
    }

    fn place(&mut self, kind: FeatureKind, position: Vec3, yaw: f32, scale: Vec3) {
        self.placements.push(FeaturePlacement {
            kind,
            position,
            yaw,
            scale,
        });
    }

    // ── Props ───────────────────────────────────────────────────────

    /// Places at most one urban, farm or plant prop at `position`.
    ///
    /// Each kind draws its own hash value against its level's thresholds and
    /// the lowest qualifying draw wins.
    pub fn add_feature(&mut self, cell: &HexCell, position: Vec3) {
        if cell.is_special() {
            return;
        }

        let hash = self.metrics.sample_hash_grid(position);
        let urban = pick_size(cell.urban_level(), hash.a).map(|size| (size, hash.a));
        let farm = pick_size(cell.farm_level(), hash.b).map(|size| (size, hash.b));
        let plant = pick_size(cell.plant_level(), hash.c).map(|size| (size, hash.c));
        let variant = (hash.d * f32::from(FEATURE_VARIANTS)) as u8;

        let mut chosen = urban.map(|(size, h)| (FeatureKind::Urban { size, variant }, h));
        if let Some((size, h)) = farm {
            if chosen.is_none_or(|(_, best)| h < best) {
                chosen = Some((FeatureKind::Farm { size, variant }, h));
            }
        }
        if let Some((size, h)) = plant {
            if chosen.is_none_or(|(_, best)| h < best) {
                chosen = Some((FeatureKind::Plant { size, variant }, h));
            }
        }
        let Some((kind, _)) = chosen else {
            return;
        };

        let position = self.metrics.perturb(position);
        self.place(kind, position, hash.e * TAU, Vec3::ONE);
    }

    /// Places a cell's landmark.
    pub fn add_special_feature(&mut self, cell: &HexCell, position: Vec3) {
        let hash = self.metrics.sample_hash_grid(position);
        let position = self.metrics.perturb(position);
        self.place(
            FeatureKind::Special(cell.special_index()),
            position,
            hash.e * TAU,
            Vec3::ONE,
        );
    }

    /// Spans a bridge between two road centers on either side of a river.
    pub fn add_bridge(&mut self, road_center1: Vec3, road_center2: Vec3) {
        let road_center1 = self.metrics.perturb(road_center1);
        let road_center2 = self.metrics.perturb(road_center2);
        let span = road_center2 - road_center1;
        self.place(
            FeatureKind::Bridge,
            (road_center1 + road_center2) * 0.5,
            math::yaw_towards(span),
            Vec3::new(1.0, 1.0, span.length() / metrics::BRIDGE_DESIGN_LENGTH),
        );
    }

    // ── Walls ───────────────────────────────────────────────────────

    /// Wall along the connection between two cells, if exactly one of them
    /// is walled.
    ///
    /// Roads and rivers leave a gap in the middle, closed off by caps.
    pub fn add_wall_edge(
        &mut self,
        near: &EdgeVertices,
        near_cell: &HexCell,
        far: &EdgeVertices,
        far_cell: &HexCell,
        has_river: bool,
        has_road: bool,
    ) {
        if near_cell.walled() == far_cell.walled()
            || near_cell.is_underwater()
            || far_cell.is_underwater()
            || near_cell.edge_type_to(far_cell) == HexEdgeType::Cliff
        {
            return;
        }

        self.add_wall_segment(near.v1, far.v1, near.v2, far.v2, false);
        if has_road || has_river {
            self.add_wall_cap(near.v2, far.v2);
            self.add_wall_cap(far.v4, near.v4);
        } else {
            self.add_wall_segment(near.v2, far.v2, near.v3, far.v3, false);
            self.add_wall_segment(near.v3, far.v3, near.v4, far.v4, false);
        }
        self.add_wall_segment(near.v4, far.v4, near.v5, far.v5, false);
    }

    /// Wall through the corner shared by three cells.
    ///
    /// The wall pivots around the odd one out, whichever of the three that
    /// is; nothing is built when all or none are walled.
    pub fn add_wall_corner(
        &mut self,
        c1: Vec3,
        cell1: &HexCell,
        c2: Vec3,
        cell2: &HexCell,
        c3: Vec3,
        cell3: &HexCell,
    ) {
        match (cell1.walled(), cell2.walled(), cell3.walled()) {
            (true, true, false) => self.add_wall_pivot(c3, cell3, c1, cell1, c2, cell2),
            (true, false, true) => self.add_wall_pivot(c2, cell2, c3, cell3, c1, cell1),
            (true, false, false) => self.add_wall_pivot(c1, cell1, c2, cell2, c3, cell3),
            (false, true, true) => self.add_wall_pivot(c1, cell1, c2, cell2, c3, cell3),
            (false, true, false) => self.add_wall_pivot(c2, cell2, c3, cell3, c1, cell1),
            (false, false, true) => self.add_wall_pivot(c3, cell3, c1, cell1, c2, cell2),
            (true, true, true) | (false, false, false) => {}
        }
    }

    fn add_wall_pivot(
        &mut self,
        pivot: Vec3,
        pivot_cell: &HexCell,
        left: Vec3,
        left_cell: &HexCell,
        right: Vec3,
        right_cell: &HexCell,
    ) {
        if pivot_cell.is_underwater() {
            return;
        }

        let has_left_wall =
            !left_cell.is_underwater() && pivot_cell.edge_type_to(left_cell) != HexEdgeType::Cliff;
        let has_right_wall =
            !right_cell.is_underwater() && pivot_cell.edge_type_to(right_cell) != HexEdgeType::Cliff;

        match (has_left_wall, has_right_wall) {
            (true, true) => {
                let has_tower = left_cell.elevation() == right_cell.elevation() && {
                    let hash = self.metrics.sample_hash_grid((pivot + left + right) * (1.0 / 3.0));
                    hash.e < metrics::WALL_TOWER_THRESHOLD
                };
                self.add_wall_segment(pivot, left, pivot, right, has_tower);
            }
            (true, false) if left_cell.elevation() < right_cell.elevation() => {
                self.add_wall_wedge(pivot, left, right);
            }
            (true, false) => self.add_wall_cap(pivot, left),
            (false, true) if right_cell.elevation() < left_cell.elevation() => {
                self.add_wall_wedge(right, pivot, left);
            }
            (false, true) => self.add_wall_cap(right, pivot),
            (false, false) => {}
        }
    }

    fn add_wall_segment(
        &mut self,
        near_left: Vec3,
        far_left: Vec3,
        near_right: Vec3,
        far_right: Vec3,
        add_tower: bool,
    ) {
        let m = self.metrics;
        let near_left = m.perturb(near_left);
        let far_left = m.perturb(far_left);
        let near_right = m.perturb(near_right);
        let far_right = m.perturb(far_right);

        let left = metrics::wall_lerp(near_left, far_left);
        let right = metrics::wall_lerp(near_right, far_right);
        let left_offset = metrics::wall_thickness_offset(near_left, far_left);
        let right_offset = metrics::wall_thickness_offset(near_right, far_right);
        let left_top = left.y + metrics::WALL_HEIGHT;
        let right_top = right.y + metrics::WALL_HEIGHT;

        let (v1, v2) = (left - left_offset, right - right_offset);
        let (t1, t2) = (v1.with_y(left_top), v2.with_y(right_top));
        self.walls.add_quad_unperturbed(v1, v2, t1, t2);

        let (v1, v2) = (left + left_offset, right + right_offset);
        let (v3, v4) = (v1.with_y(left_top), v2.with_y(right_top));
        self.walls.add_quad_unperturbed(v2, v1, v4, v3);
        self.walls.add_quad_unperturbed(t1, t2, v3, v4);

        if add_tower {
            let mut heading = right - left;
            heading.y = 0.0;
            self.place(
                FeatureKind::Tower,
                (left + right) * 0.5,
                math::yaw_towards(heading),
                Vec3::ONE,
            );
        }
    }

    fn add_wall_cap(&mut self, near: Vec3, far: Vec3) {
        let near = self.metrics.perturb(near);
        let far = self.metrics.perturb(far);

        let center = metrics::wall_lerp(near, far);
        let thickness = metrics::wall_thickness_offset(near, far);
        let top = center.y + metrics::WALL_HEIGHT;

        let (v1, v2) = (center - thickness, center + thickness);
        self.walls
            .add_quad_unperturbed(v1, v2, v1.with_y(top), v2.with_y(top));
    }

    fn add_wall_wedge(&mut self, near: Vec3, far: Vec3, point: Vec3) {
        let near = self.metrics.perturb(near);
        let far = self.metrics.perturb(far);
        let point = self.metrics.perturb(point);

        let center = metrics::wall_lerp(near, far);
        let thickness = metrics::wall_thickness_offset(near, far);
        let top = center.y + metrics::WALL_HEIGHT;

        let (v1, v2) = (center - thickness, center + thickness);
        let (v3, v4) = (v1.with_y(top), v2.with_y(top));
        let point_top = point.with_y(top);
        let point = point.with_y(center.y);

        self.walls.add_quad_unperturbed(v1, point, v3, point_top);
        self.walls.add_quad_unperturbed(point, v2, point_top, v4);
        self.walls.add_triangle_unperturbed(point_top, v3, v4);
    }
}

/// Size class for a density `level` and hash draw, largest first.
fn pick_size(level: i32, hash: f32) -> Option<u8> {
    let thresholds = metrics::feature_thresholds(level)?;
    thresholds.iter().position(|&t| hash < t).map(|size| size as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::HexCoordinates;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn metrics() -> HexMetrics {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        HexMetrics::new(11, 1, 64, &mut rng)
    }

    fn cell(elevation: i32, walled: bool) -> HexCell {
        let mut cell = HexCell::new(0, HexCoordinates::new(0, 0), 0, Vec3::ZERO);
        cell.elevation = elevation;
        cell.walled = walled;
        cell
    }

    fn edge(z: f32) -> EdgeVertices {
        EdgeVertices::new(Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z))
    }

    fn sample_positions() -> impl Iterator<Item = Vec3> {
        (0..40).flat_map(|i| (0..40).map(move |j| Vec3::new(i as f32 * 0.43, 0.0, j as f32 * 0.41)))
    }

    // ── pick_size ───────────────────────────────────────────────────

    #[test]
    fn pick_size_follows_thresholds() {
        assert_eq!(pick_size(0, 0.1), None);
        assert_eq!(pick_size(1, 0.1), Some(2));
        assert_eq!(pick_size(1, 0.5), None);
        assert_eq!(pick_size(3, 0.1), Some(0));
        assert_eq!(pick_size(3, 0.5), Some(1));
        assert_eq!(pick_size(3, 0.7), Some(2));
        assert_eq!(pick_size(3, 0.9), None);
    }

    // ── props ───────────────────────────────────────────────────────

    #[test]
    fn empty_cell_gets_no_props() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        let plain = cell(0, false);
        for p in sample_positions() {
            scatterer.add_feature(&plain, p);
        }
        assert!(scatterer.finish().1.is_empty());
    }

    #[test]
    fn dense_urban_cell_places_buildings_only() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        let mut town = cell(0, false);
        town.urban_level = 3;
        for p in sample_positions() {
            scatterer.add_feature(&town, p);
        }
        let (_, placements) = scatterer.finish();
        assert!(!placements.is_empty());
        assert!(placements.iter().all(|f| matches!(
            f.kind,
            FeatureKind::Urban { size, variant } if size < 3 && variant < FEATURE_VARIANTS
        )));
        assert!(placements.iter().all(|f| (0.0..TAU).contains(&f.yaw)));
    }

    #[test]
    fn lowest_draw_wins_between_kinds() {
        let m = metrics();
        let mut mixed = cell(0, false);
        mixed.urban_level = 3;
        mixed.plant_level = 3;
        for p in sample_positions() {
            let hash = m.sample_hash_grid(p);
            let mut scatterer = FeatureScatterer::new(&m);
            scatterer.add_feature(&mixed, p);
            let (_, placements) = scatterer.finish();
            if hash.a < 0.8 && hash.c < 0.8 {
                let expect_urban = hash.a <= hash.c;
                assert_eq!(
                    matches!(placements[0].kind, FeatureKind::Urban { .. }),
                    expect_urban
                );
            }
        }
    }

    #[test]
    fn special_cells_skip_ordinary_props() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        let mut castle = cell(0, false);
        castle.urban_level = 3;
        castle.special_index = 2;
        for p in sample_positions() {
            scatterer.add_feature(&castle, p);
        }
        scatterer.add_special_feature(&castle, Vec3::ZERO);
        let (_, placements) = scatterer.finish();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].kind, FeatureKind::Special(2));
    }

    #[test]
    fn bridge_stretches_over_span() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        scatterer.add_bridge(Vec3::new(10.0, 0.0, 10.0), Vec3::new(12.0, 0.0, 10.0));
        let (_, placements) = scatterer.finish();
        let bridge = placements[0];
        assert_eq!(bridge.kind, FeatureKind::Bridge);
        assert!(bridge.scale.z > 1.0, "a span longer than the model stretches it");
        assert_eq!(bridge.scale.x, 1.0);
    }

    // ── walls ───────────────────────────────────────────────────────

    #[test]
    fn wall_edge_needs_exactly_one_walled_side() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        scatterer.add_wall_edge(&edge(0.0), &cell(0, true), &edge(0.5), &cell(0, true), false, false);
        scatterer.add_wall_edge(&edge(0.0), &cell(0, false), &edge(0.5), &cell(0, false), false, false);
        assert!(scatterer.finish().0.is_empty());
    }

    #[test]
    fn wall_edge_segments_and_gap() {
        let m = metrics();
        let mut solid = FeatureScatterer::new(&m);
        solid.add_wall_edge(&edge(0.0), &cell(0, true), &edge(0.5), &cell(1, false), false, false);
        assert_eq!(solid.finish().0.triangle_count(), 4 * 3 * 2);

        let mut gated = FeatureScatterer::new(&m);
        gated.add_wall_edge(&edge(0.0), &cell(0, true), &edge(0.5), &cell(0, false), false, true);
        assert_eq!(gated.finish().0.triangle_count(), (2 * 3 + 2) * 2);
    }

    #[test]
    fn no_walls_on_cliffs_or_in_water() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        scatterer.add_wall_edge(&edge(0.0), &cell(0, true), &edge(0.5), &cell(2, false), false, false);
        let mut flooded = cell(0, false);
        flooded.water_level = 1;
        scatterer.add_wall_edge(&edge(0.0), &cell(0, true), &edge(0.5), &flooded, false, false);
        assert!(scatterer.finish().0.is_empty());
    }

    #[test]
    fn wall_corner_pivots_on_odd_cell() {
        let m = metrics();
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Z);

        let mut all = FeatureScatterer::new(&m);
        all.add_wall_corner(a, &cell(0, true), b, &cell(0, true), c, &cell(0, true));
        assert!(all.finish().0.is_empty());

        let mut one = FeatureScatterer::new(&m);
        one.add_wall_corner(a, &cell(0, true), b, &cell(0, false), c, &cell(0, false));
        let (walls, placements) = one.finish();
        assert_eq!(walls.triangle_count(), 3 * 2);
        assert!(placements.iter().all(|p| p.kind == FeatureKind::Tower));
    }

    #[test]
    fn wall_corner_wedges_against_cliff() {
        let m = metrics();
        let mut scatterer = FeatureScatterer::new(&m);
        // Pivot walled at 1; left is a slope down to 0, right a cliff up to 3.
        scatterer.add_wall_corner(
            Vec3::ZERO,
            &cell(1, true),
            Vec3::X,
            &cell(0, false),
            Vec3::Z,
            &cell(3, false),
        );
        let (walls, placements) = scatterer.finish();
        assert_eq!(walls.triangle_count(), 2 * 2 + 1);
        assert!(placements.is_empty());
    }
}
