//! Triangle soup accumulation for one chunk layer.
//!
//! [`MeshBuilder`] collects triangles and quads with optional UV channels
//! and per-vertex cell data, then [`MeshBuilder::commit`] freezes them into a
//! [`MeshSurface`] with smooth normals. Callers list vertices in the order
//! the triangulation walks an edge; the builder emits counter-clockwise
//! front faces.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use crate::math;
use crate::metrics::HexMetrics;

/// Channels a layer carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshLayerFlags {
    /// Keep triangles for ray queries.
    pub use_collider: bool,
    /// Per-vertex cell indices and blend weights.
    pub use_cell_data: bool,
    /// First UV channel.
    pub use_uv: bool,
    /// Second UV channel.
    pub use_uv2: bool,
}

impl MeshLayerFlags {
    /// Ground surface.
    pub const TERRAIN: Self = Self {
        use_collider: true,
        use_cell_data: true,
        use_uv: false,
        use_uv2: false,
    };
    /// River, road and shore strips.
    pub const TEXTURED: Self = Self {
        use_collider: false,
        use_cell_data: false,
        use_uv: true,
        use_uv2: false,
    };
    /// River mouths.
    pub const ESTUARIES: Self = Self {
        use_collider: false,
        use_cell_data: false,
        use_uv: true,
        use_uv2: true,
    };
    /// Open water and walls: positions and normals only.
    pub const PLAIN: Self = Self {
        use_collider: false,
        use_cell_data: false,
        use_uv: false,
        use_uv2: false,
    };
}

/// Frozen geometry of one layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSurface {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Smooth vertex normals.
    pub normals: Vec<Vec3>,
    /// Counter-clockwise triangle list.
    pub indices: Vec<u32>,
    /// First UV channel, if the layer has one.
    pub uvs: Option<Vec<Vec2>>,
    /// Second UV channel, if the layer has one.
    pub uv2s: Option<Vec<Vec2>>,
    /// Up to three cell indices per vertex, stored as floats.
    pub cell_indices: Option<Vec<Vec3>>,
    /// Blend weights matching [`Self::cell_indices`].
    pub cell_weights: Option<Vec<Vec3>>,
    pub(crate) collider: bool,
}

impl MeshSurface {
    /// Distance along `direction` to the nearest triangle, for collider
    /// layers only.
    pub fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if !self.collider {
            return None;
        }
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let triangle = [
                    self.positions[tri[0] as usize],
                    self.positions[tri[1] as usize],
                    self.positions[tri[2] as usize],
                ];
                math::ray_triangle_intersection(origin, direction, triangle)
            })
            .min_by(f32::total_cmp)
    }

    /// Whether ray queries hit this surface.
    pub fn has_collider(&self) -> bool {
        self.collider
    }

    /// No triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Render mesh with positions, normals, UV channels and indices.
    ///
    /// Cell data is left to the caller, which turns it into vertex colors.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();

        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(self.indices.clone()));

        if let Some(uvs) = &self.uvs {
            let uvs: Vec<[f32; 2]> = uvs.iter().map(|uv| uv.to_array()).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        }
        if let Some(uv2s) = &self.uv2s {
            let uv2s: Vec<[f32; 2]> = uv2s.iter().map(|uv| uv.to_array()).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_1, uv2s);
        }
        mesh
    }
}

/// Accumulates one layer's triangles.
pub struct MeshBuilder<'a> {
    metrics: &'a HexMetrics,
    flags: MeshLayerFlags,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    uvs: Vec<Vec2>,
    uv2s: Vec<Vec2>,
    cell_indices: Vec<Vec3>,
    cell_weights: Vec<Vec3>,
}

impl<'a> MeshBuilder<'a> {
    /// Empty builder perturbing vertices with `metrics`.
    pub fn new(metrics: &'a HexMetrics, flags: MeshLayerFlags) -> Self {
        Self {
            metrics,
            flags,
            positions: Vec::new(),
            indices: Vec::new(),
            uvs: Vec::new(),
            uv2s: Vec::new(),
            cell_indices: Vec::new(),
            cell_weights: Vec::new(),
        }
    }

    /// Channels of this layer.
    pub fn flags(&self) -> MeshLayerFlags {
        self.flags
    }

    // ── Geometry ────────────────────────────────────────────────────

    /// Adds a triangle after perturbing its corners.
    pub fn add_triangle(&mut self, v1: Vec3, v2: Vec3, v3: Vec3) {
        let m = self.metrics;
        self.add_triangle_unperturbed(m.perturb(v1), m.perturb(v2), m.perturb(v3));
    }

    /// Adds a triangle as given.
    pub fn add_triangle_unperturbed(&mut self, v1: Vec3, v2: Vec3, v3: Vec3) {
        let base = self.positions.len() as u32;
        self.positions.extend([v1, v2, v3]);
        self.indices.extend([base, base + 2, base + 1]);
    }

    /// Adds a quad `v1 v2` (near edge) to `v3 v4` (far edge) after
    /// perturbing its corners.
    pub fn add_quad(&mut self, v1: Vec3, v2: Vec3, v3: Vec3, v4: Vec3) {
        let m = self.metrics;
        self.add_quad_unperturbed(m.perturb(v1), m.perturb(v2), m.perturb(v3), m.perturb(v4));
    }

    /// Adds a quad as given.
    pub fn add_quad_unperturbed(&mut self, v1: Vec3, v2: Vec3, v3: Vec3, v4: Vec3) {
        let base = self.positions.len() as u32;
        self.positions.extend([v1, v2, v3, v4]);
        self.indices
            .extend([base, base + 1, base + 2, base + 1, base + 3, base + 2]);
    }

    // ── UVs ─────────────────────────────────────────────────────────

    /// First-channel UVs of the last triangle.
    pub fn add_triangle_uv(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2) {
        self.uvs.extend([uv1, uv2, uv3]);
    }

    /// First-channel UVs of the last quad.
    pub fn add_quad_uv(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2, uv4: Vec2) {
        self.uvs.extend([uv1, uv2, uv3, uv4]);
    }

    /// First-channel UVs of the last quad spanning a rectangle.
    pub fn add_quad_uv_rect(&mut self, u_min: f32, u_max: f32, v_min: f32, v_max: f32) {
        self.add_quad_uv(
            Vec2::new(u_min, v_min),
            Vec2::new(u_max, v_min),
            Vec2::new(u_min, v_max),
            Vec2::new(u_max, v_max),
        );
    }

    /// Second-channel UVs of the last triangle.
    pub fn add_triangle_uv2(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2) {
        self.uv2s.extend([uv1, uv2, uv3]);
    }

    /// Second-channel UVs of the last quad.
    pub fn add_quad_uv2(&mut self, uv1: Vec2, uv2: Vec2, uv3: Vec2, uv4: Vec2) {
        self.uv2s.extend([uv1, uv2, uv3, uv4]);
    }

    /// Second-channel UVs of the last quad spanning a rectangle.
    pub fn add_quad_uv2_rect(&mut self, u_min: f32, u_max: f32, v_min: f32, v_max: f32) {
        self.add_quad_uv2(
            Vec2::new(u_min, v_min),
            Vec2::new(u_max, v_min),
            Vec2::new(u_min, v_max),
            Vec2::new(u_max, v_max),
        );
    }

    // ── Cell data ───────────────────────────────────────────────────

    /// Cell data of the last triangle, one weight per corner.
    pub fn add_triangle_cell_data(&mut self, indices: Vec3, w1: Vec3, w2: Vec3, w3: Vec3) {
        self.cell_indices.extend([indices; 3]);
        self.cell_weights.extend([w1, w2, w3]);
    }

    /// Cell data of the last triangle with one weight for all corners.
    pub fn add_triangle_cell_data_uniform(&mut self, indices: Vec3, weights: Vec3) {
        self.add_triangle_cell_data(indices, weights, weights, weights);
    }

    /// Cell data of the last quad, one weight per corner.
    pub fn add_quad_cell_data(&mut self, indices: Vec3, w1: Vec3, w2: Vec3, w3: Vec3, w4: Vec3) {
        self.cell_indices.extend([indices; 4]);
        self.cell_weights.extend([w1, w2, w3, w4]);
    }

    /// Cell data of the last quad: `w1` on the near edge, `w2` on the far.
    pub fn add_quad_cell_data_pair(&mut self, indices: Vec3, w1: Vec3, w2: Vec3) {
        self.add_quad_cell_data(indices, w1, w1, w2, w2);
    }

    /// Cell data of the last quad with one weight for all corners.
    pub fn add_quad_cell_data_uniform(&mut self, indices: Vec3, weights: Vec3) {
        self.add_quad_cell_data(indices, weights, weights, weights, weights);
    }

    // ── Commit ──────────────────────────────────────────────────────

    /// Freezes the layer, computing normals shared by coincident vertices.
    pub fn commit(self) -> MeshSurface {
        let mut accumulated: HashMap<[u32; 3], Vec3> = HashMap::default();
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.positions[i as usize]);
            let normal = math::compute_normal(a, b, c);
            for p in [a, b, c] {
                *accumulated.entry(position_key(p)).or_default() += normal;
            }
        }
        let normals = self
            .positions
            .iter()
            .map(|&p| {
                accumulated
                    .get(&position_key(p))
                    .map_or(Vec3::Y, |n| n.try_normalize().unwrap_or(Vec3::Y))
            })
            .collect();

        let flags = self.flags;
        MeshSurface {
            positions: self.positions,
            normals,
            indices: self.indices,
            uvs: flags.use_uv.then_some(self.uvs),
            uv2s: flags.use_uv2.then_some(self.uv2s),
            cell_indices: flags.use_cell_data.then_some(self.cell_indices),
            cell_weights: flags.use_cell_data.then_some(self.cell_weights),
            collider: flags.use_collider,
        }
    }
}

fn position_key(p: Vec3) -> [u32; 3] {
    // Fold -0.0 into 0.0 so mirrored vertices weld.
    [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn metrics() -> HexMetrics {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        HexMetrics::new(7, 1, 64, &mut rng)
    }

    // ── winding ─────────────────────────────────────────────────────

    #[test]
    fn edge_order_triangle_faces_up() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::PLAIN);
        // Center, then two corners walking clockwise seen from above.
        builder.add_triangle_unperturbed(Vec3::ZERO, Vec3::Z, Vec3::new(-0.866, 0.0, 0.5));
        let surface = builder.commit();
        assert_eq!(surface.indices, vec![0, 2, 1]);
        assert!(surface.normals.iter().all(|n| n.y > 0.99));
    }

    #[test]
    fn edge_order_quad_faces_up() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::PLAIN);
        builder.add_quad_unperturbed(
            Vec3::ZERO,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
        );
        let surface = builder.commit();
        assert_eq!(surface.triangle_count(), 2);
        assert!(surface.normals.iter().all(|n| n.y > 0.99));
    }

    #[test]
    fn shared_positions_get_one_normal() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::PLAIN);
        let ridge_a = Vec3::new(0.0, 1.0, 0.0);
        let ridge_b = Vec3::new(0.0, 1.0, 1.0);
        builder.add_triangle_unperturbed(Vec3::new(-1.0, 0.0, 0.0), ridge_b, ridge_a);
        builder.add_triangle_unperturbed(Vec3::new(1.0, 0.0, 0.0), ridge_a, ridge_b);
        let surface = builder.commit();
        let at = |p: Vec3| {
            surface
                .positions
                .iter()
                .zip(&surface.normals)
                .filter(move |(q, _)| **q == p)
                .map(|(_, n)| *n)
        };
        let ridge: Vec<Vec3> = at(ridge_a).collect();
        assert_eq!(ridge.len(), 2);
        assert_eq!(ridge[0], ridge[1]);
    }

    // ── channels ────────────────────────────────────────────────────

    #[test]
    fn flags_select_channels() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::ESTUARIES);
        builder.add_quad(Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::ONE);
        builder.add_quad_uv_rect(0.0, 1.0, 0.2, 0.4);
        builder.add_quad_uv2_rect(0.0, 0.5, 0.0, 1.0);
        let surface = builder.commit();

        let uvs = surface.uvs.as_ref().unwrap();
        assert_eq!(uvs[1], Vec2::new(1.0, 0.2));
        assert_eq!(uvs[2], Vec2::new(0.0, 0.4));
        assert_eq!(surface.uv2s.as_ref().unwrap().len(), 4);
        assert!(surface.cell_weights.is_none());
        assert!(!surface.has_collider());
    }

    #[test]
    fn terrain_keeps_cell_data() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::TERRAIN);
        builder.add_quad(Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::ONE);
        builder.add_quad_cell_data_pair(Vec3::new(3.0, 4.0, 3.0), Vec3::X, Vec3::Y);
        let surface = builder.commit();
        assert_eq!(surface.cell_weights.clone().unwrap(), vec![Vec3::X, Vec3::X, Vec3::Y, Vec3::Y]);
        assert_eq!(surface.cell_indices.as_ref().unwrap()[0], Vec3::new(3.0, 4.0, 3.0));
        assert!(surface.has_collider());
    }

    #[test]
    fn plain_layer_drops_channels() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::PLAIN);
        builder.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Z);
        builder.add_triangle_uv(Vec2::ZERO, Vec2::X, Vec2::Y);
        let surface = builder.commit();
        assert!(surface.uvs.is_none());
        assert!(surface.cell_indices.is_none());
    }

    #[test]
    fn perturbation_keeps_height() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::PLAIN);
        builder.add_triangle(Vec3::new(3.0, 1.5, 2.0), Vec3::new(4.0, 1.5, 2.0), Vec3::new(3.0, 1.5, 3.0));
        let surface = builder.commit();
        assert!(surface.positions.iter().all(|p| p.y == 1.5));
        assert_ne!(surface.positions[0], Vec3::new(3.0, 1.5, 2.0));
    }

    // ── raycast ─────────────────────────────────────────────────────

    #[test]
    fn raycast_needs_collider() {
        let m = metrics();
        let quad = |flags| {
            let mut builder = MeshBuilder::new(&m, flags);
            builder.add_quad_unperturbed(
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            );
            builder.commit()
        };
        let hit = quad(MeshLayerFlags::TERRAIN).raycast(Vec3::new(0.2, 5.0, 0.3), Vec3::NEG_Y);
        assert!((hit.unwrap() - 5.0).abs() < 1e-5);
        assert!(quad(MeshLayerFlags::PLAIN).raycast(Vec3::new(0.2, 5.0, 0.3), Vec3::NEG_Y).is_none());
    }

    #[test]
    fn bevy_mesh_has_expected_counts() {
        let m = metrics();
        let mut builder = MeshBuilder::new(&m, MeshLayerFlags::TEXTURED);
        builder.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Z);
        builder.add_triangle_uv(Vec2::ZERO, Vec2::X, Vec2::Y);
        let mesh = builder.commit().to_bevy_mesh();
        assert_eq!(mesh.count_vertices(), 3);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(3));
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
        assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_1).is_none());
    }
}
