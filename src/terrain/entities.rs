use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::editor::MapEditor;
use crate::grid::{GridEvent, HexGrid, UnitId};

/// The map itself.
#[derive(Resource)]
pub struct HexMap(pub HexGrid);

/// A [`GridEvent`] forwarded into the ECS after the rebuild it reports.
#[derive(Message, Clone, Debug)]
pub struct MapEvent(pub GridEvent);

/// Marker for the map camera.
#[derive(Component)]
pub struct MapCamera;

/// Which surface of a chunk a mesh entity draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum LayerKind {
    /// Ground, colored per vertex from the cell palette.
    Terrain,
    /// River surfaces.
    Rivers,
    /// Roads.
    Roads,
    /// Open water.
    Water,
    /// Water along coasts.
    WaterShore,
    /// River mouths.
    Estuaries,
    /// Walls.
    Walls,
}

/// Mesh entity of one chunk surface. Child of the chunk root.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct ChunkLayer {
    /// Chunk index.
    pub chunk: usize,
    /// Surface kind.
    pub layer: LayerKind,
}

/// Visual of a unit.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct UnitMarker {
    /// Grid handle.
    pub id: UnitId,
}

/// A unit walking along a path.
#[derive(Component, Clone, Debug, Reflect)]
pub struct Travel {
    /// Cell centers from start to goal.
    pub points: Vec<Vec3>,
    /// Progress in cells.
    pub progress: f32,
}

/// Chunk index → root entity of its meshes and features.
#[derive(Resource, Default)]
pub struct ChunkEntities {
    /// Lookup from chunk to entity.
    pub map: HashMap<usize, Entity>,
}

/// Drag state of the brush.
#[derive(Resource, Default)]
pub struct EditorState(pub MapEditor);

/// Unit picked while playing, and the cell the path was last searched to.
#[derive(Resource, Default)]
pub struct Selection {
    /// Selected unit.
    pub unit: Option<UnitId>,
    /// Goal of the shown path.
    pub target: Option<usize>,
}

/// Set when terrain vertex colors must be recomputed even though no chunk
/// was rebuilt.
#[derive(Resource, Default)]
pub struct RecolorTerrain(pub bool);

/// Shared mesh and material handles.
#[derive(Resource)]
pub struct MapAssets {
    /// Vertex-colored ground.
    pub terrain: Handle<StandardMaterial>,
    /// Rivers.
    pub river: Handle<StandardMaterial>,
    /// Roads.
    pub road: Handle<StandardMaterial>,
    /// Water, shores and estuaries.
    pub water: Handle<StandardMaterial>,
    /// Walls, towers and bridges.
    pub wall: Handle<StandardMaterial>,
    /// Urban, farm and plant props.
    pub feature: Handle<StandardMaterial>,
    /// Units.
    pub unit: Handle<StandardMaterial>,
    /// Unit cube mesh shared by props, towers and bridges.
    pub cube: Handle<Mesh>,
    /// Unit mesh.
    pub unit_mesh: Handle<Mesh>,
}

impl MapAssets {
    /// Material of a non-terrain layer.
    pub fn layer_material(&self, layer: LayerKind) -> Handle<StandardMaterial> {
        match layer {
            LayerKind::Terrain => self.terrain.clone(),
            LayerKind::Rivers => self.river.clone(),
            LayerKind::Roads => self.road.clone(),
            LayerKind::Water | LayerKind::WaterShore | LayerKind::Estuaries => self.water.clone(),
            LayerKind::Walls => self.wall.clone(),
        }
    }
}
