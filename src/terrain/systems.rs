use bevy::ecs::system::SystemParam;
use bevy::input::mouse::MouseWheel;
use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use bevy_egui::egui;

use super::HexMapConfig;
use super::entities::{
    ChunkEntities, ChunkLayer, EditorState, HexMap, LayerKind, MapAssets, MapCamera, MapEvent,
    RecolorTerrain, Selection, Travel, UnitMarker,
};
use crate::GameState;
use crate::chunk::ChunkGeometry;
use crate::features::{FeatureKind, FeaturePlacement};
use crate::grid::{CellShaderData, GridEvent, HexGrid};
use crate::math;
use crate::mesh::MeshSurface;
use crate::metrics::{BRIDGE_DESIGN_LENGTH, INNER_RADIUS, OUTER_RADIUS};

// ── Update: rebuild + upload ────────────────────────────────────────

/// Ticks the grid and replaces the entity tree of every rebuilt chunk.
pub fn tick_map(
    mut commands: Commands,
    mut map: ResMut<HexMap>,
    mut chunk_entities: ResMut<ChunkEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    assets: Res<MapAssets>,
    cfg: Res<HexMapConfig>,
    state: Res<State<GameState>>,
) {
    let rebuilt = map.0.tick();
    let grid = &map.0;

    let chunk_count = grid.chunks().len();
    chunk_entities.map.retain(|&chunk, &mut root| {
        let keep = chunk < chunk_count;
        if !keep {
            commands.entity(root).despawn();
        }
        keep
    });

    let show_all = *state.get() != GameState::Playing;
    for chunk in rebuilt {
        if let Some(old) = chunk_entities.map.remove(&chunk) {
            commands.entity(old).despawn();
        }
        let Some(geometry) = grid.chunk_geometry(chunk) else {
            continue;
        };

        let root = commands
            .spawn((
                Name::new(format!("Chunk({chunk})")),
                Transform::default(),
                Visibility::default(),
            ))
            .id();

        for (layer, surface) in chunk_layers(geometry) {
            if surface.is_empty() {
                continue;
            }
            let mut mesh = surface.to_bevy_mesh();
            if layer == LayerKind::Terrain {
                let colors = terrain_colors(
                    surface,
                    grid.shader_data(),
                    &cfg.view.terrain_colors,
                    cfg.view.hidden_brightness,
                    show_all,
                );
                mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
            }
            let child = commands
                .spawn((
                    ChunkLayer { chunk, layer },
                    Name::new(format!("{layer:?}({chunk})")),
                    Mesh3d(meshes.add(mesh)),
                    MeshMaterial3d(assets.layer_material(layer)),
                    Transform::default(),
                ))
                .id();
            commands.entity(root).add_child(child);
        }

        for placement in &geometry.features {
            let material = match placement.kind {
                FeatureKind::Tower | FeatureKind::Bridge => assets.wall.clone(),
                _ => assets.feature.clone(),
            };
            let child = commands
                .spawn((
                    Mesh3d(assets.cube.clone()),
                    MeshMaterial3d(material),
                    feature_transform(placement),
                ))
                .id();
            commands.entity(root).add_child(child);
        }

        chunk_entities.map.insert(chunk, root);
    }
}

/// Recomputes terrain vertex colors after visibility or terrain types change.
pub fn recolor_terrain(
    mut map: ResMut<HexMap>,
    mut recolor: ResMut<RecolorTerrain>,
    layers: Query<(&ChunkLayer, &Mesh3d)>,
    mut meshes: ResMut<Assets<Mesh>>,
    cfg: Res<HexMapConfig>,
    state: Res<State<GameState>>,
) {
    let changed = map.0.shader_data_mut().take_changed();
    if !changed && !std::mem::take(&mut recolor.0) {
        return;
    }
    let grid = &map.0;
    let show_all = *state.get() != GameState::Playing;

    for (layer, mesh) in &layers {
        if layer.layer != LayerKind::Terrain {
            continue;
        }
        let Some(geometry) = grid.chunk_geometry(layer.chunk) else {
            continue;
        };
        if let Some(mesh) = meshes.get_mut(&mesh.0) {
            let colors = terrain_colors(
                &geometry.terrain,
                grid.shader_data(),
                &cfg.view.terrain_colors,
                cfg.view.hidden_brightness,
                show_all,
            );
            mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
        }
    }
}

/// Requests a recolor on the next frame.
pub fn mark_recolor(mut recolor: ResMut<RecolorTerrain>) {
    recolor.0 = true;
}

// ── Update: events ──────────────────────────────────────────────────

/// Moves released grid events into the message queue.
pub fn forward_map_events(mut map: ResMut<HexMap>, mut writer: MessageWriter<MapEvent>) {
    for event in map.0.drain_events() {
        writer.write(MapEvent(event));
    }
}

/// Logs map replacements and drops a selection that no longer exists.
pub fn log_map_events(mut reader: MessageReader<MapEvent>, mut selection: ResMut<Selection>) {
    for MapEvent(event) in reader.read() {
        match event {
            GridEvent::MapCreated {
                cell_count_x,
                cell_count_z,
            } => info!("Map created: {cell_count_x}x{cell_count_z}"),
            GridEvent::MapLoaded {
                cell_count_x,
                cell_count_z,
                units,
            } => info!("Map loaded: {cell_count_x}x{cell_count_z}, {units} unit(s)"),
        }
        *selection = Selection::default();
    }
}

// ── Update: units ───────────────────────────────────────────────────

/// Spawns and despawns unit visuals to match the grid, and snaps idle units
/// onto their cells.
pub fn sync_units(
    mut commands: Commands,
    map: Res<HexMap>,
    assets: Res<MapAssets>,
    mut markers: Query<(Entity, &UnitMarker, &mut Transform, Has<Travel>)>,
) {
    let grid = &map.0;
    let mut present = HashSet::new();

    for (entity, marker, mut transform, traveling) in &mut markers {
        let Some(unit) = grid.unit(marker.id) else {
            commands.entity(entity).despawn();
            continue;
        };
        present.insert(marker.id);
        if !traveling {
            *transform = unit_transform(grid.cells()[unit.location()].position(), unit.orientation());
        }
    }

    for unit in grid.units() {
        if present.contains(&unit.id()) {
            continue;
        }
        commands.spawn((
            UnitMarker { id: unit.id() },
            Name::new(format!("Unit({})", unit.id().0)),
            Mesh3d(assets.unit_mesh.clone()),
            MeshMaterial3d(assets.unit.clone()),
            unit_transform(grid.cells()[unit.location()].position(), unit.orientation()),
        ));
    }
}

/// Walks traveling units along their smoothed path.
pub fn animate_travel(
    mut commands: Commands,
    time: Res<Time>,
    cfg: Res<HexMapConfig>,
    mut travelers: Query<(Entity, &mut Travel, &mut Transform)>,
) {
    for (entity, mut travel, mut transform) in &mut travelers {
        travel.progress += time.delta_secs() * cfg.view.travel_speed;
        let Some(position) = math::travel_point(&travel.points, travel.progress) else {
            commands.entity(entity).remove::<Travel>();
            continue;
        };
        if let Some(ahead) = math::travel_point(&travel.points, travel.progress + 0.05) {
            let heading = ahead - position;
            if heading.length_squared() > 1e-8 {
                transform.rotation = Quat::from_rotation_y(math::yaw_towards(heading));
            }
        }
        transform.translation = position + Vec3::Y * UNIT_LIFT;
        if travel.progress >= travel.points.len() as f32 {
            commands.entity(entity).remove::<Travel>();
        }
    }
}

// ── Update: input ───────────────────────────────────────────────────

/// Cursor ray through the map camera.
#[derive(SystemParam)]
pub struct Pointer<'w, 's> {
    /// Window providing the cursor.
    pub windows: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
    /// Camera the ray starts from.
    pub cameras: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<MapCamera>>,
}

impl Pointer<'_, '_> {
    /// Cell under the cursor, if the cursor is over terrain.
    pub fn cell(&self, grid: &HexGrid) -> Option<usize> {
        let window = self.windows.single().ok()?;
        let cursor = window.cursor_position()?;
        let (camera, camera_gt) = self.cameras.single().ok()?;
        let ray = camera.viewport_to_world(camera_gt, cursor).ok()?;
        grid.cell_at_ray(ray.origin, *ray.direction)
    }
}

/// Paints with the configured brush while the left button is held.
pub fn edit_map(
    mouse: Res<ButtonInput<MouseButton>>,
    pointer: Pointer,
    mut map: ResMut<HexMap>,
    mut editor: ResMut<EditorState>,
    cfg: Res<HexMapConfig>,
) {
    if mouse.pressed(MouseButton::Left) {
        let cell = pointer.cell(&map.0);
        editor.0.handle_input(&mut map.0, &cfg.edit, cell);
    } else {
        editor.0.release();
    }
}

/// U places a unit under the cursor; Shift+U removes it.
pub fn place_units(keys: Res<ButtonInput<KeyCode>>, pointer: Pointer, mut map: ResMut<HexMap>) {
    if !keys.just_pressed(KeyCode::KeyU) {
        return;
    }
    let Some(cell) = pointer.cell(&map.0) else {
        return;
    };
    let grid = &mut map.0;

    if keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight) {
        if let Some(id) = grid.unit_at(cell) {
            grid.remove_unit(id);
        }
    } else {
        let orientation = grid.random_orientation();
        if grid.add_unit(cell, orientation).is_none() {
            debug!("Cell {cell} cannot hold a unit");
        }
    }
}

/// Left click selects a unit, hovering searches a path and right click
/// sends the unit along it.
pub fn select_and_move_units(
    mut commands: Commands,
    mouse: Res<ButtonInput<MouseButton>>,
    pointer: Pointer,
    mut map: ResMut<HexMap>,
    mut selection: ResMut<Selection>,
    markers: Query<(Entity, &UnitMarker)>,
    cfg: Res<HexMapConfig>,
) {
    let cell = pointer.cell(&map.0);
    let grid = &mut map.0;

    if mouse.just_pressed(MouseButton::Left) {
        grid.clear_path();
        *selection = Selection {
            unit: cell.and_then(|cell| grid.unit_at(cell)),
            target: None,
        };
        return;
    }

    let Some(unit) = selection.unit.and_then(|id| grid.unit(id)).cloned() else {
        selection.unit = None;
        return;
    };

    if cell != selection.target {
        selection.target = cell;
        match cell {
            Some(target) if grid.is_valid_unit_destination(target) => {
                grid.find_path(unit.location(), target, cfg.view.unit_speed);
            }
            _ => grid.clear_path(),
        }
    }

    if !mouse.just_pressed(MouseButton::Right) || !grid.has_path() {
        return;
    }
    let Some(path) = grid.path_cells() else {
        return;
    };
    let points: Vec<Vec3> = path.iter().map(|&index| grid.cells()[index].position()).collect();
    if grid.travel(unit.id(), &path)
        && let Some((entity, _)) = markers.iter().find(|(_, m)| m.id == unit.id())
    {
        commands.entity(entity).insert(Travel {
            points,
            progress: 0.0,
        });
    }
    grid.recycle_cell_list(path);
    grid.clear_path();
    selection.target = None;
}

/// Draws the current path and labels each step with the turn it is reached in.
pub fn draw_path(
    map: Res<HexMap>,
    cfg: Res<HexMapConfig>,
    mut gizmos: Gizmos,
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<MapCamera>>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let grid = &map.0;
    let Some((from, _)) = grid.path_endpoints().filter(|_| grid.has_path()) else {
        return;
    };
    let turns = grid.path_turns(cfg.view.unit_speed);
    let lift = Vec3::Y * 0.05;

    let positions = std::iter::once(from)
        .chain(turns.iter().map(|&(cell, _)| cell))
        .map(|cell| grid.cells()[cell].position() + lift);
    gizmos.linestrip(positions, Color::WHITE);

    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());

    for &(cell, turn) in &turns {
        let world_pos = grid.cells()[cell].position() + lift;
        if let Ok(viewport) = camera.world_to_viewport(cam_gt, world_pos) {
            painter.text(
                egui::pos2(viewport.x, viewport.y),
                egui::Align2::CENTER_CENTER,
                turn.to_string(),
                egui::FontId::proportional(13.0),
                egui::Color32::WHITE,
            );
        }
    }
}

/// M switches between editing and playing.
pub fn toggle_play_mode(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
    mut map: ResMut<HexMap>,
    mut selection: ResMut<Selection>,
) {
    if !keys.just_pressed(KeyCode::KeyM) {
        return;
    }
    let new_state = match state.get() {
        GameState::Editing => GameState::Playing,
        GameState::Playing => GameState::Editing,
        GameState::Debugging => return,
    };
    map.0.clear_path();
    *selection = Selection::default();
    next.set(new_state);
}

/// F5 saves the map, F9 loads it back.
pub fn save_or_load(keys: Res<ButtonInput<KeyCode>>, mut map: ResMut<HexMap>, cfg: Res<HexMapConfig>) {
    if keys.just_pressed(KeyCode::F5) {
        match map.0.save_to_path(&cfg.save_path) {
            Ok(()) => info!("Saved map to {}", cfg.save_path),
            Err(err) => error!("Saving {} failed: {err}", cfg.save_path),
        }
    } else if keys.just_pressed(KeyCode::F9)
        && let Err(err) = map.0.load_from_path(&cfg.save_path)
    {
        error!("Loading {} failed: {err}", cfg.save_path);
    }
}

/// WASD / arrow keys pan, the wheel zooms, Q/E rotate. The focus stays
/// inside the map.
pub fn move_camera(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut wheel: MessageReader<MouseWheel>,
    map: Option<Res<HexMap>>,
    cfg: Res<HexMapConfig>,
    mut query: Query<&mut Transform, With<MapCamera>>,
) {
    let Some(map) = map else { return };
    let Ok(mut transform) = query.single_mut() else {
        return;
    };

    let forward = transform.forward();
    let forward_xz = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right = transform.right();
    let right_xz = Vec3::new(right.x, 0.0, right.z).normalize_or_zero();

    let mut direction = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        direction += forward_xz;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        direction -= forward_xz;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        direction += right_xz;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        direction -= right_xz;
    }
    let height_factor = transform.translation.y / cfg.view.zoom_range.1.max(1.0);
    transform.translation +=
        direction.normalize_or_zero() * cfg.view.camera_speed * height_factor.max(0.3) * time.delta_secs();

    let mut yaw = 0.0;
    if keys.pressed(KeyCode::KeyQ) {
        yaw += 1.0;
    }
    if keys.pressed(KeyCode::KeyE) {
        yaw -= 1.0;
    }
    if yaw != 0.0 {
        let pivot = focus_point(&transform);
        transform.rotate_around(pivot, Quat::from_rotation_y(yaw * time.delta_secs()));
    }

    let scroll: f32 = wheel.read().map(|ev| ev.y).sum();
    if scroll != 0.0 {
        let (near, far) = cfg.view.zoom_range;
        let forward = transform.forward();
        let step = scroll * transform.translation.y * 0.1;
        let height = transform.translation.y + forward.y * step;
        if (near..=far).contains(&height) {
            transform.translation += forward * step;
        }
    }

    let grid = &map.0;
    let max_x = (grid.cell_count_x() as f32 - 0.5) * 2.0 * INNER_RADIUS;
    let max_z = (grid.cell_count_z() as f32 - 1.0) * 1.5 * OUTER_RADIUS;
    let focus = focus_point(&transform);
    let clamped = Vec3::new(focus.x.clamp(0.0, max_x), 0.0, focus.z.clamp(0.0, max_z));
    transform.translation += clamped - focus;
}

// ── Helpers ────────────────────────────────────────────────────────

const UNIT_LIFT: f32 = 0.27;

/// Where the camera's view meets the ground plane, or straight below it
/// when looking at the horizon.
fn focus_point(transform: &Transform) -> Vec3 {
    let forward = transform.forward();
    if forward.y < -1e-3 {
        let t = transform.translation.y / -forward.y;
        (transform.translation + *forward * t).with_y(0.0)
    } else {
        transform.translation.with_y(0.0)
    }
}

fn unit_transform(position: Vec3, orientation: f32) -> Transform {
    Transform::from_translation(position + Vec3::Y * UNIT_LIFT).with_rotation(Quat::from_rotation_y(orientation))
}

/// Each chunk surface paired with its layer.
fn chunk_layers(geometry: &ChunkGeometry) -> [(LayerKind, &MeshSurface); 7] {
    [
        (LayerKind::Terrain, &geometry.terrain),
        (LayerKind::Rivers, &geometry.rivers),
        (LayerKind::Roads, &geometry.roads),
        (LayerKind::Water, &geometry.water),
        (LayerKind::WaterShore, &geometry.water_shore),
        (LayerKind::Estuaries, &geometry.estuaries),
        (LayerKind::Walls, &geometry.walls),
    ]
}

/// Box dimensions of a prop before its placement scale.
fn feature_size(kind: FeatureKind) -> Vec3 {
    let shrink = |size: u8, variant: u8| {
        (1.0 - 0.25 * f32::from(size)) * (1.0 - 0.15 * f32::from(variant))
    };
    match kind {
        FeatureKind::Urban { size, variant } => Vec3::new(0.3, 0.45, 0.3) * shrink(size, variant),
        FeatureKind::Farm { size, variant } => {
            Vec3::new(0.5, 0.02, 0.5) * shrink(size, variant)
        }
        FeatureKind::Plant { size, variant } => {
            Vec3::new(0.1, 0.6, 0.1) * shrink(size, variant)
        }
        FeatureKind::Special(_) => Vec3::new(0.6, 0.8, 0.6),
        FeatureKind::Tower => Vec3::new(0.2, 0.6, 0.2),
        FeatureKind::Bridge => Vec3::new(0.15, 0.05, BRIDGE_DESIGN_LENGTH),
    }
}

/// Transform of the unit cube standing in for a prop. Props rest on their
/// base point; bridges are centered on it.
fn feature_transform(placement: &FeaturePlacement) -> Transform {
    let size = feature_size(placement.kind) * placement.scale;
    let lift = match placement.kind {
        FeatureKind::Bridge => 0.0,
        _ => size.y * 0.5,
    };
    Transform::from_translation(placement.position + Vec3::Y * lift)
        .with_rotation(Quat::from_rotation_y(placement.yaw))
        .with_scale(size)
}

/// Per-vertex terrain colors: the palette entries of the up to three cells
/// a vertex belongs to, blended by its cell weights and darkened where no
/// unit sees the cell unless `show_all` is set.
fn terrain_colors(
    surface: &MeshSurface,
    shader_data: &CellShaderData,
    palette: &[Color],
    hidden_brightness: f32,
    show_all: bool,
) -> Vec<[f32; 4]> {
    let palette: Vec<Vec3> = palette
        .iter()
        .map(|color| {
            let linear = color.to_linear();
            Vec3::new(linear.red, linear.green, linear.blue)
        })
        .collect();
    let (Some(indices), Some(weights)) = (&surface.cell_indices, &surface.cell_weights) else {
        return vec![[1.0; 4]; surface.positions.len()];
    };

    indices
        .iter()
        .zip(weights)
        .map(|(cells, weights)| {
            let mut color = Vec3::ZERO;
            for (cell, weight) in cells.to_array().into_iter().zip(weights.to_array()) {
                let texel = shader_data.texel(cell as usize);
                let base = palette
                    .get(usize::from(texel[3]))
                    .or(palette.last())
                    .copied()
                    .unwrap_or(Vec3::ONE);
                let light = if show_all || texel[0] > 0 {
                    1.0
                } else {
                    hidden_brightness
                };
                color += base * light * weight;
            }
            [color.x, color.y, color.z, 1.0]
        })
        .collect()
}
