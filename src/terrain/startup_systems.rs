use bevy::prelude::*;

use super::HexMapConfig;
use super::entities::{HexMap, MapAssets, MapCamera};
use crate::grid::{HexGrid, MapSettings};
use crate::metrics::{INNER_RADIUS, OUTER_RADIUS};

// ── Startup ─────────────────────────────────────────────────────────

/// Builds the [`HexMap`] from the configured settings, falling back to the
/// default size when they are rejected.
pub fn create_map(mut commands: Commands, cfg: Res<HexMapConfig>) {
    let grid = match HexGrid::new(&cfg.map) {
        Ok(grid) => grid,
        Err(err) => {
            error!("{err}; using the default map size");
            let fallback = MapSettings {
                cell_count_x: MapSettings::default().cell_count_x,
                cell_count_z: MapSettings::default().cell_count_z,
                ..cfg.map.clone()
            };
            match HexGrid::new(&fallback) {
                Ok(grid) => grid,
                Err(err) => {
                    error!("{err}");
                    return;
                }
            }
        }
    };
    info!(
        "Created {}x{} map ({} chunks)",
        grid.cell_count_x(),
        grid.cell_count_z(),
        grid.chunks().len()
    );
    commands.insert_resource(HexMap(grid));
}

/// Camera looking down at the middle of the map, plus the sun.
pub fn spawn_camera(mut commands: Commands, cfg: Res<HexMapConfig>) {
    let center = Vec3::new(
        cfg.map.cell_count_x as f32 * INNER_RADIUS,
        0.0,
        cfg.map.cell_count_z as f32 * OUTER_RADIUS * 0.75,
    );
    let (near, far) = cfg.view.zoom_range;
    let distance = (near + far) * 0.5;

    commands.spawn((
        MapCamera,
        Name::new("MapCamera"),
        Camera3d::default(),
        Transform::from_translation(center + Vec3::new(0.0, distance, -distance * 0.6))
            .looking_at(center, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 10.0, 0.0).looking_at(Vec3::new(0.4, 0.0, 1.0), Vec3::Y),
    ));
}

/// Materials and shared meshes.
pub fn create_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<HexMapConfig>,
) {
    let v = &cfg.view;
    let translucent = |color: Color| StandardMaterial {
        base_color: color,
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 0.1,
        ..default()
    };
    let opaque = |color: Color| StandardMaterial {
        base_color: color,
        perceptual_roughness: 0.9,
        ..default()
    };

    commands.insert_resource(MapAssets {
        terrain: materials.add(opaque(Color::WHITE)),
        river: materials.add(translucent(v.river_color)),
        road: materials.add(StandardMaterial {
            depth_bias: 1.0,
            ..opaque(v.road_color)
        }),
        water: materials.add(translucent(v.water_color)),
        wall: materials.add(opaque(v.wall_color)),
        feature: materials.add(opaque(v.feature_color)),
        unit: materials.add(opaque(v.unit_color)),
        cube: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        unit_mesh: meshes.add(Capsule3d::new(0.12, 0.3)),
    });
}
