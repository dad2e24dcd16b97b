//! Bevy integration: the map as a resource, chunk meshes, editing and play.
//!
//! [`HexMapPlugin`] owns a [`HexGrid`](crate::grid::HexGrid) inside the
//! [`HexMap`] resource, ticks it once per frame and keeps one entity tree per
//! chunk in sync with the rebuilt geometry.

mod entities;
mod startup_systems;
mod systems;

pub use entities::{ChunkLayer, HexMap, LayerKind, MapCamera, MapEvent, UnitMarker};

use bevy::prelude::*;

use crate::GameState;
use crate::editor::EditSettings;
use crate::grid::MapSettings;

/// Nested configuration for the map subsystem.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct HexMapConfig {
    /// Map size and seeds.
    pub map: MapSettings,
    /// Colors and camera.
    pub view: ViewSettings,
    /// Brush applied while editing.
    pub edit: EditSettings,
    /// File written by F5 and read by F9.
    pub save_path: String,
}

/// Presentation settings.
#[derive(Clone, Debug, Reflect)]
pub struct ViewSettings {
    /// Terrain palette, indexed by cell terrain type.
    pub terrain_colors: Vec<Color>,
    /// Brightness of cells no unit can see while playing.
    pub hidden_brightness: f32,
    /// Open water and shores.
    pub water_color: Color,
    /// River surfaces.
    pub river_color: Color,
    /// Road strips.
    pub road_color: Color,
    /// Walls and towers.
    pub wall_color: Color,
    /// Buildings, farms and plants.
    pub feature_color: Color,
    /// Units.
    pub unit_color: Color,
    /// Background clear color.
    pub clear_color: Color,
    /// Camera pan speed in world units per second.
    pub camera_speed: f32,
    /// Closest and farthest camera distance from the ground.
    pub zoom_range: (f32, f32),
    /// Movement budget per turn used for path search.
    pub unit_speed: i32,
    /// Cells a traveling unit crosses per second.
    pub travel_speed: f32,
}

impl Default for HexMapConfig {
    fn default() -> Self {
        Self {
            map: MapSettings::default(),
            view: ViewSettings {
                terrain_colors: vec![
                    Color::srgb(0.86, 0.80, 0.50),
                    Color::srgb(0.35, 0.62, 0.24),
                    Color::srgb(0.48, 0.36, 0.24),
                    Color::srgb(0.52, 0.52, 0.50),
                    Color::srgb(0.94, 0.95, 0.97),
                ],
                hidden_brightness: 0.25,
                water_color: Color::srgba(0.18, 0.42, 0.72, 0.75),
                river_color: Color::srgba(0.25, 0.55, 0.85, 0.85),
                road_color: Color::srgb(0.40, 0.30, 0.22),
                wall_color: Color::srgb(0.70, 0.66, 0.60),
                feature_color: Color::srgb(0.62, 0.45, 0.38),
                unit_color: Color::srgb(0.85, 0.15, 0.15),
                clear_color: Color::srgb(0.05, 0.07, 0.10),
                camera_speed: 12.0,
                zoom_range: (4.0, 30.0),
                unit_speed: 24,
                travel_speed: 4.0,
            },
            edit: EditSettings {
                elevation: Some(1),
                ..default()
            },
            save_path: "map.hexmap".into(),
        }
    }
}

/// Map plugin: grid creation at startup, chunk upload, input and units.
pub struct HexMapPlugin(pub HexMapConfig);

impl Plugin for HexMapPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<HexMapConfig>()
            .register_type::<ChunkLayer>()
            .register_type::<UnitMarker>()
            .register_type::<entities::Travel>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.view.clear_color))
            .add_message::<MapEvent>()
            .init_resource::<entities::ChunkEntities>()
            .init_resource::<entities::EditorState>()
            .init_resource::<entities::Selection>()
            .init_resource::<entities::RecolorTerrain>()
            .add_systems(
                Startup,
                (
                    startup_systems::create_map,
                    startup_systems::spawn_camera,
                    startup_systems::create_assets,
                ),
            )
            .add_systems(
                Update,
                (
                    systems::tick_map,
                    systems::recolor_terrain,
                    systems::forward_map_events,
                    systems::sync_units,
                )
                    .chain(),
            )
            .add_systems(Update, systems::log_map_events.after(systems::forward_map_events))
            .add_systems(Update, systems::move_camera)
            .add_systems(Update, systems::save_or_load)
            .add_systems(Update, systems::toggle_play_mode)
            .add_systems(
                Update,
                (systems::edit_map, systems::place_units)
                    .before(systems::tick_map)
                    .run_if(in_state(GameState::Editing)),
            )
            .add_systems(
                Update,
                (
                    systems::select_and_move_units.before(systems::tick_map),
                    systems::draw_path,
                )
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(Update, systems::animate_travel.after(systems::sync_units))
            .add_systems(OnEnter(GameState::Editing), systems::mark_recolor)
            .add_systems(OnEnter(GameState::Playing), systems::mark_recolor);
    }
}
