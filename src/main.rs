#![warn(missing_docs)]
//! Hex map viewer and editor.
//!
//! Left drag paints with the configured brush, U places units (Shift+U
//! removes them), M switches to play mode where units are selected with a
//! left click and sent along the shown path with a right click. F5 saves,
//! F9 loads, Tab opens the inspector.

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_inspector_egui::quick::WorldInspectorPlugin;
#[cfg(feature = "native")]
use clap::Parser;

use hex_map::GameState;
use hex_map::terrain::{HexMapConfig, HexMapPlugin};

#[cfg(feature = "native")]
#[derive(Parser, Debug)]
#[command(name = "hex-map")]
#[command(about = "Edit and explore a hex terrain map")]
struct Args {
    /// Cells per row (multiple of 5)
    #[arg(short = 'x', long, default_value = "20")]
    cells_x: usize,

    /// Rows (multiple of 5)
    #[arg(short = 'z', long, default_value = "15")]
    cells_z: usize,

    /// Seed of the hash grid and the shared random stream
    #[arg(short, long)]
    seed: Option<u64>,

    /// Map file written by F5 and read by F9
    #[arg(long)]
    map: Option<String>,

    /// Load the map file at startup
    #[arg(long)]
    load: bool,
}

fn main() {
    #[cfg(feature = "native")]
    let (config, load_at_startup) = {
        let args = Args::parse();
        let mut config = HexMapConfig::default();
        config.map.cell_count_x = args.cells_x;
        config.map.cell_count_z = args.cells_z;
        if let Some(seed) = args.seed {
            config.map.seed = seed;
        }
        if let Some(path) = args.map {
            config.save_path = path;
        }
        (config, args.load)
    };
    #[cfg(not(feature = "native"))]
    let (config, load_at_startup) = (HexMapConfig::default(), false);

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Map".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>()
    .add_plugins(RemotePlugin::default())
    .add_plugins(RemoteHttpPlugin::default())
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(HexMapPlugin(config))
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    if load_at_startup {
        app.add_systems(PostStartup, load_map);
    }

    app.run();
}

fn load_map(mut map: ResMut<hex_map::terrain::HexMap>, cfg: Res<HexMapConfig>) {
    if let Err(err) = map.0.load_from_path(&cfg.save_path) {
        error!("Loading {} failed: {err}", cfg.save_path);
    }
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
    mut resume: Local<Option<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        let new_state = match state.get() {
            GameState::Debugging => resume.take().unwrap_or_default(),
            current => {
                *resume = Some(*current);
                GameState::Debugging
            }
        };
        next.set(new_state);
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
