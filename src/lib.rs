#![warn(missing_docs)]
//! Editable hex terrain.
//!
//! A [`grid::HexGrid`] of cells with elevation, water, rivers, roads, walls
//! and props is triangulated chunk by chunk into blended terrain meshes,
//! searched for unit paths and swept for unit visibility. The
//! [`terrain::HexMapPlugin`] hosts it inside a Bevy app.

pub mod cell;
pub mod chunk;
pub mod coordinates;
pub mod editor;
pub mod features;
pub mod frontier;
pub mod grid;
pub mod list_pool;
pub mod math;
pub mod mesh;
pub mod metrics;
pub mod terrain;

use bevy::prelude::*;

/// Application-wide interaction state, used for system scheduling.
#[derive(States, Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Brush edits and unit placement.
    #[default]
    Editing,
    /// Unit selection, path search and travel under fog of war.
    Playing,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}
