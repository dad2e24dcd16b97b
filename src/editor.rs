//! Brush edits driven by pointer input.
//!
//! [`MapEditor`] turns a stream of "pointer is over cell N" samples into
//! grid edits. Consecutive samples on neighboring cells form a drag, which
//! draws rivers and roads from the previous cell into the current one.

use bevy::prelude::*;

use crate::coordinates::HexDirection;
use crate::grid::HexGrid;

/// Three-way switch for features that can be added, removed or left alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub enum OptionalToggle {
    /// Leave as is.
    #[default]
    Ignore,
    /// Add (rivers and roads only while dragging).
    Yes,
    /// Remove.
    No,
}

/// What a brush stroke applies. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Reflect)]
pub struct EditSettings {
    /// Elevation to set.
    pub elevation: Option<i32>,
    /// Water level to set.
    pub water_level: Option<i32>,
    /// Urban density to set.
    pub urban_level: Option<i32>,
    /// Farm density to set.
    pub farm_level: Option<i32>,
    /// Plant density to set.
    pub plant_level: Option<i32>,
    /// Landmark to set; 0 clears it.
    pub special_index: Option<i32>,
    /// Terrain palette index to set.
    pub terrain_type: Option<u8>,
    /// Brush radius in cells; 0 edits a single cell.
    pub brush_size: u32,
    /// River mode.
    pub river: OptionalToggle,
    /// Road mode.
    pub road: OptionalToggle,
    /// Wall mode.
    pub walled: OptionalToggle,
}

/// Drag state between input samples.
#[derive(Clone, Debug, Default)]
pub struct MapEditor {
    previous_cell: Option<usize>,
    drag_direction: Option<HexDirection>,
}

impl MapEditor {
    /// Applies `settings` around the cell under the pointer, if any.
    pub fn handle_input(&mut self, grid: &mut HexGrid, settings: &EditSettings, cell: Option<usize>) {
        let Some(current) = cell else {
            self.release();
            return;
        };

        self.drag_direction = match self.previous_cell {
            Some(previous) if previous != current => HexDirection::ALL
                .into_iter()
                .find(|&d| grid.cells()[previous].neighbor(d) == Some(current)),
            _ => None,
        };

        self.edit_cells(grid, settings, current);
        self.previous_cell = Some(current);
    }

    /// Ends the current stroke.
    pub fn release(&mut self) {
        self.previous_cell = None;
        self.drag_direction = None;
    }

    /// Direction of the drag in progress.
    pub fn drag_direction(&self) -> Option<HexDirection> {
        self.drag_direction
    }

    /// Applies `settings` to every cell within the brush radius of `center`.
    pub fn edit_cells(&self, grid: &mut HexGrid, settings: &EditSettings, center: usize) {
        let center = grid.cells()[center].coordinates();
        for hex in hexx::shapes::hexagon(center.into(), settings.brush_size) {
            if let Some(index) = grid.cell_at_coordinates(hex.into()) {
                self.edit_cell(grid, settings, index);
            }
        }
    }

    fn edit_cell(&self, grid: &mut HexGrid, settings: &EditSettings, index: usize) {
        if let Some(elevation) = settings.elevation {
            grid.set_elevation(index, elevation);
        }
        if let Some(water_level) = settings.water_level {
            grid.set_water_level(index, water_level);
        }
        if let Some(level) = settings.urban_level {
            grid.set_urban_level(index, level);
        }
        if let Some(level) = settings.farm_level {
            grid.set_farm_level(index, level);
        }
        if let Some(level) = settings.plant_level {
            grid.set_plant_level(index, level);
        }
        if let Some(special) = settings.special_index {
            grid.set_special_index(index, special);
        }
        if let Some(terrain_type) = settings.terrain_type {
            grid.set_terrain_type(index, terrain_type);
        }
        if settings.river == OptionalToggle::No {
            grid.remove_river(index);
        }
        if settings.road == OptionalToggle::No {
            grid.remove_roads(index);
        }
        if settings.walled != OptionalToggle::Ignore {
            grid.set_walled(index, settings.walled == OptionalToggle::Yes);
        }

        let Some(direction) = self.drag_direction else {
            return;
        };
        let Some(other) = grid.cells()[index].neighbor(direction.opposite()) else {
            return;
        };
        if settings.river == OptionalToggle::Yes {
            grid.set_outgoing_river(other, direction);
        }
        if settings.road == OptionalToggle::Yes {
            grid.add_road(other, direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::test_grid;

    const CENTER: usize = 7 * 20 + 10;

    fn east_of(grid: &HexGrid, index: usize) -> usize {
        grid.cells()[index].neighbor(HexDirection::E).unwrap()
    }

    // ── brush ───────────────────────────────────────────────────────

    #[test]
    fn single_cell_brush() {
        let mut grid = test_grid();
        let mut editor = MapEditor::default();
        let settings = EditSettings {
            elevation: Some(2),
            ..default()
        };
        editor.handle_input(&mut grid, &settings, Some(CENTER));
        assert_eq!(grid.cells().iter().filter(|c| c.elevation() == 2).count(), 1);
        assert_eq!(grid.cells()[CENTER].elevation(), 2);
    }

    #[test]
    fn brush_covers_a_hexagon() {
        let mut grid = test_grid();
        let editor = MapEditor::default();
        let settings = EditSettings {
            urban_level: Some(1),
            brush_size: 2,
            ..default()
        };
        editor.edit_cells(&mut grid, &settings, CENTER);
        assert_eq!(grid.cells().iter().filter(|c| c.urban_level() == 1).count(), 19);
    }

    #[test]
    fn brush_is_clipped_at_the_border() {
        let mut grid = test_grid();
        let editor = MapEditor::default();
        let settings = EditSettings {
            plant_level: Some(2),
            brush_size: 1,
            ..default()
        };
        editor.edit_cells(&mut grid, &settings, 0);
        let edited = grid.cells().iter().filter(|c| c.plant_level() == 2).count();
        assert!(edited < 7 && edited >= 3, "{edited}");
    }

    #[test]
    fn toggles_ignore_leaves_cells_alone() {
        let mut grid = test_grid();
        grid.set_walled(CENTER, true);
        let editor = MapEditor::default();
        editor.edit_cells(&mut grid, &EditSettings::default(), CENTER);
        assert!(grid.cells()[CENTER].walled());

        let settings = EditSettings {
            walled: OptionalToggle::No,
            ..default()
        };
        editor.edit_cells(&mut grid, &settings, CENTER);
        assert!(!grid.cells()[CENTER].walled());
    }

    // ── drag ────────────────────────────────────────────────────────

    #[test]
    fn drag_draws_river_and_road() {
        let mut grid = test_grid();
        let mut editor = MapEditor::default();
        let east = east_of(&grid, CENTER);

        let rivers = EditSettings {
            river: OptionalToggle::Yes,
            ..default()
        };
        editor.handle_input(&mut grid, &rivers, Some(CENTER));
        assert_eq!(editor.drag_direction(), None);
        editor.handle_input(&mut grid, &rivers, Some(east));
        assert_eq!(editor.drag_direction(), Some(HexDirection::E));
        assert_eq!(grid.cells()[CENTER].outgoing_river(), Some(HexDirection::E));
        assert_eq!(grid.cells()[east].incoming_river(), Some(HexDirection::W));

        editor.release();
        let roads = EditSettings {
            road: OptionalToggle::Yes,
            ..default()
        };
        let further = east_of(&grid, east);
        editor.handle_input(&mut grid, &roads, Some(east));
        editor.handle_input(&mut grid, &roads, Some(further));
        assert!(grid.cells()[east].has_road_through_edge(HexDirection::E));
    }

    #[test]
    fn jumps_are_not_drags() {
        let mut grid = test_grid();
        let mut editor = MapEditor::default();
        let settings = EditSettings {
            river: OptionalToggle::Yes,
            ..default()
        };
        editor.handle_input(&mut grid, &settings, Some(CENTER));
        editor.handle_input(&mut grid, &settings, Some(CENTER + 3));
        assert_eq!(editor.drag_direction(), None);
        assert!(grid.cells().iter().all(|c| !c.has_river()));
    }

    #[test]
    fn leaving_the_map_ends_the_stroke() {
        let mut grid = test_grid();
        let mut editor = MapEditor::default();
        let settings = EditSettings {
            river: OptionalToggle::Yes,
            ..default()
        };
        editor.handle_input(&mut grid, &settings, Some(CENTER));
        editor.handle_input(&mut grid, &settings, None);
        let east = east_of(&grid, CENTER);
        editor.handle_input(&mut grid, &settings, Some(east));
        assert!(grid.cells().iter().all(|c| !c.has_river()));
    }

    #[test]
    fn removal_modes_clear_features() {
        let mut grid = test_grid();
        assert!(grid.add_road(CENTER, HexDirection::E));
        assert!(grid.set_outgoing_river(CENTER, HexDirection::W));
        let editor = MapEditor::default();
        let settings = EditSettings {
            river: OptionalToggle::No,
            road: OptionalToggle::No,
            ..default()
        };
        editor.edit_cells(&mut grid, &settings, CENTER);
        assert!(!grid.cells()[CENTER].has_river());
        assert!(!grid.cells()[CENTER].has_roads());
    }
}
