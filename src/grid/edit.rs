//! Cell attribute setters.
//!
//! Every setter is a no-op when the value is unchanged. Setters that affect
//! the shape of neighboring geometry refresh neighbor chunks too; feature-only
//! changes refresh the cell's own chunk.

use crate::coordinates::HexDirection;
use crate::metrics;

use super::HexGrid;

impl HexGrid {
    /// Sets the elevation, moves the cell center and drops rivers and roads
    /// that the new height invalidates.
    ///
    /// Saved maps store elevation in one byte, so only `0..=255` survives a
    /// save; other values are saturated when written.
    pub fn set_elevation(&mut self, index: usize, elevation: i32) {
        if self.cells[index].elevation == elevation {
            return;
        }
        self.cells[index].elevation = elevation;

        let mut position = self.cells[index].position;
        position.y =
            metrics::elevation_height(elevation) + self.metrics.elevation_perturbation(position);
        self.cells[index].position = position;

        self.validate_rivers(index);
        for direction in HexDirection::ALL {
            if self.cells[index].roads[direction.index()]
                && self.elevation_difference(index, direction) > 1
            {
                self.set_road(index, direction, false);
            }
        }
        self.refresh(index);
    }

    /// Sets the water level. A cell that ends up underwater loses both of its
    /// rivers; otherwise only the rivers the new level invalidates are dropped.
    pub fn set_water_level(&mut self, index: usize, water_level: i32) {
        if self.cells[index].water_level == water_level {
            return;
        }
        self.cells[index].water_level = water_level;
        if self.cells[index].is_underwater() {
            self.remove_river(index);
        } else {
            self.validate_rivers(index);
        }
        self.refresh(index);
    }

    /// Sets the terrain palette index. Only the shading data changes.
    pub fn set_terrain_type(&mut self, index: usize, terrain_type: u8) {
        if self.cells[index].terrain_type == terrain_type {
            return;
        }
        self.cells[index].terrain_type = terrain_type;
        self.shader_data.refresh_terrain(index, terrain_type);
    }

    /// Urban feature density. Like every level, stored in one byte when saved.
    pub fn set_urban_level(&mut self, index: usize, level: i32) {
        if self.cells[index].urban_level != level {
            self.cells[index].urban_level = level;
            self.refresh_self_only(index);
        }
    }

    /// Farm feature density.
    pub fn set_farm_level(&mut self, index: usize, level: i32) {
        if self.cells[index].farm_level != level {
            self.cells[index].farm_level = level;
            self.refresh_self_only(index);
        }
    }

    /// Plant feature density.
    pub fn set_plant_level(&mut self, index: usize, level: i32) {
        if self.cells[index].plant_level != level {
            self.cells[index].plant_level = level;
            self.refresh_self_only(index);
        }
    }

    /// Places a landmark. Ignored on cells with a river; clears the cell's roads.
    pub fn set_special_index(&mut self, index: usize, special_index: i32) {
        let cell = &self.cells[index];
        if cell.special_index == special_index || cell.has_river() {
            return;
        }
        self.cells[index].special_index = special_index;
        self.remove_roads(index);
        self.refresh_self_only(index);
    }

    /// Encloses the cell with walls.
    pub fn set_walled(&mut self, index: usize, walled: bool) {
        if self.cells[index].walled != walled {
            self.cells[index].walled = walled;
            self.refresh(index);
        }
    }

    // ── Rivers ──────────────────────────────────────────────────────

    /// Whether a river may flow from `from` into `to`.
    ///
    /// Rivers flow downhill or level, or out of a lake into a cell whose
    /// elevation matches the lake surface.
    pub fn is_valid_river_destination(&self, from: usize, to: Option<usize>) -> bool {
        let Some(to) = to else { return false };
        let (from, to) = (&self.cells[from], &self.cells[to]);
        from.elevation >= to.elevation || from.water_level == to.elevation
    }

    /// Starts a river leaving `index` through `direction`.
    ///
    /// Returns `false` when the neighbor is missing or uphill. Any previous
    /// outgoing river is replaced, a river flowing in through the same edge is
    /// removed, both endpoints lose their landmark and a road on that edge is
    /// removed.
    pub fn set_outgoing_river(&mut self, index: usize, direction: HexDirection) -> bool {
        if self.cells[index].outgoing_river == Some(direction) {
            return true;
        }
        let neighbor = self.cells[index].neighbor(direction);
        if !self.is_valid_river_destination(index, neighbor) {
            return false;
        }
        let Some(neighbor) = neighbor else { return false };

        self.remove_outgoing_river(index);
        if self.cells[index].incoming_river == Some(direction) {
            self.remove_incoming_river(index);
        }
        self.cells[index].outgoing_river = Some(direction);
        self.cells[index].special_index = 0;

        self.remove_incoming_river(neighbor);
        self.cells[neighbor].incoming_river = Some(direction.opposite());
        self.cells[neighbor].special_index = 0;

        self.set_road(index, direction, false);
        true
    }

    /// Removes both river ends of the cell.
    pub fn remove_river(&mut self, index: usize) {
        self.remove_incoming_river(index);
        self.remove_outgoing_river(index);
    }

    fn remove_outgoing_river(&mut self, index: usize) {
        let Some(direction) = self.cells[index].outgoing_river.take() else {
            return;
        };
        self.refresh_self_only(index);
        if let Some(neighbor) = self.cells[index].neighbor(direction) {
            self.cells[neighbor].incoming_river = None;
            self.refresh_self_only(neighbor);
        }
    }

    fn remove_incoming_river(&mut self, index: usize) {
        let Some(direction) = self.cells[index].incoming_river.take() else {
            return;
        };
        self.refresh_self_only(index);
        if let Some(neighbor) = self.cells[index].neighbor(direction) {
            self.cells[neighbor].outgoing_river = None;
            self.refresh_self_only(neighbor);
        }
    }

    fn validate_rivers(&mut self, index: usize) {
        if let Some(direction) = self.cells[index].outgoing_river {
            let neighbor = self.cells[index].neighbor(direction);
            if !self.is_valid_river_destination(index, neighbor) {
                self.remove_outgoing_river(index);
            }
        }
        if let Some(direction) = self.cells[index].incoming_river {
            let valid = self.cells[index]
                .neighbor(direction)
                .is_some_and(|n| self.is_valid_river_destination(n, Some(index)));
            if !valid {
                self.remove_incoming_river(index);
            }
        }
    }

    // ── Roads ───────────────────────────────────────────────────────

    /// Adds a road through `direction`.
    ///
    /// Rejected (returning `false`, nothing marked dirty) at the map border,
    /// across a river or a cliff of more than one level, or when either end
    /// holds a landmark.
    pub fn add_road(&mut self, index: usize, direction: HexDirection) -> bool {
        let cell = &self.cells[index];
        let Some(neighbor) = cell.neighbor(direction) else {
            return false;
        };
        if cell.has_road_through_edge(direction)
            || cell.has_river_through_edge(direction)
            || cell.is_special()
            || self.cells[neighbor].is_special()
            || self.elevation_difference(index, direction) > 1
        {
            return false;
        }
        self.set_road(index, direction, true);
        true
    }

    /// Removes every road of the cell.
    pub fn remove_roads(&mut self, index: usize) {
        for direction in HexDirection::ALL {
            if self.cells[index].roads[direction.index()] {
                self.set_road(index, direction, false);
            }
        }
    }

    fn set_road(&mut self, index: usize, direction: HexDirection, state: bool) {
        self.cells[index].roads[direction.index()] = state;
        if let Some(neighbor) = self.cells[index].neighbor(direction) {
            self.cells[neighbor].roads[direction.opposite().index()] = state;
            self.refresh_self_only(neighbor);
        }
        self.refresh_self_only(index);
    }

    fn elevation_difference(&self, index: usize, direction: HexDirection) -> i32 {
        self.cells[index].neighbor(direction).map_or(0, |n| {
            (self.cells[index].elevation - self.cells[n].elevation).abs()
        })
    }
}
