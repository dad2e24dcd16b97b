//! Units standing on cells.
//!
//! A unit occupies exactly one cell and sees every cell within
//! [`VISION_RANGE`] steps of it. Adding, moving and removing units keeps the
//! cells' visibility counters in step.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;

use crate::math;

use super::HexGrid;

/// Steps a unit can see.
pub const VISION_RANGE: i32 = 3;

/// Stable handle of a unit; never reused within one grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct UnitId(pub u32);

/// A unit and where it stands.
#[derive(Clone, Debug, PartialEq)]
pub struct HexUnit {
    id: UnitId,
    location: usize,
    orientation: f32,
}

impl HexUnit {
    /// Handle.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Index of the occupied cell.
    pub fn location(&self) -> usize {
        self.location
    }

    /// Rotation about +Y in radians.
    pub fn orientation(&self) -> f32 {
        self.orientation
    }
}

impl HexGrid {
    /// A unit may end its move on dry, unoccupied cells.
    pub fn is_valid_unit_destination(&self, index: usize) -> bool {
        self.cells
            .get(index)
            .is_some_and(|cell| !cell.is_underwater() && cell.unit.is_none())
    }

    /// Places a new unit; `None` when the cell cannot hold it.
    pub fn add_unit(&mut self, index: usize, orientation: f32) -> Option<UnitId> {
        if !self.is_valid_unit_destination(index) {
            return None;
        }
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.cells[index].unit = Some(id);
        self.units.push(HexUnit {
            id,
            location: index,
            orientation,
        });
        self.increase_visibility(index, VISION_RANGE);
        Some(id)
    }

    /// Removes a unit and the sight it provided.
    pub fn remove_unit(&mut self, id: UnitId) -> bool {
        let Some(position) = self.units.iter().position(|u| u.id == id) else {
            return false;
        };
        let unit = self.units.remove(position);
        self.decrease_visibility(unit.location, VISION_RANGE);
        self.cells[unit.location].unit = None;
        true
    }

    /// Removes every unit.
    pub fn clear_units(&mut self) {
        for unit in std::mem::take(&mut self.units) {
            self.decrease_visibility(unit.location, VISION_RANGE);
            self.cells[unit.location].unit = None;
        }
    }

    /// Moves a unit along `path`, which must start at its location and end on
    /// a valid destination.
    ///
    /// Sight is handed over cell by cell; the unit ends facing along the last
    /// step.
    pub fn travel(&mut self, id: UnitId, path: &[usize]) -> bool {
        let Some(slot) = self.units.iter().position(|u| u.id == id) else {
            return false;
        };
        let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
            return false;
        };
        if path.len() < 2 || first != self.units[slot].location || !self.is_valid_unit_destination(last)
        {
            return false;
        }

        self.cells[first].unit = None;
        for step in path.windows(2) {
            self.decrease_visibility(step[0], VISION_RANGE);
            self.increase_visibility(step[1], VISION_RANGE);
        }
        self.cells[last].unit = Some(id);

        let before_last = path[path.len() - 2];
        let heading = self.cells[last].position - self.cells[before_last].position;
        let unit = &mut self.units[slot];
        unit.location = last;
        unit.orientation = math::yaw_towards(heading);
        true
    }

    /// All units in creation order.
    pub fn units(&self) -> &[HexUnit] {
        &self.units
    }

    /// Unit by handle.
    pub fn unit(&self, id: UnitId) -> Option<&HexUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Unit standing on a cell.
    pub fn unit_at(&self, index: usize) -> Option<UnitId> {
        self.cells.get(index).and_then(|cell| cell.unit)
    }

    /// Uniform orientation drawn from the shared random stream.
    pub fn random_orientation(&mut self) -> f32 {
        self.rng.gen_range(0.0..TAU)
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinates::HexDirection;
    use crate::grid::tests::test_grid;

    const CENTER: usize = 7 * 20 + 10;

    #[test]
    fn unit_occupies_cell_and_sees_around_it() {
        let mut grid = test_grid();
        let id = grid.add_unit(CENTER, 0.5).unwrap();
        assert_eq!(grid.unit_at(CENTER), Some(id));
        assert_eq!(grid.cells().iter().filter(|c| c.is_visible()).count(), 37);
        assert!(grid.add_unit(CENTER, 0.0).is_none(), "cell already occupied");
        assert_eq!(grid.unit(id).unwrap().orientation(), 0.5);
    }

    #[test]
    fn units_cannot_stand_in_water() {
        let mut grid = test_grid();
        grid.set_water_level(CENTER, 1);
        assert!(grid.add_unit(CENTER, 0.0).is_none());
        assert!(grid.units().is_empty());
    }

    #[test]
    fn remove_unit_releases_sight() {
        let mut grid = test_grid();
        let id = grid.add_unit(CENTER, 0.0).unwrap();
        assert!(grid.remove_unit(id));
        assert!(!grid.remove_unit(id));
        assert_eq!(grid.unit_at(CENTER), None);
        assert!(grid.cells().iter().all(|c| c.visibility() == 0));
    }

    #[test]
    fn travel_moves_unit_and_sight() {
        let mut grid = test_grid();
        let id = grid.add_unit(CENTER, 0.0).unwrap();
        let goal = 7 * 20 + 14;
        assert!(grid.find_path(CENTER, goal, 24));
        let path = grid.path_cells().unwrap();
        assert!(grid.travel(id, &path));

        assert_eq!(grid.unit_at(CENTER), None);
        assert_eq!(grid.unit_at(goal), Some(id));
        assert_eq!(grid.unit(id).unwrap().location(), goal);
        assert!(grid.cells()[goal].is_visible());
        assert!(!grid.cells()[CENTER - 1].is_visible(), "old surroundings stay dark");
        // Facing east.
        let yaw = grid.unit(id).unwrap().orientation();
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 0.5, "yaw {yaw}");
        grid.recycle_cell_list(path);
    }

    #[test]
    fn travel_rejects_bad_paths() {
        let mut grid = test_grid();
        let id = grid.add_unit(CENTER, 0.0).unwrap();
        let east = grid.cells()[CENTER].neighbor(HexDirection::E).unwrap();
        assert!(!grid.travel(id, &[east, CENTER]), "must start at the unit");
        assert!(!grid.travel(id, &[CENTER]));
        let other = grid.add_unit(east, 0.0).unwrap();
        assert!(!grid.travel(id, &[CENTER, east]), "destination occupied");
        assert!(grid.remove_unit(other));
        assert!(grid.travel(id, &[CENTER, east]));
    }

    #[test]
    fn clear_units_resets_visibility() {
        let mut grid = test_grid();
        grid.add_unit(CENTER, 0.0).unwrap();
        grid.add_unit(3, 0.0).unwrap();
        grid.clear_units();
        assert!(grid.units().is_empty());
        assert!(grid.cells().iter().all(|c| c.visibility() == 0 && c.unit().is_none()));
    }

    #[test]
    fn overlapping_units_clear_to_darkness() {
        let mut grid = test_grid();
        let east = grid.cells()[CENTER].neighbor(HexDirection::E).unwrap();
        grid.add_unit(CENTER, 0.0).unwrap();
        grid.add_unit(east, 0.0).unwrap();
        assert_eq!(grid.cells()[CENTER].visibility(), 2);
        assert_eq!(grid.cells()[east].visibility(), 2);

        grid.clear_units();
        assert!(grid.cells().iter().all(|c| c.visibility() == 0));
        assert_eq!(grid.shader_data().texel(CENTER)[0], 0);
        assert_eq!(grid.shader_data().texel(east)[0], 0);
    }

    #[test]
    fn unit_changes_keep_the_current_path() {
        let mut grid = test_grid();
        let goal = 7 * 20 + 14;
        assert!(grid.find_path(CENTER, goal, 24));
        let expected = grid.path_cells().unwrap();

        let walker = grid.add_unit(CENTER - 20, 0.0).unwrap();
        let steps = [CENTER - 20, CENTER - 19];
        assert!(grid.travel(walker, &steps));
        let idle = grid.add_unit(CENTER + 20, 0.0).unwrap();
        assert!(grid.remove_unit(idle));

        assert!(grid.has_path());
        assert_eq!(grid.path_cells(), Some(expected.clone()));
        assert_eq!(grid.path_turns(24).last().map(|&(cell, _)| cell), Some(goal));
        grid.recycle_cell_list(expected);
    }

    #[test]
    fn random_orientation_is_an_angle() {
        let mut grid = test_grid();
        for _ in 0..20 {
            let angle = grid.random_orientation();
            assert!((0.0..std::f32::consts::TAU).contains(&angle));
        }
    }
}
