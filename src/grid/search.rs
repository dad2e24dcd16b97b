//! Turn-based path search and range-limited visibility.
//!
//! Both walks share the grid's [`PriorityFrontier`](crate::frontier::PriorityFrontier)
//! and the per-cell scratch fields. Each run advances the search epoch by two:
//! a cell stamped with the epoch is on the frontier, one stamped with
//! `epoch + 1` is finalized, anything older is unvisited.

use bevy::log::warn;

use crate::coordinates::HexDirection;
use crate::metrics::HexEdgeType;

use super::{CurrentPath, HexGrid};

impl HexGrid {
    /// Searches for the cheapest path and remembers it as the current path.
    ///
    /// Movement costs 1 along roads, otherwise 5 on flat and 10 on sloped
    /// edges plus the destination's feature levels. A step that would cross
    /// into the next turn costs the rest of the current turn too.
    pub fn find_path(&mut self, from: usize, to: usize, speed: i32) -> bool {
        self.clear_path();
        if speed <= 0 {
            warn!("Path search with non-positive speed {speed}");
            return false;
        }
        let steps = if self.search(from, to, speed) {
            self.trace_path(from, to)
        } else {
            Vec::new()
        };
        let exists = !steps.is_empty();
        self.current_path = Some(CurrentPath { from, to, steps });
        exists
    }

    /// A path was found by the last [`Self::find_path`].
    pub fn has_path(&self) -> bool {
        self.current_path.as_ref().is_some_and(|p| !p.steps.is_empty())
    }

    /// Start and goal of the last [`Self::find_path`], found or not.
    pub fn path_endpoints(&self) -> Option<(usize, usize)> {
        self.current_path.as_ref().map(|p| (p.from, p.to))
    }

    /// Forgets the current path.
    pub fn clear_path(&mut self) {
        self.current_path = None;
    }

    /// Cells of the current path from start to goal, in a pooled list.
    pub fn path_cells(&mut self) -> Option<Vec<usize>> {
        let path = self.current_path.as_ref().filter(|p| !p.steps.is_empty())?;
        let mut cells = self.cell_lists.get();
        cells.extend(path.steps.iter().map(|&(cell, _)| cell));
        Some(cells)
    }

    /// Turn in which each cell of the current path is reached, start excluded.
    pub fn path_turns(&self, speed: i32) -> Vec<(usize, i32)> {
        let Some(path) = self.current_path.as_ref() else {
            return Vec::new();
        };
        let speed = speed.max(1);
        path.steps
            .iter()
            .skip(1)
            .map(|&(cell, distance)| (cell, (distance - 1) / speed))
            .collect()
    }

    /// Follows the search links back from `to`, returning the steps in travel
    /// order. Empty when the chain does not reach `from`.
    fn trace_path(&self, from: usize, to: usize) -> Vec<(usize, i32)> {
        let mut steps = Vec::new();
        let mut current = to;
        loop {
            steps.push((current, self.cells[current].distance));
            if current == from {
                break;
            }
            match self.cells[current].path_from {
                Some(previous) => current = previous,
                None => return Vec::new(),
            }
        }
        steps.reverse();
        steps
    }

    /// Cost from the source of the most recent walk, if the cell was reached.
    pub fn cell_distance(&self, index: usize) -> Option<i32> {
        let cell = self.cells.get(index)?;
        (self.search_phase > 0 && cell.search_phase >= self.search_phase).then_some(cell.distance)
    }

    fn begin_walk(&mut self, from: usize) {
        self.search_phase += 2;
        self.frontier.clear();
        let cell = &mut self.cells[from];
        cell.search_phase = self.search_phase;
        cell.distance = 0;
        cell.search_heuristic = 0;
        cell.path_from = None;
        self.frontier.enqueue(self.cells.as_mut_slice(), from);
    }

    fn search(&mut self, from: usize, to: usize, speed: i32) -> bool {
        self.begin_walk(from);
        let goal = self.cells[to].coordinates;

        while let Some(current) = self.frontier.dequeue(self.cells.as_mut_slice()) {
            self.cells[current].search_phase += 1;
            if current == to {
                return true;
            }

            let current_distance = self.cells[current].distance;
            let current_turn = (current_distance - 1) / speed;

            for direction in HexDirection::ALL {
                let Some(neighbor) = self.cells[current].neighbor(direction) else {
                    continue;
                };
                let (c, n) = (&self.cells[current], &self.cells[neighbor]);
                if n.search_phase > self.search_phase || n.is_underwater() || n.unit.is_some() {
                    continue;
                }
                let edge_type = c.edge_type_to(n);
                if edge_type == HexEdgeType::Cliff {
                    continue;
                }

                let move_cost = if c.has_road_through_edge(direction) {
                    1
                } else if c.walled != n.walled {
                    continue;
                } else {
                    let terrain = if edge_type == HexEdgeType::Flat { 5 } else { 10 };
                    terrain + n.urban_level + n.farm_level + n.plant_level
                };

                let mut distance = current_distance + move_cost;
                let turn = (distance - 1) / speed;
                if turn > current_turn {
                    distance = turn * speed + move_cost;
                }

                let heuristic = goal.distance_to(n.coordinates);
                self.relax(current, neighbor, distance, heuristic);
            }
        }
        false
    }

    /// Offers `distance` to `neighbor` through `current`.
    fn relax(&mut self, current: usize, neighbor: usize, distance: i32, heuristic: i32) {
        let n = &mut self.cells[neighbor];
        if n.search_phase < self.search_phase {
            n.search_phase = self.search_phase;
            n.distance = distance;
            n.path_from = Some(current);
            n.search_heuristic = heuristic;
            self.frontier.enqueue(self.cells.as_mut_slice(), neighbor);
        } else if distance < n.distance {
            let old_priority = n.search_priority().max(0) as usize;
            n.distance = distance;
            n.path_from = Some(current);
            self.frontier
                .change_priority(self.cells.as_mut_slice(), neighbor, old_priority);
        }
    }

    /// Cells within `range` steps of `from`, in a pooled list.
    ///
    /// The walk does not enter water or cross cliffs.
    pub fn visible_cells(&mut self, from: usize, range: i32) -> Vec<usize> {
        let mut visible = self.cell_lists.get();
        self.begin_walk(from);

        while let Some(current) = self.frontier.dequeue(self.cells.as_mut_slice()) {
            self.cells[current].search_phase += 1;
            visible.push(current);

            let distance = self.cells[current].distance + 1;
            if distance > range {
                continue;
            }
            for direction in HexDirection::ALL {
                let Some(neighbor) = self.cells[current].neighbor(direction) else {
                    continue;
                };
                let (c, n) = (&self.cells[current], &self.cells[neighbor]);
                if n.search_phase > self.search_phase
                    || n.is_underwater()
                    || c.edge_type_to(n) == HexEdgeType::Cliff
                {
                    continue;
                }
                self.relax(current, neighbor, distance, 0);
            }
        }
        visible
    }

    /// Adds one viewer to every cell visible from `from`.
    pub fn increase_visibility(&mut self, from: usize, range: i32) {
        let cells = self.visible_cells(from, range);
        for &index in &cells {
            let cell = &mut self.cells[index];
            cell.visibility += 1;
            if cell.visibility == 1 {
                self.shader_data.refresh_visibility(index, true);
            }
        }
        self.cell_lists.add(cells);
    }

    /// Removes one viewer from every cell visible from `from`.
    pub fn decrease_visibility(&mut self, from: usize, range: i32) {
        let cells = self.visible_cells(from, range);
        for &index in &cells {
            let cell = &mut self.cells[index];
            if cell.visibility == 0 {
                continue;
            }
            cell.visibility -= 1;
            if cell.visibility == 0 {
                self.shader_data.refresh_visibility(index, false);
            }
        }
        self.cell_lists.add(cells);
    }
}
