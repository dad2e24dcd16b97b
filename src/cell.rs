//! Arena node of the hex grid.
//!
//! A [`HexCell`] holds terrain attributes, the indices of its six neighbors
//! and scratch state for graph searches. Attribute setters that must keep
//! neighbors consistent (elevation, rivers, roads) live on
//! [`HexGrid`](crate::grid::HexGrid); the cell itself only exposes reads.

use std::io::{self, Read, Write};

use bevy::prelude::*;

use crate::coordinates::{HexCoordinates, HexDirection};
use crate::frontier::FrontierLinks;
use crate::grid::UnitId;
use crate::metrics::{self, HexEdgeType};

/// One hex cell.
#[derive(Clone, Debug)]
pub struct HexCell {
    pub(crate) index: usize,
    pub(crate) coordinates: HexCoordinates,
    pub(crate) chunk: usize,
    pub(crate) position: Vec3,
    pub(crate) neighbors: [Option<usize>; 6],

    pub(crate) elevation: i32,
    pub(crate) water_level: i32,
    pub(crate) terrain_type: u8,
    pub(crate) urban_level: i32,
    pub(crate) farm_level: i32,
    pub(crate) plant_level: i32,
    pub(crate) special_index: i32,
    pub(crate) walled: bool,
    pub(crate) roads: [bool; 6],
    pub(crate) incoming_river: Option<HexDirection>,
    pub(crate) outgoing_river: Option<HexDirection>,

    pub(crate) visibility: i32,
    pub(crate) unit: Option<UnitId>,

    // Search scratch, valid only while `search_phase` matches the grid's epoch.
    pub(crate) distance: i32,
    pub(crate) search_heuristic: i32,
    pub(crate) search_phase: u32,
    pub(crate) path_from: Option<usize>,
    pub(crate) next_with_same_priority: Option<usize>,
}

impl HexCell {
    pub(crate) fn new(index: usize, coordinates: HexCoordinates, chunk: usize, position: Vec3) -> Self {
        Self {
            index,
            coordinates,
            chunk,
            position,
            neighbors: [None; 6],
            elevation: 0,
            water_level: 0,
            terrain_type: 0,
            urban_level: 0,
            farm_level: 0,
            plant_level: 0,
            special_index: 0,
            walled: false,
            roads: [false; 6],
            incoming_river: None,
            outgoing_river: None,
            visibility: 0,
            unit: None,
            distance: 0,
            search_heuristic: 0,
            search_phase: 0,
            path_from: None,
            next_with_same_priority: None,
        }
    }

    // ── Identity ────────────────────────────────────────────────────

    /// Row-major index in the grid's cell array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cube coordinate.
    pub fn coordinates(&self) -> HexCoordinates {
        self.coordinates
    }

    /// Index of the chunk that triangulates this cell.
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// World position of the cell center, including the noise height offset.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Neighbor index in `direction`, `None` at the map border.
    pub fn neighbor(&self, direction: HexDirection) -> Option<usize> {
        self.neighbors[direction.index()]
    }

    // ── Attributes ──────────────────────────────────────────────────

    /// Elevation level.
    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    /// Water surface level; the cell is flooded when above the elevation.
    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    /// Terrain palette index.
    pub fn terrain_type(&self) -> u8 {
        self.terrain_type
    }

    /// Urban feature density, 0 to 3.
    pub fn urban_level(&self) -> i32 {
        self.urban_level
    }

    /// Farm feature density, 0 to 3.
    pub fn farm_level(&self) -> i32 {
        self.farm_level
    }

    /// Plant feature density, 0 to 3.
    pub fn plant_level(&self) -> i32 {
        self.plant_level
    }

    /// Landmark id, 0 for none.
    pub fn special_index(&self) -> i32 {
        self.special_index
    }

    /// Whether a landmark occupies the cell.
    pub fn is_special(&self) -> bool {
        self.special_index > 0
    }

    /// Whether the cell is enclosed by walls.
    pub fn walled(&self) -> bool {
        self.walled
    }

    /// Water level above elevation.
    pub fn is_underwater(&self) -> bool {
        self.water_level > self.elevation
    }

    /// Visibility counter; one per unit currently seeing this cell.
    pub fn visibility(&self) -> i32 {
        self.visibility
    }

    /// Seen by at least one unit.
    pub fn is_visible(&self) -> bool {
        self.visibility > 0
    }

    /// Unit standing on this cell.
    pub fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    // ── Heights ─────────────────────────────────────────────────────

    /// Height of the river bed through this cell.
    pub fn stream_bed_y(&self) -> f32 {
        metrics::stream_bed_y(self.elevation)
    }

    /// Height of a river surface through this cell.
    pub fn river_surface_y(&self) -> f32 {
        metrics::river_surface_y(self.elevation)
    }

    /// Height of the standing water surface over this cell.
    pub fn water_surface_y(&self) -> f32 {
        metrics::water_surface_y(self.water_level)
    }

    /// Connection shape toward `other`.
    pub fn edge_type_to(&self, other: &HexCell) -> HexEdgeType {
        metrics::edge_type(self.elevation, other.elevation)
    }

    // ── Rivers ──────────────────────────────────────────────────────

    /// Edge a river flows in through.
    pub fn incoming_river(&self) -> Option<HexDirection> {
        self.incoming_river
    }

    /// Edge a river flows out through.
    pub fn outgoing_river(&self) -> Option<HexDirection> {
        self.outgoing_river
    }

    /// Any river touches the cell.
    pub fn has_river(&self) -> bool {
        self.incoming_river.is_some() || self.outgoing_river.is_some()
    }

    /// A river starts or ends here (exactly one of incoming/outgoing).
    pub fn has_river_begin_or_end(&self) -> bool {
        self.incoming_river.is_some() != self.outgoing_river.is_some()
    }

    /// Direction of the only river edge when [`Self::has_river_begin_or_end`].
    pub fn river_begin_or_end_direction(&self) -> Option<HexDirection> {
        self.incoming_river.or(self.outgoing_river)
    }

    /// A river crosses the edge in `direction`.
    pub fn has_river_through_edge(&self, direction: HexDirection) -> bool {
        self.incoming_river == Some(direction) || self.outgoing_river == Some(direction)
    }

    // ── Roads ───────────────────────────────────────────────────────

    /// A road crosses the edge in `direction`.
    pub fn has_road_through_edge(&self, direction: HexDirection) -> bool {
        self.roads[direction.index()]
    }

    /// Any road leaves the cell.
    pub fn has_roads(&self) -> bool {
        self.roads.iter().any(|&r| r)
    }

    /// Road flags as a 6-bit mask, bit `i` for direction index `i`.
    pub fn road_mask(&self) -> u8 {
        self.roads
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r)
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    // ── Search ──────────────────────────────────────────────────────

    /// Cost from the last search source; stale unless the cell was reached in
    /// the most recent search.
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Distance plus heuristic of the most recent search.
    pub fn search_priority(&self) -> i32 {
        self.distance + self.search_heuristic
    }

    /// Predecessor on the most recent search tree.
    pub fn path_from(&self) -> Option<usize> {
        self.path_from
    }

    pub(crate) fn record(&self) -> CellRecord {
        CellRecord {
            terrain_type: self.terrain_type,
            elevation: saturating_byte(self.elevation, "elevation"),
            water_level: saturating_byte(self.water_level, "water level"),
            urban_level: saturating_byte(self.urban_level, "urban level"),
            farm_level: saturating_byte(self.farm_level, "farm level"),
            plant_level: saturating_byte(self.plant_level, "plant level"),
            special_index: saturating_byte(self.special_index, "special index"),
            walled: self.walled,
            incoming_river: self.incoming_river,
            outgoing_river: self.outgoing_river,
            roads: self.road_mask(),
        }
    }

    /// Overwrites every persisted attribute without validation.
    pub(crate) fn apply_record(&mut self, record: &CellRecord) {
        self.terrain_type = record.terrain_type;
        self.elevation = i32::from(record.elevation);
        self.water_level = i32::from(record.water_level);
        self.urban_level = i32::from(record.urban_level);
        self.farm_level = i32::from(record.farm_level);
        self.plant_level = i32::from(record.plant_level);
        self.special_index = i32::from(record.special_index);
        self.walled = record.walled;
        self.incoming_river = record.incoming_river;
        self.outgoing_river = record.outgoing_river;
        for (i, road) in self.roads.iter_mut().enumerate() {
            *road = record.roads & (1 << i) != 0;
        }
    }
}

/// Record bytes hold `0..=255`; values outside are saturated with a warning.
fn saturating_byte(value: i32, what: &str) -> u8 {
    let clamped = value.clamp(0, i32::from(u8::MAX));
    if clamped != value {
        warn!("Saving {what} {value} as {clamped}");
    }
    clamped as u8
}

impl FrontierLinks for [HexCell] {
    fn priority(&self, item: usize) -> usize {
        self[item].search_priority().max(0) as usize
    }

    fn next_with_same_priority(&self, item: usize) -> Option<usize> {
        self[item].next_with_same_priority
    }

    fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>) {
        self[item].next_with_same_priority = next;
    }
}

/// Persisted form of a cell: eleven bytes on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CellRecord {
    pub(crate) terrain_type: u8,
    pub(crate) elevation: u8,
    pub(crate) water_level: u8,
    pub(crate) urban_level: u8,
    pub(crate) farm_level: u8,
    pub(crate) plant_level: u8,
    pub(crate) special_index: u8,
    pub(crate) walled: bool,
    pub(crate) incoming_river: Option<HexDirection>,
    pub(crate) outgoing_river: Option<HexDirection>,
    pub(crate) roads: u8,
}

impl CellRecord {
    /// Size of one record in bytes.
    pub(crate) const SIZE: usize = 11;

    /// Rivers are stored as `0` for none or `direction + 128`.
    fn encode_river(river: Option<HexDirection>) -> u8 {
        river.map_or(0, |d| d.index() as u8 + 128)
    }

    fn decode_river(byte: u8) -> Option<HexDirection> {
        (byte >= 128).then(|| HexDirection::from_index(usize::from(byte - 128)))
    }

    /// Writes the eleven record bytes.
    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[
            self.terrain_type,
            self.elevation,
            self.water_level,
            self.urban_level,
            self.farm_level,
            self.plant_level,
            self.special_index,
            u8::from(self.walled),
            Self::encode_river(self.incoming_river),
            Self::encode_river(self.outgoing_river),
            self.roads,
        ])
    }

    /// Reads a record written by [`Self::write_to`].
    pub(crate) fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut b = [0u8; Self::SIZE];
        reader.read_exact(&mut b)?;
        Ok(Self {
            terrain_type: b[0],
            elevation: b[1],
            water_level: b[2],
            urban_level: b[3],
            farm_level: b[4],
            plant_level: b[5],
            special_index: b[6],
            walled: b[7] != 0,
            incoming_river: Self::decode_river(b[8]),
            outgoing_river: Self::decode_river(b[9]),
            roads: b[10] & 0b11_1111,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> HexCell {
        HexCell::new(0, HexCoordinates::new(0, 0), 0, Vec3::ZERO)
    }

    #[test]
    fn underwater_only_when_water_above_ground() {
        let mut c = cell();
        c.elevation = 2;
        c.water_level = 2;
        assert!(!c.is_underwater());
        c.water_level = 3;
        assert!(c.is_underwater());
    }

    #[test]
    fn river_begin_or_end() {
        let mut c = cell();
        c.incoming_river = Some(HexDirection::W);
        assert!(c.has_river_begin_or_end());
        assert_eq!(c.river_begin_or_end_direction(), Some(HexDirection::W));
        c.outgoing_river = Some(HexDirection::E);
        assert!(!c.has_river_begin_or_end());
        assert!(c.has_river_through_edge(HexDirection::E));
        assert!(!c.has_river_through_edge(HexDirection::NE));
    }

    #[test]
    fn road_mask_matches_flags() {
        let mut c = cell();
        c.roads[HexDirection::SW.index()] = true;
        c.roads[HexDirection::E.index()] = true;
        assert_eq!(c.road_mask(), 0b01_0001);
        assert!(c.has_roads());
    }

    #[test]
    fn record_bytes_round_trip() {
        let mut c = cell();
        c.terrain_type = 3;
        c.elevation = 4;
        c.water_level = 2;
        c.urban_level = 1;
        c.farm_level = 2;
        c.plant_level = 3;
        c.special_index = 0;
        c.walled = true;
        c.incoming_river = Some(HexDirection::NW);
        c.roads[HexDirection::SE.index()] = true;

        let mut buf = Vec::new();
        c.record().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), CellRecord::SIZE);
        assert_eq!(buf[8], 128 + 2);
        assert_eq!(buf[9], 0);

        let record = CellRecord::read_from(&mut buf.as_slice()).unwrap();
        let mut restored = cell();
        restored.apply_record(&record);
        assert_eq!(restored.record(), c.record());
        assert!(restored.has_road_through_edge(HexDirection::SE));
    }

    #[test]
    fn out_of_byte_values_saturate() {
        let mut c = cell();
        c.elevation = -1;
        c.water_level = 300;
        c.urban_level = 256;
        c.special_index = 255;
        let record = c.record();
        assert_eq!(record.elevation, 0);
        assert_eq!(record.water_level, 255);
        assert_eq!(record.urban_level, 255);
        assert_eq!(record.special_index, 255);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let buf = [0u8; 5];
        assert!(CellRecord::read_from(&mut buf.as_slice()).is_err());
    }
}
