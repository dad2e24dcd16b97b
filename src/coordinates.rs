//! Cube coordinates and the six hex directions.
//!
//! Cells are stored row-major by offset `(col, row)` but addressed by cube
//! coordinates, where only `x` and `z` are stored and `y = -x - z` is derived,
//! so `x + y + z = 0` holds for every value of this type.

use std::fmt;
use std::io::{self, Read, Write};

use bevy::prelude::*;
use hexx::Hex;

use crate::metrics::{INNER_RADIUS, OUTER_RADIUS};

/// One of the six edge directions of a cell.
///
/// "North" points toward decreasing rows (negative world Z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub enum HexDirection {
    /// South-west.
    SW,
    /// West.
    W,
    /// North-west.
    NW,
    /// North-east.
    NE,
    /// East.
    E,
    /// South-east.
    SE,
}

impl HexDirection {
    /// All directions in index order.
    pub const ALL: [HexDirection; 6] = [Self::SW, Self::W, Self::NW, Self::NE, Self::E, Self::SE];

    /// Index in `0..6`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction for an index, wrapping modulo 6.
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// Direction pointing the other way.
    pub const fn opposite(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Counter-clockwise neighbor direction.
    pub const fn previous(self) -> Self {
        Self::from_index(self.index() + 5)
    }

    /// Two steps counter-clockwise.
    pub const fn previous2(self) -> Self {
        Self::from_index(self.index() + 4)
    }

    /// Clockwise neighbor direction.
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Two steps clockwise.
    pub const fn next2(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Cube `(dx, dz)` step to the neighbor in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::SW => (-1, 1),
            Self::W => (-1, 0),
            Self::NW => (0, -1),
            Self::NE => (1, -1),
            Self::E => (1, 0),
            Self::SE => (0, 1),
        }
    }
}

/// Cube coordinate of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub struct HexCoordinates {
    x: i32,
    z: i32,
}

impl HexCoordinates {
    /// Coordinate from the two stored axes.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// X axis.
    pub const fn x(self) -> i32 {
        self.x
    }

    /// Derived third axis, always `-x - z`.
    pub const fn y(self) -> i32 {
        -self.x - self.z
    }

    /// Z axis (equal to the offset row).
    pub const fn z(self) -> i32 {
        self.z
    }

    /// Converts offset `(col, row)` coordinates; odd rows are shifted right.
    pub const fn from_offset(col: i32, row: i32) -> Self {
        Self::new(col - row / 2, row)
    }

    /// Offset column of this coordinate (inverse of [`Self::from_offset`]).
    pub const fn offset_col(self) -> i32 {
        self.x + self.z / 2
    }

    /// Rounds a world position to the coordinate of the cell containing it.
    ///
    /// The two skewed axes are rounded independently; when the three rounded
    /// components no longer sum to zero, the one with the largest rounding
    /// error is rebuilt from the other two.
    pub fn from_position(position: Vec3) -> Self {
        let mut x = position.x / (INNER_RADIUS * 2.0);
        let mut y = -x;
        let offset = position.z / (OUTER_RADIUS * 3.0);
        x -= offset;
        y -= offset;

        let mut ix = x.round() as i32;
        let iy = y.round() as i32;
        let mut iz = (-x - y).round() as i32;

        if ix + iy + iz != 0 {
            let dx = (x - ix as f32).abs();
            let dy = (y - iy as f32).abs();
            let dz = (-x - y - iz as f32).abs();

            if dx > dy && dx > dz {
                ix = -iy - iz;
            } else if dz > dx {
                iz = -ix - iy;
            }
        }

        Self::new(ix, iz)
    }

    /// Row-major index in a grid `width` cells wide, `None` outside it.
    pub fn to_cell_index(self, width: usize, height: usize) -> Option<usize> {
        let col = usize::try_from(self.offset_col()).ok()?;
        let row = usize::try_from(self.z).ok()?;
        (col < width && row < height).then_some(col + row * width)
    }

    /// Hex distance: half the cube Manhattan distance.
    pub fn distance_to(self, other: Self) -> i32 {
        Hex::from(self).distance_to(Hex::from(other))
    }

    /// Coordinate of the neighbor in `direction`.
    pub const fn step(self, direction: HexDirection) -> Self {
        let (dx, dz) = direction.offset();
        Self::new(self.x + dx, self.z + dz)
    }

    /// Writes `x` then `z` as little-endian `i32`.
    pub fn write_to<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.x.to_le_bytes())?;
        writer.write_all(&self.z.to_le_bytes())
    }

    /// Reads a coordinate written by [`Self::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let x = i32::from_le_bytes(buf);
        reader.read_exact(&mut buf)?;
        let z = i32::from_le_bytes(buf);
        Ok(Self::new(x, z))
    }
}

impl From<HexCoordinates> for Hex {
    fn from(c: HexCoordinates) -> Self {
        Hex::new(c.x, c.z)
    }
}

impl From<Hex> for HexCoordinates {
    fn from(hex: Hex) -> Self {
        Self::new(hex.x, hex.y)
    }
}

impl fmt::Display for HexCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y(), self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;

    // ── HexDirection ────────────────────────────────────────────────

    #[test]
    fn opposite_is_an_involution() {
        for d in HexDirection::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
    }

    #[test]
    fn next_and_previous_wrap() {
        assert_eq!(HexDirection::SE.next(), HexDirection::SW);
        assert_eq!(HexDirection::SW.previous(), HexDirection::SE);
        assert_eq!(HexDirection::E.next2(), HexDirection::SW);
        assert_eq!(HexDirection::W.previous2(), HexDirection::E);
        for d in HexDirection::ALL {
            assert_eq!(d.next().previous(), d);
            assert_eq!(d.next2(), d.next().next());
            assert_eq!(d.previous2(), d.previous().previous());
        }
    }

    #[test]
    fn opposite_offsets_cancel() {
        for d in HexDirection::ALL {
            let (ax, az) = d.offset();
            let (bx, bz) = d.opposite().offset();
            assert_eq!((ax + bx, az + bz), (0, 0), "{d:?}");
        }
    }

    // ── HexCoordinates ──────────────────────────────────────────────

    #[test]
    fn cube_components_sum_to_zero() {
        for row in 0..30 {
            for col in 0..30 {
                let c = HexCoordinates::from_offset(col, row);
                assert_eq!(c.x() + c.y() + c.z(), 0);
                assert_eq!(c.offset_col(), col);
            }
        }
    }

    #[test]
    fn cell_index_respects_bounds() {
        assert_eq!(HexCoordinates::from_offset(3, 2).to_cell_index(20, 15), Some(43));
        assert_eq!(HexCoordinates::from_offset(19, 14).to_cell_index(20, 15), Some(299));
        assert_eq!(HexCoordinates::from_offset(20, 0).to_cell_index(20, 15), None);
        assert_eq!(HexCoordinates::new(0, -1).to_cell_index(20, 15), None);
        assert_eq!(HexCoordinates::new(-1, 0).to_cell_index(20, 15), None);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let c = HexCoordinates::new(0, 0);
        assert_eq!(c.distance_to(c), 0);
    }

    #[test]
    fn distance_is_symmetric_and_obeys_triangle_inequality() {
        let coords: Vec<_> = (0..8)
            .flat_map(|row| (0..8).map(move |col| HexCoordinates::from_offset(col, row)))
            .collect();
        for &a in &coords {
            for &b in &coords {
                assert_eq!(a.distance_to(b), b.distance_to(a));
                for &c in coords.iter().step_by(7) {
                    assert!(a.distance_to(c) <= a.distance_to(b) + b.distance_to(c));
                }
            }
        }
    }

    #[test]
    fn every_step_has_distance_one() {
        let origin = HexCoordinates::new(3, -2);
        for d in HexDirection::ALL {
            assert_eq!(origin.distance_to(origin.step(d)), 1);
        }
    }

    #[test]
    fn from_position_recovers_cell_centers() {
        for row in 0..12 {
            for col in 0..12 {
                let center = metrics::cell_center(col, row);
                let c = HexCoordinates::from_position(center);
                assert_eq!(c, HexCoordinates::from_offset(col, row), "({col},{row})");
                assert_eq!(c.x() + c.y() + c.z(), 0);
            }
        }
    }

    #[test]
    fn from_position_near_corners_stays_valid() {
        let center = metrics::cell_center(4, 4);
        for d in HexDirection::ALL {
            let p = center + metrics::first_solid_corner(d);
            let c = HexCoordinates::from_position(p);
            assert_eq!(c, HexCoordinates::from_offset(4, 4));
        }
    }

    #[test]
    fn hexx_round_trip() {
        let c = HexCoordinates::new(-4, 7);
        let hex: Hex = c.into();
        assert_eq!(HexCoordinates::from(hex), c);
    }

    #[test]
    fn binary_round_trip() {
        let c = HexCoordinates::new(-12, 40);
        let mut buf = Vec::new();
        c.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 8);
        let read = HexCoordinates::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(read, c);
    }

    #[test]
    fn display_prints_all_three_axes() {
        assert_eq!(HexCoordinates::new(1, 2).to_string(), "1 -3 2");
    }
}
