//! Binary map files.
//!
//! Layout, all little-endian:
//!
//! | field            | type  | present         |
//! |------------------|-------|-----------------|
//! | version          | `i32` | always          |
//! | cell count x, z  | `u8`  | version ≥ 1     |
//! | cell records     | 11 B  | one per cell    |
//! | unit count       | `i32` | version ≥ 2     |
//! | unit x, z        | `i32` | per unit        |
//! | unit orientation | `f32` | per unit        |
//!
//! Version 0 files carry no size and are always 20×15. A file is parsed
//! completely before the grid is touched, so a rejected file leaves the
//! current map intact.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bevy::prelude::*;

use crate::cell::CellRecord;
use crate::coordinates::HexCoordinates;
use crate::metrics;

use super::{GridEvent, HexGrid, is_valid_map_size};

/// Version written by [`HexGrid::save`]; the newest one [`HexGrid::load`]
/// accepts.
pub const MAP_FILE_VERSION: i32 = 2;

const VERSION_0_SIZE: (usize, usize) = (20, 15);

/// Errors that can occur while saving or loading a map.
#[derive(Debug)]
pub enum MapError {
    /// I/O error, including a truncated stream.
    Io(io::Error),
    /// Header names a version this build cannot read.
    UnsupportedVersion {
        /// Version found in the header.
        found: i32,
    },
    /// Dimensions are not positive multiples of the chunk size, or too large
    /// for the one-byte size fields.
    InvalidMapSize {
        /// Cells per row.
        x: usize,
        /// Rows.
        z: usize,
    },
    /// A unit stands on a coordinate outside the map.
    UnknownCell {
        /// Cube x.
        x: i32,
        /// Cube z.
        z: i32,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io(e) => write!(f, "I/O error: {e}"),
            MapError::UnsupportedVersion { found } => write!(
                f,
                "Unsupported map version {found}, this build reads up to {MAP_FILE_VERSION}"
            ),
            MapError::InvalidMapSize { x, z } => write!(f, "Invalid map size {x}x{z}"),
            MapError::UnknownCell { x, z } => write!(f, "Unit placed outside the map at ({x}, {z})"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MapError {
    fn from(e: io::Error) -> Self {
        MapError::Io(e)
    }
}

/// Fully parsed map file.
struct MapData {
    cell_count_x: usize,
    cell_count_z: usize,
    cells: Vec<CellRecord>,
    units: Vec<(usize, f32)>,
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

impl MapData {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, MapError> {
        let version = read_i32(reader)?;
        if !(0..=MAP_FILE_VERSION).contains(&version) {
            return Err(MapError::UnsupportedVersion { found: version });
        }

        let (x, z) = if version >= 1 {
            (usize::from(read_u8(reader)?), usize::from(read_u8(reader)?))
        } else {
            VERSION_0_SIZE
        };
        if !is_valid_map_size(x, z) {
            return Err(MapError::InvalidMapSize { x, z });
        }

        let cells = (0..x * z)
            .map(|_| CellRecord::read_from(reader))
            .collect::<io::Result<Vec<_>>>()?;

        let mut units = Vec::new();
        if version >= 2 {
            let count = read_i32(reader)?;
            let count = usize::try_from(count).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, format!("negative unit count {count}"))
            })?;
            units.reserve(count.min(x * z));
            for _ in 0..count {
                let coordinates = HexCoordinates::read_from(reader)?;
                let orientation = read_f32(reader)?;
                let index = coordinates.to_cell_index(x, z).ok_or(MapError::UnknownCell {
                    x: coordinates.x(),
                    z: coordinates.z(),
                })?;
                units.push((index, orientation));
            }
        }

        Ok(Self {
            cell_count_x: x,
            cell_count_z: z,
            cells,
            units,
        })
    }
}

impl HexGrid {
    /// Writes the map in the current file version.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), MapError> {
        let (Ok(x), Ok(z)) = (u8::try_from(self.cell_count_x), u8::try_from(self.cell_count_z))
        else {
            return Err(MapError::InvalidMapSize {
                x: self.cell_count_x,
                z: self.cell_count_z,
            });
        };
        writer.write_all(&MAP_FILE_VERSION.to_le_bytes())?;
        writer.write_all(&[x, z])?;
        for cell in &self.cells {
            cell.record().write_to(writer)?;
        }

        writer.write_all(&(self.units.len() as i32).to_le_bytes())?;
        for unit in &self.units {
            self.cells[unit.location()].coordinates().write_to(writer)?;
            writer.write_all(&unit.orientation().to_le_bytes())?;
        }
        Ok(())
    }

    /// Replaces the map with one read from `reader`.
    ///
    /// A file of another size rebuilds the cell arena first. On error the
    /// grid is left as it was.
    pub fn load<R: Read>(&mut self, reader: &mut R) -> Result<(), MapError> {
        let data = MapData::read_from(reader)?;

        if (data.cell_count_x, data.cell_count_z) != (self.cell_count_x, self.cell_count_z) {
            self.build_cells(data.cell_count_x, data.cell_count_z);
        } else {
            self.clear_path();
            self.clear_units();
            self.shader_data.reset(data.cell_count_x, data.cell_count_z);
        }

        for (index, record) in data.cells.iter().enumerate() {
            let perturbation = &self.metrics;
            let cell = &mut self.cells[index];
            cell.apply_record(record);
            cell.visibility = 0;
            cell.position.y = metrics::elevation_height(cell.elevation)
                + perturbation.elevation_perturbation(cell.position);
            self.shader_data.refresh_terrain(index, record.terrain_type);
        }
        self.mark_all_dirty();

        let mut placed = 0;
        for &(index, orientation) in &data.units {
            if self.add_unit(index, orientation).is_some() {
                placed += 1;
            } else {
                warn!("Skipped unit on unavailable cell {index}");
            }
        }

        self.pending_events.push(GridEvent::MapLoaded {
            cell_count_x: data.cell_count_x,
            cell_count_z: data.cell_count_z,
            units: placed,
        });
        info!(
            "Loaded {}x{} map with {placed} unit(s)",
            data.cell_count_x, data.cell_count_z
        );
        Ok(())
    }

    /// Saves to a file, replacing it.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        info!("Saved map to {}", path.display());
        Ok(())
    }

    /// Loads from a file.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader)
    }
}
