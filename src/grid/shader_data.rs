//! Per-cell RGBA texels consumed by terrain shading.
//!
//! Red holds visibility (255 visible, 0 hidden); alpha holds the terrain
//! palette index. Texels are laid out like the cell array, one row per map
//! row.

/// Cell shading table with a change flag for hosts that upload it.
#[derive(Clone, Debug, Default)]
pub struct CellShaderData {
    width: usize,
    height: usize,
    texels: Vec<[u8; 4]>,
    changed: bool,
}

impl CellShaderData {
    /// Resizes to `width × height` and zeroes every texel.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.texels.clear();
        self.texels.resize(width * height, [0; 4]);
        self.changed = true;
    }

    /// Stores a cell's terrain palette index.
    pub fn refresh_terrain(&mut self, index: usize, terrain_type: u8) {
        if let Some(texel) = self.texels.get_mut(index) {
            texel[3] = terrain_type;
            self.changed = true;
        }
    }

    /// Stores whether a cell is seen by any unit.
    pub fn refresh_visibility(&mut self, index: usize, visible: bool) {
        if let Some(texel) = self.texels.get_mut(index) {
            texel[0] = if visible { 255 } else { 0 };
            self.changed = true;
        }
    }

    /// Texel of one cell; zero outside the table.
    pub fn texel(&self, index: usize) -> [u8; 4] {
        self.texels.get(index).copied().unwrap_or_default()
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[[u8; 4]] {
        &self.texels
    }

    /// Table size in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}
