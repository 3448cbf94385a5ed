// ============================================================================
// GRID STORE — dense per-layer cell arrays (tile id, rotation, mirror)
// ============================================================================

use std::collections::HashMap;

/// Number of stacked layers every map carries.
pub const NUM_LAYERS: usize = 2;

/// Tile identifier. `0` is the empty cell, `1..=N` index the loaded tile table.
pub type TileId = u16;

pub const EMPTY_TILE: TileId = 0;

/// One of the two map layers. Background is drawn beneath Foreground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LayerId {
    Background,
    #[default]
    Foreground,
}

impl LayerId {
    pub const ALL: [LayerId; NUM_LAYERS] = [LayerId::Background, LayerId::Foreground];

    pub fn index(self) -> usize {
        match self {
            LayerId::Background => 0,
            LayerId::Foreground => 1,
        }
    }

    /// The other layer (Tab key behaviour in the editor).
    pub fn toggled(self) -> Self {
        match self {
            LayerId::Background => LayerId::Foreground,
            LayerId::Foreground => LayerId::Background,
        }
    }
}

/// Clockwise quarter-turn applied to a tile after mirroring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn to_u8(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// Values outside `0..=3` wrap, so stray bytes in a project file still
    /// decode to a valid orientation.
    pub fn from_u8(v: u8) -> Self {
        match v % 4 {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    pub fn degrees(self) -> u32 {
        self.to_u8() as u32 * 90
    }

    /// Next quarter-turn clockwise.
    pub fn next(self) -> Self {
        Self::from_u8(self.to_u8() + 1)
    }
}

/// State of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub tile: TileId,
    pub rotation: Rotation,
    /// Horizontal flip, applied before rotation.
    pub mirror: bool,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        tile: EMPTY_TILE,
        rotation: Rotation::R0,
        mirror: false,
    };

    pub fn new(tile: TileId, rotation: Rotation, mirror: bool) -> Self {
        Self { tile, rotation, mirror }
    }

    /// Plain tile with no transform.
    pub fn tile(tile: TileId) -> Self {
        Self { tile, ..Self::EMPTY }
    }

    pub fn is_empty(&self) -> bool {
        self.tile == EMPTY_TILE
    }
}

/// Fixed-size two-layer map. Each layer is a row-major `Vec<Cell>`.
///
/// Coordinates are signed so brush and fill geometry can probe past the
/// edges; anything outside `[0, height) × [0, width)` reads as `None` and
/// writes are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    layers: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            layers: vec![vec![Cell::EMPTY; width * height]; NUM_LAYERS],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    #[inline]
    fn index(&self, row: i32, col: i32) -> Option<usize> {
        if self.contains(row, col) {
            Some(row as usize * self.width + col as usize)
        } else {
            None
        }
    }

    pub fn get(&self, layer: LayerId, row: i32, col: i32) -> Option<Cell> {
        self.index(row, col).map(|i| self.layers[layer.index()][i])
    }

    /// Write a cell. Returns `false` (and does nothing) when out of bounds.
    pub fn set(&mut self, layer: LayerId, row: i32, col: i32, cell: Cell) -> bool {
        match self.index(row, col) {
            Some(i) => {
                self.layers[layer.index()][i] = cell;
                true
            }
            None => false,
        }
    }

    /// Reset every layer to `cell`.
    pub fn fill(&mut self, cell: Cell) {
        for layer in &mut self.layers {
            layer.fill(cell);
        }
    }

    pub fn fill_layer(&mut self, layer: LayerId, cell: Cell) {
        self.layers[layer.index()].fill(cell);
    }

    /// Set whole rows `[start_row, height)` of one layer.
    pub fn fill_rows_from(&mut self, layer: LayerId, start_row: usize, cell: Cell) {
        let start = start_row.min(self.height) * self.width;
        self.layers[layer.index()][start..].fill(cell);
    }

    /// Change dimensions, keeping the overlapping top-left rectangle and
    /// zero-filling everything else.
    pub fn resize(&mut self, new_width: usize, new_height: usize) {
        if new_width == self.width && new_height == self.height {
            return;
        }
        let mut resized = Grid::new(new_width, new_height);
        resized.copy_overlap_from(self);
        *self = resized;
    }

    /// Copy the top-left rectangle shared with `src` into `self`.
    pub fn copy_overlap_from(&mut self, src: &Grid) {
        let w = self.width.min(src.width);
        let h = self.height.min(src.height);
        for (dst_layer, src_layer) in self.layers.iter_mut().zip(&src.layers) {
            for row in 0..h {
                let d = row * self.width;
                let s = row * src.width;
                dst_layer[d..d + w].copy_from_slice(&src_layer[s..s + w]);
            }
        }
    }

    /// Row-major view of one layer.
    pub fn layer_cells(&self, layer: LayerId) -> &[Cell] {
        &self.layers[layer.index()]
    }

    /// Every cell of one layer with its coordinates, row-major.
    pub fn iter_layer(&self, layer: LayerId) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let w = self.width;
        self.layers[layer.index()]
            .iter()
            .enumerate()
            .map(move |(i, c)| (i / w, i % w, *c))
    }

    /// Occurrences of each non-empty tile id across all layers.
    pub fn tile_counts(&self) -> HashMap<TileId, usize> {
        let mut counts = HashMap::new();
        for cell in self.layers.iter().flatten() {
            if !cell.is_empty() {
                *counts.entry(cell.tile).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn is_blank(&self) -> bool {
        self.layers.iter().flatten().all(Cell::is_empty)
    }
}
