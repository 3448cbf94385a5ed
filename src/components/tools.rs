use std::collections::VecDeque;

use crate::components::history::{Batch, CellChange};
use crate::grid::{Cell, Grid, LayerId, TileId};

// ============================================================================
// TOOL STATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Paint,
    Eraser,
    Fill,
}

/// Square brush footprint: 1×1, 3×3 or 5×5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushSize {
    #[default]
    Single,
    Three,
    Five,
}

impl BrushSize {
    /// Half-width in cells around the anchor.
    pub fn radius(&self) -> i32 {
        match self {
            BrushSize::Single => 0,
            BrushSize::Three => 1,
            BrushSize::Five => 2,
        }
    }

    pub fn width(&self) -> u32 {
        self.radius() as u32 * 2 + 1
    }

    /// 1×1 → 3×3 → 5×5 → 1×1
    pub fn next(&self) -> Self {
        match self {
            BrushSize::Single => BrushSize::Three,
            BrushSize::Three => BrushSize::Five,
            BrushSize::Five => BrushSize::Single,
        }
    }
}

/// Ephemeral selection state: active layer, tool, brush and stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolState {
    pub layer: LayerId,
    pub tool: Tool,
    pub brush: BrushSize,
    /// The "ink" written by Paint and Fill.
    pub stamp: Cell,
}

impl Default for ToolState {
    /// Foreground, Paint, 1×1 brush, first tile of the table.
    fn default() -> Self {
        Self {
            layer: LayerId::default(),
            tool: Tool::default(),
            brush: BrushSize::default(),
            stamp: Cell::tile(1),
        }
    }
}

impl ToolState {
    pub fn toggle_fill_tool(&mut self) {
        self.tool = match self.tool {
            Tool::Fill => Tool::Paint,
            _ => Tool::Fill,
        };
    }

    pub fn cycle_brush(&mut self) {
        self.brush = self.brush.next();
    }

    pub fn toggle_layer(&mut self) {
        self.layer = self.layer.toggled();
    }

    pub fn select_tile(&mut self, tile: TileId) {
        self.stamp.tile = tile;
    }

    pub fn rotate_stamp(&mut self) {
        self.stamp.rotation = self.stamp.rotation.next();
    }

    pub fn toggle_mirror(&mut self) {
        self.stamp.mirror = !self.stamp.mirror;
    }

    /// e.g. `Rot: 90° | Mirror: On`
    pub fn transform_label(&self) -> String {
        format!(
            "Rot: {}° | Mirror: {}",
            self.stamp.rotation.degrees(),
            if self.stamp.mirror { "On" } else { "Off" }
        )
    }
}

// ============================================================================
// EDIT OPERATIONS
// ============================================================================
//
// Each operation mutates the grid immediately and returns the change
// records; recording them in history is the caller's job.

/// What a brush stroke writes into each cell it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ink {
    Stamp(Cell),
    Erase,
}

impl Ink {
    /// The new state for `current`, or `None` when the cell is left alone.
    fn target_for(&self, current: Cell) -> Option<Cell> {
        match self {
            Ink::Stamp(stamp) if *stamp != current => Some(*stamp),
            Ink::Erase if !current.is_empty() => Some(Cell::EMPTY),
            _ => None,
        }
    }
}

fn apply_ink(grid: &mut Grid, layer: LayerId, row: i32, col: i32, ink: Ink) -> Option<CellChange> {
    let old = grid.get(layer, row, col)?;
    let new = ink.target_for(old)?;
    grid.set(layer, row, col, new);
    Some(CellChange::new(layer, row as usize, col as usize, old, new))
}

/// Write `stamp` into one cell if it differs from what is there.
pub fn paint_cell(grid: &mut Grid, layer: LayerId, row: i32, col: i32, stamp: Cell) -> Option<CellChange> {
    apply_ink(grid, layer, row, col, Ink::Stamp(stamp))
}

/// Clear one cell if it holds a tile.
pub fn erase_cell(grid: &mut Grid, layer: LayerId, row: i32, col: i32) -> Option<CellChange> {
    apply_ink(grid, layer, row, col, Ink::Erase)
}

/// Apply `ink` to the `(2r+1)²` square centred on the anchor. Cells outside
/// the grid are skipped. The batch may be empty.
pub fn brush_stroke(
    grid: &mut Grid,
    layer: LayerId,
    row: i32,
    col: i32,
    radius: i32,
    ink: Ink,
) -> Batch {
    let mut batch = Batch::new(match ink {
        Ink::Stamp(_) => "Brush Paint",
        Ink::Erase => "Brush Erase",
    });
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if let Some(change) = apply_ink(grid, layer, row + dr, col + dc, ink) {
                batch.push(change);
            }
        }
    }
    batch
}

/// Breadth-first fill over 4-connected cells whose (tile, rotation, mirror)
/// exactly equals the anchor's original state.
///
/// Returns `None` when the anchor is outside the grid or already equals the
/// stamp.
pub fn flood_fill(grid: &mut Grid, layer: LayerId, row: i32, col: i32, stamp: Cell) -> Option<Batch> {
    let target = grid.get(layer, row, col)?;
    if target == stamp {
        return None;
    }

    let (w, h) = (grid.width(), grid.height());
    let mut visited = vec![false; w * h];
    let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
    let mut batch = Batch::new("Fill");

    visited[row as usize * w + col as usize] = true;
    queue.push_back((row, col));

    while let Some((r, c)) = queue.pop_front() {
        let Some(current) = grid.get(layer, r, c) else { continue };
        if current != target {
            continue;
        }
        grid.set(layer, r, c, stamp);
        batch.push(CellChange::new(layer, r as usize, c as usize, current, stamp));

        for (dr, dc) in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
            let (nr, nc) = (r + dr, c + dc);
            if !grid.contains(nr, nc) {
                continue;
            }
            let ni = nr as usize * w + nc as usize;
            if visited[ni] {
                continue;
            }
            visited[ni] = true;
            if grid.get(layer, nr, nc) == Some(target) {
                queue.push_back((nr, nc));
            }
        }
    }

    Some(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::history::{HistoryEntry, HistoryManager};
    use crate::grid::Rotation;

    #[test]
    fn test_single_paint_on_empty_map() {
        let mut grid = Grid::new(100, 60);
        let stamp = Cell::new(5, Rotation::R90, false);

        let change = paint_cell(&mut grid, LayerId::Foreground, 10, 10, stamp).unwrap();
        assert_eq!(
            change,
            CellChange::new(LayerId::Foreground, 10, 10, Cell::EMPTY, stamp)
        );
        // Painting the same stamp again records nothing.
        assert!(paint_cell(&mut grid, LayerId::Foreground, 10, 10, stamp).is_none());

        let mut history = HistoryManager::new(100);
        history.push(HistoryEntry::single("Paint", change));
        history.undo(&mut grid);
        assert!(grid.is_blank());
    }

    #[test]
    fn test_erase_skips_empty_cells() {
        let mut grid = Grid::new(4, 4);
        assert!(erase_cell(&mut grid, LayerId::Background, 1, 1).is_none());
        grid.set(LayerId::Background, 1, 1, Cell::new(3, Rotation::R180, true));
        let change = erase_cell(&mut grid, LayerId::Background, 1, 1).unwrap();
        assert_eq!(change.new, Cell::EMPTY);
        assert_eq!(change.old, Cell::new(3, Rotation::R180, true));
        assert!(erase_cell(&mut grid, LayerId::Background, -1, 9).is_none());
    }

    #[test]
    fn test_brush_is_clipped_at_corner() {
        let mut grid = Grid::new(10, 10);
        let batch = brush_stroke(&mut grid, LayerId::Foreground, 0, 0, 2, Ink::Stamp(Cell::tile(4)));
        // Only the 3×3 in-bounds quarter of the 5×5 footprint.
        assert_eq!(batch.len(), 9);
        assert!(batch.changes().iter().all(|c| c.row <= 2 && c.col <= 2));
        assert_eq!(grid.tile_counts().get(&4), Some(&9));
    }

    #[test]
    fn test_brush_only_records_differences() {
        let mut grid = Grid::new(10, 10);
        grid.set(LayerId::Foreground, 5, 5, Cell::tile(4));
        let batch = brush_stroke(&mut grid, LayerId::Foreground, 5, 5, 1, Ink::Stamp(Cell::tile(4)));
        assert_eq!(batch.len(), 8);

        let erase = brush_stroke(&mut grid, LayerId::Foreground, 9, 9, 1, Ink::Erase);
        assert_eq!(erase.len(), 0);
        let erase = brush_stroke(&mut grid, LayerId::Foreground, 5, 5, 1, Ink::Erase);
        assert_eq!(erase.len(), 9);
        assert!(grid.is_blank());
    }

    #[test]
    fn test_fill_whole_empty_layer() {
        let mut grid = Grid::new(100, 60);
        grid.set(LayerId::Background, 3, 3, Cell::tile(9));
        let stamp = Cell::tile(2);

        let batch = flood_fill(&mut grid, LayerId::Foreground, 0, 0, stamp).unwrap();
        assert_eq!(batch.len(), 100 * 60);
        assert!(grid.layer_cells(LayerId::Foreground).iter().all(|c| *c == stamp));
        assert_eq!(grid.get(LayerId::Background, 3, 3), Some(Cell::tile(9)));
        assert_eq!(grid.tile_counts().get(&9), Some(&1));
    }

    #[test]
    fn test_fill_is_idempotent() {
        let mut grid = Grid::new(8, 8);
        let stamp = Cell::new(2, Rotation::R0, true);
        assert!(flood_fill(&mut grid, LayerId::Foreground, 4, 4, stamp).is_some());
        let after = grid.clone();
        assert!(flood_fill(&mut grid, LayerId::Foreground, 4, 4, stamp).is_none());
        assert_eq!(grid, after);
    }

    #[test]
    fn test_fill_matches_exact_triple_and_4_connectivity() {
        let mut grid = Grid::new(5, 5);
        let plain = Cell::tile(1);
        // Row 0 is plain except a rotated copy at (0,2) splitting it in two.
        for col in 0..5 {
            grid.set(LayerId::Foreground, 0, col, plain);
        }
        grid.set(LayerId::Foreground, 0, 2, Cell::new(1, Rotation::R90, false));
        grid.set(LayerId::Foreground, 1, 4, plain);
        grid.set(LayerId::Foreground, 2, 3, plain); // diagonal to (1,4)

        let batch = flood_fill(&mut grid, LayerId::Foreground, 0, 0, Cell::tile(7)).unwrap();
        let mut touched: Vec<(usize, usize)> = batch.changes().iter().map(|c| (c.row, c.col)).collect();
        touched.sort();
        assert_eq!(touched, vec![(0, 0), (0, 1)]);
        assert_eq!(grid.get(LayerId::Foreground, 0, 2), Some(Cell::new(1, Rotation::R90, false)));
        assert_eq!(grid.get(LayerId::Foreground, 0, 3), Some(plain));

        let batch = flood_fill(&mut grid, LayerId::Foreground, 0, 4, Cell::tile(7)).unwrap();
        let mut touched: Vec<(usize, usize)> = batch.changes().iter().map(|c| (c.row, c.col)).collect();
        touched.sort();
        assert_eq!(touched, vec![(0, 3), (0, 4), (1, 4)]);
        assert_eq!(grid.get(LayerId::Foreground, 2, 3), Some(plain));
    }

    #[test]
    fn test_fill_outside_grid_is_noop() {
        let mut grid = Grid::new(3, 3);
        assert!(flood_fill(&mut grid, LayerId::Foreground, 3, 0, Cell::tile(1)).is_none());
        assert!(grid.is_blank());
    }

    #[test]
    fn test_tool_state_cycles() {
        let mut state = ToolState::default();
        assert_eq!(state.layer, LayerId::Foreground);
        assert_eq!(state.stamp, Cell::tile(1));
        state.toggle_fill_tool();
        assert_eq!(state.tool, Tool::Fill);
        state.toggle_fill_tool();
        assert_eq!(state.tool, Tool::Paint);

        state.cycle_brush();
        state.cycle_brush();
        assert_eq!(state.brush, BrushSize::Five);
        state.cycle_brush();
        assert_eq!(state.brush.width(), 1);

        state.rotate_stamp();
        state.toggle_mirror();
        assert_eq!(state.transform_label(), "Rot: 90° | Mirror: On");
        state.toggle_layer();
        assert_eq!(state.layer, LayerId::Background);
    }
}
