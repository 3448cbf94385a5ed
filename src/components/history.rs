use std::collections::VecDeque;

use crate::grid::{Cell, Grid, LayerId};

// ============================================================================
// CHANGE RECORDS
// ============================================================================

/// One cell's before/after state. Always refers to an in-bounds cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellChange {
    pub layer: LayerId,
    pub row: usize,
    pub col: usize,
    pub old: Cell,
    pub new: Cell,
}

impl CellChange {
    pub fn new(layer: LayerId, row: usize, col: usize, old: Cell, new: Cell) -> Self {
        Self { layer, row, col, old, new }
    }

    fn write(&self, grid: &mut Grid, cell: Cell) {
        grid.set(self.layer, self.row as i32, self.col as i32, cell);
    }

    pub fn revert(&self, grid: &mut Grid) {
        self.write(grid, self.old);
    }

    pub fn apply(&self, grid: &mut Grid) {
        self.write(grid, self.new);
    }
}

/// Ordered group of changes undone/redone as one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    description: &'static str,
    changes: Vec<CellChange>,
}

impl Batch {
    pub fn new(description: &'static str) -> Self {
        Self { description, changes: Vec::new() }
    }

    pub fn push(&mut self, change: CellChange) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[CellChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A history item: a lone cell edit or a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEntry {
    Single {
        description: &'static str,
        change: CellChange,
    },
    Batch(Batch),
}

impl HistoryEntry {
    pub fn single(description: &'static str, change: CellChange) -> Self {
        HistoryEntry::Single { description, change }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HistoryEntry::Single { description, .. } => description,
            HistoryEntry::Batch(batch) => batch.description,
        }
    }

    /// Number of cell changes carried.
    pub fn change_count(&self) -> usize {
        match self {
            HistoryEntry::Single { .. } => 1,
            HistoryEntry::Batch(batch) => batch.len(),
        }
    }

    fn undo(&self, grid: &mut Grid) -> Redraw {
        match self {
            HistoryEntry::Single { change, .. } => {
                change.revert(grid);
                Redraw::Cell {
                    layer: change.layer,
                    row: change.row,
                    col: change.col,
                }
            }
            HistoryEntry::Batch(batch) => {
                for change in batch.changes.iter().rev() {
                    change.revert(grid);
                }
                Redraw::Full
            }
        }
    }

    fn redo(&self, grid: &mut Grid) -> Redraw {
        match self {
            HistoryEntry::Single { change, .. } => {
                change.apply(grid);
                Redraw::Cell {
                    layer: change.layer,
                    row: change.row,
                    col: change.col,
                }
            }
            HistoryEntry::Batch(batch) => {
                for change in &batch.changes {
                    change.apply(grid);
                }
                Redraw::Full
            }
        }
    }
}

impl From<Batch> for HistoryEntry {
    fn from(batch: Batch) -> Self {
        HistoryEntry::Batch(batch)
    }
}

/// What the renderer must refresh after an undo/redo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redraw {
    Cell { layer: LayerId, row: usize, col: usize },
    Full,
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

/// Linear undo/redo history with a fixed depth.
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    /// Record an already-applied edit. Clears the redo stack and drops the
    /// oldest entry when over capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        self.undo_stack.push_back(entry);
        self.prune();
    }

    pub fn undo(&mut self, grid: &mut Grid) -> Option<Redraw> {
        let entry = self.undo_stack.pop_back()?;
        let redraw = entry.undo(grid);
        self.redo_stack.push_back(entry);
        Some(redraw)
    }

    pub fn redo(&mut self, grid: &mut Grid) -> Option<Redraw> {
        let entry = self.redo_stack.pop_back()?;
        let redraw = entry.redo(grid);
        self.undo_stack.push_back(entry);
        Some(redraw)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&'static str> {
        self.undo_stack.back().map(HistoryEntry::description)
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rotation;

    /// Apply `new` at (row, col) and return the matching record.
    fn edit(grid: &mut Grid, layer: LayerId, row: usize, col: usize, new: Cell) -> HistoryEntry {
        let old = grid.get(layer, row as i32, col as i32).unwrap();
        grid.set(layer, row as i32, col as i32, new);
        HistoryEntry::single("Paint", CellChange::new(layer, row, col, old, new))
    }

    #[test]
    fn test_undo_restores_exact_state() {
        let mut grid = Grid::new(8, 8);
        let mut history = HistoryManager::new(100);
        let before = grid.clone();

        history.push(edit(&mut grid, LayerId::Foreground, 1, 1, Cell::tile(3)));
        history.push(edit(&mut grid, LayerId::Foreground, 1, 1, Cell::new(4, Rotation::R270, true)));
        history.push(edit(&mut grid, LayerId::Background, 7, 0, Cell::tile(9)));
        let after = grid.clone();

        for _ in 0..3 {
            assert!(history.undo(&mut grid).is_some());
        }
        assert_eq!(grid, before);
        assert!(history.undo(&mut grid).is_none());

        for _ in 0..3 {
            assert!(history.redo(&mut grid).is_some());
        }
        assert_eq!(grid, after);
        assert!(history.redo(&mut grid).is_none());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut grid = Grid::new(4, 4);
        let mut history = HistoryManager::new(10);

        history.push(edit(&mut grid, LayerId::Foreground, 0, 0, Cell::tile(1)));
        history.undo(&mut grid);
        assert!(history.can_redo());

        history.push(edit(&mut grid, LayerId::Foreground, 0, 1, Cell::tile(2)));
        assert!(!history.can_redo());
        assert!(history.redo(&mut grid).is_none());
        assert_eq!(grid.get(LayerId::Foreground, 0, 0), Some(Cell::EMPTY));
    }

    #[test]
    fn test_batch_reverts_in_reverse_order() {
        let mut grid = Grid::new(4, 4);
        let mut history = HistoryManager::new(10);

        // Same cell touched twice inside one batch: undo must land on the
        // very first old value.
        let mut batch = Batch::new("Brush Paint");
        for tile in [5, 6] {
            let old = grid.get(LayerId::Background, 2, 2).unwrap();
            let new = Cell::tile(tile);
            grid.set(LayerId::Background, 2, 2, new);
            batch.push(CellChange::new(LayerId::Background, 2, 2, old, new));
        }
        history.push(batch.into());

        assert_eq!(history.undo(&mut grid), Some(Redraw::Full));
        assert_eq!(grid.get(LayerId::Background, 2, 2), Some(Cell::EMPTY));
        assert_eq!(history.redo(&mut grid), Some(Redraw::Full));
        assert_eq!(grid.get(LayerId::Background, 2, 2), Some(Cell::tile(6)));
    }

    #[test]
    fn test_single_undo_requests_cell_redraw() {
        let mut grid = Grid::new(4, 4);
        let mut history = HistoryManager::new(10);
        history.push(edit(&mut grid, LayerId::Foreground, 3, 2, Cell::tile(1)));
        assert_eq!(
            history.undo(&mut grid),
            Some(Redraw::Cell { layer: LayerId::Foreground, row: 3, col: 2 })
        );
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut grid = Grid::new(10, 1);
        let mut history = HistoryManager::new(3);
        for col in 0..5 {
            history.push(edit(&mut grid, LayerId::Foreground, 0, col, Cell::tile(1)));
        }
        assert_eq!(history.undo_count(), 3);
        while history.undo(&mut grid).is_some() {}
        // The two oldest edits fell off and stay applied.
        assert_eq!(grid.get(LayerId::Foreground, 0, 0), Some(Cell::tile(1)));
        assert_eq!(grid.get(LayerId::Foreground, 0, 1), Some(Cell::tile(1)));
        assert_eq!(grid.get(LayerId::Foreground, 0, 2), Some(Cell::EMPTY));
    }

    #[test]
    fn test_empty_batch_consumes_a_slot() {
        let mut grid = Grid::new(2, 2);
        let mut history = HistoryManager::new(10);
        history.push(Batch::new("Brush Erase").into());
        assert_eq!(history.undo_description(), Some("Brush Erase"));
        assert_eq!(history.undo(&mut grid), Some(Redraw::Full));
        assert!(grid.is_blank());
    }
}
