//! Grid module - fixed-size cell store of optional blocks
//!
//! Cells are stored in a flat row-major vector (`row * columns + column`).
//! Row 0 is the bottom row.
//!
//! Every operation is tolerant of out-of-bounds input: queries return
//! `None`/`false`/empty and mutations are silent no-ops. Callers validate
//! with [`Grid::is_valid_position`] when they need to know.

use arrayvec::ArrayVec;

use crate::block::Block;
use crate::types::{Direction, GridPosition, MAX_GRID_CELLS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Option<Block>>,
}

/// Cell count for a `rows x columns` grid, or why those dimensions are unusable
pub fn checked_cell_count(rows: usize, columns: usize) -> Result<usize, &'static str> {
    let cells = rows
        .checked_mul(columns)
        .ok_or("grid dimensions overflow")?;
    if cells == 0 {
        return Err("grid has no cells");
    }
    if cells > MAX_GRID_CELLS {
        return Err("grid is too large");
    }
    Ok(cells)
}

impl Grid {
    /// Create an empty grid. Dimensions from untrusted documents go through
    /// [`checked_cell_count`] first.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![None; rows * columns],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline(always)]
    fn index(&self, pos: GridPosition) -> Option<usize> {
        if self.is_valid_position(pos) {
            Some(pos.row as usize * self.columns + pos.column as usize)
        } else {
            None
        }
    }

    /// Check if position lies inside the grid
    pub fn is_valid_position(&self, pos: GridPosition) -> bool {
        pos.row >= 0
            && pos.column >= 0
            && (pos.row as usize) < self.rows
            && (pos.column as usize) < self.columns
    }

    /// Get block at position
    /// Returns None if empty or out of bounds
    pub fn get(&self, pos: GridPosition) -> Option<&Block> {
        self.index(pos).and_then(|idx| self.cells[idx].as_ref())
    }

    pub fn get_mut(&mut self, pos: GridPosition) -> Option<&mut Block> {
        let idx = self.index(pos)?;
        self.cells[idx].as_mut()
    }

    /// Place a block (or nothing) at position, updating the block's position.
    /// Whatever was in the cell before is dropped. No-op if out of bounds.
    pub fn set(&mut self, pos: GridPosition, block: Option<Block>) {
        if let Some(idx) = self.index(pos) {
            self.cells[idx] = block.map(|mut b| {
                b.position = pos;
                b
            });
        }
    }

    /// Take the block out of a cell, leaving it empty
    pub fn remove(&mut self, pos: GridPosition) -> Option<Block> {
        let idx = self.index(pos)?;
        self.cells[idx].take()
    }

    /// Valid and unoccupied
    pub fn is_empty(&self, pos: GridPosition) -> bool {
        matches!(self.index(pos), Some(idx) if self.cells[idx].is_none())
    }

    /// Exchange the contents of two cells. Either side may be empty, which
    /// makes "move into an empty cell" a degenerate swap. No-op unless both
    /// positions are valid.
    pub fn swap(&mut self, a: GridPosition, b: GridPosition) {
        if !self.is_valid_position(a) || !self.is_valid_position(b) {
            return;
        }
        let first = self.remove(a);
        let second = self.remove(b);
        self.set(a, second);
        self.set(b, first);
    }

    /// Adjacent position in `direction`, if it is inside the grid
    pub fn neighbor(&self, pos: GridPosition, direction: Direction) -> Option<GridPosition> {
        let next = pos.offset(direction);
        self.is_valid_position(next).then_some(next)
    }

    /// Valid 4-neighbors in the order up, down, left, right
    pub fn neighbors(&self, pos: GridPosition) -> ArrayVec<GridPosition, 4> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(pos, dir))
            .collect()
    }

    /// Every occupied block, bottom row first, left to right
    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.cells.iter().filter_map(Option::as_ref)
    }

    pub fn block_count(&self) -> usize {
        self.all_blocks().count()
    }

    /// Remove every block
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// True when no cell is occupied
    pub fn is_grid_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}
