//! Normalization engine - gravity followed by match detection
//!
//! One call to [`NormalizationEngine::normalize`] settles the grid under
//! gravity and then reports the matched areas on the settled grid. Matches
//! are not removed here: the caller animates them, calls
//! [`NormalizationEngine::destroy_blocks`], and normalizes again until the
//! result reports no changes.

use tracing::trace;

use crate::block::Block;
use crate::grid::Grid;
use crate::match_finder::{MatchFinder, MatchedArea};
use crate::types::GridPosition;

/// One single-cell gravity step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMove {
    pub from: GridPosition,
    pub to: GridPosition,
}

/// Outcome of one normalization cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationResult {
    pub moves: Vec<BlockMove>,
    pub matched_areas: Vec<MatchedArea>,
}

impl NormalizationResult {
    pub fn has_changes(&self) -> bool {
        !self.moves.is_empty() || !self.matched_areas.is_empty()
    }

    /// Total number of blocks across all matched areas
    pub fn matched_count(&self) -> usize {
        self.matched_areas.iter().map(|area| area.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationEngine {
    match_finder: MatchFinder,
}

impl NormalizationEngine {
    pub fn new(min_match_length: usize) -> Self {
        Self {
            match_finder: MatchFinder::new(min_match_length),
        }
    }

    pub fn match_finder(&self) -> &MatchFinder {
        &self.match_finder
    }

    /// Run one gravity settle and one match scan
    pub fn normalize(&self, grid: &mut Grid) -> NormalizationResult {
        let moves = apply_gravity(grid);
        let matched_areas = self.match_finder.find_matches(grid);
        trace!(
            moves = moves.len(),
            areas = matched_areas.len(),
            "normalize cycle"
        );
        NormalizationResult {
            moves,
            matched_areas,
        }
    }

    /// Remove every block in the given areas. Gravity is not re-applied.
    /// Returns the removed blocks.
    pub fn destroy_blocks(&self, grid: &mut Grid, areas: &[MatchedArea]) -> Vec<Block> {
        areas
            .iter()
            .flatten()
            .filter_map(|&pos| grid.remove(pos))
            .collect()
    }
}

/// Drop blocks one cell at a time until nothing can fall.
///
/// Each pass scans bottom to top, left to right and moves a block down one
/// cell when the cell below is empty. Passes repeat until one makes no
/// move, which takes at most `rows` passes since every move lowers the sum
/// of row indices.
pub fn apply_gravity(grid: &mut Grid) -> Vec<BlockMove> {
    let mut moves = Vec::new();
    loop {
        let mut moved = false;
        for row in 0..grid.rows() as i32 {
            for column in 0..grid.columns() as i32 {
                let from = GridPosition::new(row, column);
                let to = from.down();
                if grid.get(from).is_some() && grid.is_empty(to) {
                    grid.swap(from, to);
                    moves.push(BlockMove { from, to });
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }
    moves
}
