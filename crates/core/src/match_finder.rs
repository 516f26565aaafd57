//! Match finder - detects runs of same-type blocks and groups them
//!
//! Detection runs in three steps:
//!
//! 1. Rows are scanned left to right. Every maximal run of adjacent
//!    same-type blocks at least `min_match_length` long is marked.
//! 2. Columns are scanned bottom to top the same way.
//! 3. Marked positions are grouped by flood fill across 4-neighbors that are
//!    also marked and share the seed's type. A block marked by both a row and
//!    a column run ends up in exactly one area.
//!
//! Areas and their positions come out in ascending `(row, column)` order so
//! results are reproducible.

use std::collections::{BTreeSet, VecDeque};

use crate::grid::Grid;
use crate::types::{GridPosition, DEFAULT_MIN_MATCH_LENGTH, MIN_MATCH_LENGTH_FLOOR};

/// A connected region of same-type blocks that qualifies for destruction
pub type MatchedArea = BTreeSet<GridPosition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFinder {
    min_match_length: usize,
}

impl MatchFinder {
    /// Lengths below 2 are raised to 2
    pub fn new(min_match_length: usize) -> Self {
        Self {
            min_match_length: min_match_length.max(MIN_MATCH_LENGTH_FLOOR),
        }
    }

    pub fn min_match_length(&self) -> usize {
        self.min_match_length
    }

    /// Find all matched areas on the grid
    pub fn find_matches(&self, grid: &Grid) -> Vec<MatchedArea> {
        let mut matched = BTreeSet::new();
        self.mark_runs(grid, grid.rows(), grid.columns(), &mut matched, |line, i| {
            GridPosition::new(line as i32, i as i32)
        });
        self.mark_runs(grid, grid.columns(), grid.rows(), &mut matched, |line, i| {
            GridPosition::new(i as i32, line as i32)
        });
        group_matched(grid, &matched)
    }

    /// Scan `lines` lines of `len` cells each; `at(line, i)` maps to a position.
    /// The scan pointer skips past each run so no cell is examined as a run
    /// start twice.
    fn mark_runs(
        &self,
        grid: &Grid,
        lines: usize,
        len: usize,
        matched: &mut BTreeSet<GridPosition>,
        at: impl Fn(usize, usize) -> GridPosition,
    ) {
        for line in 0..lines {
            let mut i = 0;
            while i < len {
                let Some(start) = grid.get(at(line, i)) else {
                    i += 1;
                    continue;
                };

                let mut run = 1;
                while i + run < len {
                    match grid.get(at(line, i + run)) {
                        Some(next) if next.block_type() == start.block_type() => run += 1,
                        _ => break,
                    }
                }

                if run >= self.min_match_length {
                    matched.extend((i..i + run).map(|k| at(line, k)));
                }
                i += run;
            }
        }
    }
}

impl Default for MatchFinder {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MATCH_LENGTH)
    }
}

/// Flood-fill marked positions into connected same-type areas
fn group_matched(grid: &Grid, matched: &BTreeSet<GridPosition>) -> Vec<MatchedArea> {
    let mut areas = Vec::new();
    let mut visited = BTreeSet::new();

    for &seed in matched {
        if visited.contains(&seed) {
            continue;
        }
        let Some(seed_block) = grid.get(seed) else {
            continue;
        };
        let seed_type = seed_block.block_type();

        let mut area = MatchedArea::new();
        let mut queue = VecDeque::from([seed]);
        visited.insert(seed);

        while let Some(current) = queue.pop_front() {
            area.insert(current);
            for neighbor in grid.neighbors(current) {
                if visited.contains(&neighbor) || !matched.contains(&neighbor) {
                    continue;
                }
                let same_type = grid
                    .get(neighbor)
                    .is_some_and(|b| b.block_type() == seed_type);
                if same_type {
                    visited.insert(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        areas.push(area);
    }

    areas
}
