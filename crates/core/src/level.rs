//! Level definitions and persisted session snapshots
//!
//! Both shapes are plain serde data matching the level and profile JSON
//! documents (`camelCase` field names, block kind under `"type"`).

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockIdAllocator};
use crate::grid::{checked_cell_count, Grid};
use crate::types::{BlockId, BlockTypeId, GridPosition, FIRST_LEVEL_NUMBER};

/// Seed placement of one block in a level definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(rename = "type")]
    pub block_type: BlockTypeId,
    pub row: i32,
    pub column: i32,
}

impl BlockData {
    pub fn new(block_type: impl Into<BlockTypeId>, row: i32, column: i32) -> Self {
        Self {
            block_type: block_type.into(),
            row,
            column,
        }
    }

    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.row, self.column)
    }
}

/// Static level definition, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub level_number: u32,
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub blocks: Vec<BlockData>,
}

impl Level {
    pub fn new(level_number: u32, rows: usize, columns: usize) -> Self {
        Self {
            level_number,
            rows,
            columns,
            blocks: Vec::new(),
        }
    }

    /// Builder-style seed placement
    pub fn with_block(mut self, block_type: &str, row: i32, column: i32) -> Self {
        self.blocks.push(BlockData::new(block_type, row, column));
        self
    }

    /// Reject dimensions no grid can be built from
    pub fn validate(&self) -> Result<(), &'static str> {
        checked_cell_count(self.rows, self.columns).map(drop)
    }

    /// Build a fresh grid with newly allocated block ids
    pub fn build_grid(&self, ids: &BlockIdAllocator) -> Grid {
        let mut grid = Grid::new(self.rows, self.columns);
        for data in &self.blocks {
            let pos = data.position();
            grid.set(pos, Some(Block::new(ids, data.block_type.clone(), pos)));
        }
        grid
    }
}

/// Persisted block with its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStateProfileData {
    pub id: u64,
    #[serde(rename = "type")]
    pub block_type: BlockTypeId,
    pub row: i32,
    pub column: i32,
}

impl BlockStateProfileData {
    pub fn from_block(block: &Block) -> Self {
        let pos = block.position();
        Self {
            id: block.id().get(),
            block_type: block.block_type().clone(),
            row: pos.row,
            column: pos.column,
        }
    }
}

/// Snapshot of the grid of one level in progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStateProfileData {
    pub level_number: u32,
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub blocks: Vec<BlockStateProfileData>,
}

impl LevelStateProfileData {
    /// Capture the current grid contents
    pub fn capture(level_number: u32, grid: &Grid) -> Self {
        Self {
            level_number,
            rows: grid.rows(),
            columns: grid.columns(),
            blocks: grid
                .all_blocks()
                .map(BlockStateProfileData::from_block)
                .collect(),
        }
    }

    /// Reject dimensions no grid can be built from
    pub fn validate(&self) -> Result<(), &'static str> {
        checked_cell_count(self.rows, self.columns).map(drop)
    }

    /// Rebuild the grid reusing the persisted ids. The allocator is ratcheted
    /// past every restored id.
    pub fn build_grid(&self, ids: &BlockIdAllocator) -> Grid {
        let mut grid = Grid::new(self.rows, self.columns);
        for data in &self.blocks {
            let pos = GridPosition::new(data.row, data.column);
            let block = Block::restore(ids, BlockId::new(data.id), data.block_type.clone(), pos);
            grid.set(pos, Some(block));
        }
        grid
    }
}

/// Everything persisted between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateProfileData {
    #[serde(default = "first_level")]
    pub current_level_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level_state: Option<LevelStateProfileData>,
}

fn first_level() -> u32 {
    FIRST_LEVEL_NUMBER
}

impl Default for GameStateProfileData {
    fn default() -> Self {
        Self {
            current_level_number: FIRST_LEVEL_NUMBER,
            current_level_state: None,
        }
    }
}
