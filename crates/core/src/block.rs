//! Block module - a single puzzle piece and its id allocator

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{BlockId, BlockTypeId, GridPosition};

/// Hands out strictly increasing block ids.
///
/// One allocator is owned per session and shared through an `Arc`, so
/// independent sessions never see each other's ids. The counter stores the
/// last issued id; the first id handed out is 1.
#[derive(Debug, Default)]
pub struct BlockIdAllocator {
    last: AtomicU64,
}

impl BlockIdAllocator {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocate the next unused id
    pub fn allocate(&self) -> BlockId {
        BlockId::new(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Ratchet the counter so every later allocation is greater than `id`.
    /// Never moves the counter backwards, even when called concurrently.
    pub fn ensure_at_least(&self, id: BlockId) {
        let mut current = self.last.load(Ordering::Relaxed);
        while current < id.get() {
            match self.last.compare_exchange_weak(
                current,
                id.get(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Highest id handed out or observed so far (0 when none)
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// A puzzle piece: identity plus transient animation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    block_type: BlockTypeId,
    /// Kept equal to the coordinates of the cell holding the block
    pub(crate) position: GridPosition,
    pub is_falling: bool,
    pub is_being_destroyed: bool,
}

impl Block {
    /// Create a block with a freshly allocated id
    pub fn new(ids: &BlockIdAllocator, block_type: BlockTypeId, position: GridPosition) -> Self {
        Self::with_id(ids.allocate(), block_type, position)
    }

    /// Create a block with a known id, ratcheting the allocator past it
    pub fn restore(
        ids: &BlockIdAllocator,
        id: BlockId,
        block_type: BlockTypeId,
        position: GridPosition,
    ) -> Self {
        ids.ensure_at_least(id);
        Self::with_id(id, block_type, position)
    }

    fn with_id(id: BlockId, block_type: BlockTypeId, position: GridPosition) -> Self {
        Self {
            id,
            block_type,
            position,
            is_falling: false,
            is_being_destroyed: false,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn block_type(&self) -> &BlockTypeId {
        &self.block_type
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    /// A block accepts player input only while it is neither falling nor being destroyed
    pub fn can_interact(&self) -> bool {
        !self.is_falling && !self.is_being_destroyed
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block[{}] at {}", self.block_type, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let ids = BlockIdAllocator::new();
        let a = Block::new(&ids, BlockTypeId::new("a"), GridPosition::new(0, 0));
        let b = Block::new(&ids, BlockTypeId::new("a"), GridPosition::new(0, 1));
        assert_eq!(a.id(), BlockId::new(1));
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_restore_fast_forwards_allocator() {
        let ids = BlockIdAllocator::new();
        let restored = Block::restore(
            &ids,
            BlockId::new(100),
            BlockTypeId::new("a"),
            GridPosition::new(0, 0),
        );
        assert_eq!(restored.id(), BlockId::new(100));

        let fresh = Block::new(&ids, BlockTypeId::new("b"), GridPosition::new(0, 1));
        assert!(fresh.id().get() > 100);
    }

    #[test]
    fn test_ensure_at_least_never_regresses() {
        let ids = BlockIdAllocator::new();
        ids.ensure_at_least(BlockId::new(50));
        ids.ensure_at_least(BlockId::new(10));
        assert_eq!(ids.last_issued(), 50);
        assert_eq!(ids.allocate(), BlockId::new(51));
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let ids = Arc::new(BlockIdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    let mut out = Vec::new();
                    for i in 0..250 {
                        if i % 50 == 0 {
                            ids.ensure_at_least(BlockId::new(t * 10));
                        }
                        out.push(ids.allocate().get());
                    }
                    out
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_can_interact_flags() {
        let ids = BlockIdAllocator::new();
        let mut block = Block::new(&ids, BlockTypeId::new("a"), GridPosition::new(0, 0));
        assert!(block.can_interact());
        block.is_falling = true;
        assert!(!block.can_interact());
        block.is_falling = false;
        block.is_being_destroyed = true;
        assert!(!block.can_interact());
    }

    #[test]
    fn test_display() {
        let ids = BlockIdAllocator::new();
        let block = Block::new(&ids, BlockTypeId::new("Fire"), GridPosition::new(2, 3));
        assert_eq!(block.to_string(), "Block[fire] at (2, 3)");
    }
}
