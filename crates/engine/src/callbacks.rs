//! Presentation callbacks awaited by commands
//!
//! Commands do not animate anything. They call these hooks and wait for the
//! returned futures before treating a step as visually settled. Block
//! arguments are snapshots taken when the hook fires, since the grid itself
//! stays behind the session lock.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use crate::core::{Block, BlockMove};
use crate::persistence::BoxFuture;
use crate::types::GridPosition;

/// `(block, old_position)` after a move or swap
pub type BlockMovedFn = Arc<dyn Fn(Block, GridPosition) -> BoxFuture<'static, ()> + Send + Sync>;

/// One gravity step
pub type BlockFallFn = Arc<dyn Fn(BlockMove) -> BoxFuture<'static, ()> + Send + Sync>;

/// A matched block about to be removed
pub type BlockDestroyFn = Arc<dyn Fn(Block) -> BoxFuture<'static, ()> + Send + Sync>;

/// Async continuation with no arguments
pub type AsyncHookFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Synchronous notification
pub type HookFn = Arc<dyn Fn() + Send + Sync>;

pub fn block_moved<F, Fut>(f: F) -> BlockMovedFn
where
    F: Fn(Block, GridPosition) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |block, old| Box::pin(f(block, old)))
}

pub fn block_fall<F, Fut>(f: F) -> BlockFallFn
where
    F: Fn(BlockMove) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |mv| Box::pin(f(mv)))
}

pub fn block_destroy<F, Fut>(f: F) -> BlockDestroyFn
where
    F: Fn(Block) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |block| Box::pin(f(block)))
}

pub fn async_hook<F, Fut>(f: F) -> AsyncHookFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

pub fn hook<F>(f: F) -> HookFn
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run every future concurrently and wait until all of them settle.
///
/// Each future runs as its own task, so a panicking callback is logged and
/// never unwinds into the caller.
pub async fn join_all(futures: Vec<BoxFuture<'static, ()>>) {
    let mut set = JoinSet::new();
    for fut in futures {
        set.spawn(fut);
    }
    while let Some(result) = set.join_next().await {
        if let Err(err) = result {
            warn!(error = %err, "animation callback failed");
        }
    }
}
