//! The timed memory hierarchy.
//!
//! Every level of the hierarchy implements [`TimedMemory`]: a multi-cycle
//! read or write advances one step per call, and the caller must keep
//! calling with identical parameters until the operation completes. The
//! per-level state machine guarantees a single in-flight operation.

pub mod cache;
pub mod main_memory;

use serde::Deserialize;

use crate::common::{Block, SimError};

pub use cache::{CacheEntry, TimedCache};
pub use main_memory::TimedMainMemory;

/// The state of a timed memory's single operation slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryState {
    Ready,
    Reading,
    Writing,
}

/// How stores interact with the lower memory level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum WriteScheme {
    /// Every store writes both the cache and the lower memory.
    WriteThrough,
    /// Stores write only the cache; dirty lines are written back on
    /// eviction.
    WriteBack,
}

/// Which line to evict when a set is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum ReplacementPolicy {
    /// Uniform pseudo-random choice among the ways of the set.
    Random,
    /// Exact least-recently-used, via per-entry access stamps.
    PreciseLru,
    /// Tree-based pseudo-LRU over S-1 bits per set
    /// (Patterson-Hennessy 5.8).
    ApproximateLru,
}

/// A memory level that completes reads and writes over multiple cycles.
///
/// `read_block` yields `None` and `write_block` yields `false` on every
/// call until the operation completes. During an in-flight operation every
/// call must repeat the same `(addr, len)`; starting a read while a write
/// is in flight (or vice versa) is a caller bug and asserts in debug
/// builds. A completed operation returns the memory to [`MemoryState::Ready`]
/// before yielding its result.
pub trait TimedMemory {
    /// Advances an `nwords`-word read at byte address `addr` by one cycle.
    fn read_block(&mut self, addr: u32, nwords: usize) -> Result<Option<Block>, SimError>;

    /// Advances a write of `block` at byte address `addr` by one cycle.
    fn write_block(&mut self, addr: u32, block: &Block) -> Result<bool, SimError>;

    fn state(&self) -> MemoryState;

    /// Instantaneous analog of [`TimedMemory::read_block`]. Only for tests
    /// and program loading.
    fn read_block_now(&mut self, addr: u32, nwords: usize) -> Result<Block, SimError> {
        loop {
            if let Some(block) = self.read_block(addr, nwords)? {
                return Ok(block);
            }
        }
    }

    /// Instantaneous analog of [`TimedMemory::write_block`]. Only for tests
    /// and program loading.
    fn write_block_now(&mut self, addr: u32, block: &Block) -> Result<(), SimError> {
        while !self.write_block(addr, block)? {}
        Ok(())
    }
}
