//! Per-VM arena heap: a buddy allocator over one or more growable pools,
//! with a slab fast path for small blocks.
//!
//! Each `Heap` is owned by exactly one VM/executor. Blocks handed out during
//! a worker-pool batch via [`Heap::borrow`] carry the owning heap's id in
//! their header so [`Heap::merge`] can tell which freed blocks are "foreign"
//! and must be queued rather than coalesced directly into the sub-heap's own
//! free lists.

mod backing;
mod buddy;

pub use backing::PoolBacking;
pub use buddy::{BlockHandle, Heap, HeapConfig, HeapStats};
