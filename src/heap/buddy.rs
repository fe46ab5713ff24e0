//! Buddy allocator with a slab fast path for small blocks.
//!
//! Grounded on `original_source/core/heap.c`: blocks are tracked by order
//! (size = `1 << order`), `AVAIL_MASK`-style bitmasks let allocation find the
//! smallest available order with `trailing_zeros`, and `heap_free` walks the
//! XOR-buddy chain coalescing as far up as it can. Blocks below
//! `SLAB_MAX_ORDER` are served from per-size free lists instead (the slab
//! fast path), following the teacher's `BufferPool` idiom of reusable byte
//! buffers rather than raw pointer arithmetic: a `Heap` hands out
//! [`BlockHandle`] indices into its pools, never bare pointers.

use log::{debug, trace};
use parking_lot::Mutex;

use crate::common::error::{RayError, RayResult};
use crate::heap::backing::PoolBacking;

pub const MIN_ORDER: u32 = 5; // 32 bytes
pub const MAX_ORDER: u32 = 30; // 1 GiB per pool
pub const SLAB_MAX_ORDER: u32 = 6; // blocks <= 64 bytes use the slab path
const NUM_ORDERS: usize = (MAX_ORDER - MIN_ORDER + 1) as usize;

fn size_to_order(size: usize) -> u32 {
    let size = size.max(1);
    let mut order = MIN_ORDER;
    while (1usize << order) < size {
        order += 1;
    }
    order
}

/// A handle to a live allocation: which pool it lives in, its byte offset
/// within that pool, and the order it was allocated at (needed to compute
/// its buddy on free).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub pool: u32,
    pub offset: u32,
    pub order: u32,
    /// Id of the heap that originally allocated this block. Used by
    /// [`Heap::merge`] to detect foreign frees after a borrow/merge cycle.
    pub owner: u32,
}

struct Pool {
    backing: PoolBacking,
    order: u32,
    /// `free_lists[order - MIN_ORDER]` holds free block offsets at that order.
    free_lists: Vec<Vec<u32>>,
    avail_mask: u64,
}

impl Pool {
    fn new(order: u32) -> RayResult<Self> {
        let size = 1usize << order;
        let backing = PoolBacking::allocate(size)?;
        let mut free_lists: Vec<Vec<u32>> = (0..=NUM_ORDERS).map(|_| Vec::new()).collect();
        free_lists[(order - MIN_ORDER) as usize].push(0);
        Ok(Pool {
            backing,
            order,
            free_lists,
            avail_mask: 1u64 << (order - MIN_ORDER),
        })
    }

    fn idx(order: u32) -> usize {
        (order - MIN_ORDER) as usize
    }

    fn pop_at(&mut self, order: u32) -> Option<u32> {
        let idx = Self::idx(order);
        let off = self.free_lists[idx].pop();
        if self.free_lists[idx].is_empty() {
            self.avail_mask &= !(1u64 << idx);
        }
        off
    }

    fn push_at(&mut self, order: u32, offset: u32) {
        let idx = Self::idx(order);
        self.free_lists[idx].push(offset);
        self.avail_mask |= 1u64 << idx;
    }

    /// Find the smallest available order >= `order`, split it down to
    /// `order`, and return the resulting block offset.
    fn alloc_order(&mut self, order: u32) -> Option<u32> {
        let start_idx = Self::idx(order);
        let mask = self.avail_mask & !((1u64 << start_idx) - 1);
        if mask == 0 {
            return None;
        }
        let found_idx = mask.trailing_zeros() as usize;
        let found_order = found_idx as u32 + MIN_ORDER;
        let offset = self.pop_at(found_order)?;
        // split down from found_order to order
        let mut cur_order = found_order;
        let mut cur_off = offset;
        while cur_order > order {
            cur_order -= 1;
            let buddy_off = cur_off + (1u32 << cur_order);
            self.push_at(cur_order, buddy_off);
        }
        Some(cur_off)
    }

    fn buddy_of(offset: u32, order: u32) -> u32 {
        offset ^ (1u32 << order)
    }

    /// Coalesce a freed block as far up the buddy chain as possible.
    fn free_order(&mut self, offset: u32, order: u32) {
        let mut cur_off = offset;
        let mut cur_order = order;
        while cur_order < self.order {
            let buddy = Self::buddy_of(cur_off, cur_order);
            let idx = Self::idx(cur_order);
            if let Some(pos) = self.free_lists[idx].iter().position(|&o| o == buddy) {
                self.free_lists[idx].swap_remove(pos);
                if self.free_lists[idx].is_empty() {
                    self.avail_mask &= !(1u64 << idx);
                }
                cur_off = cur_off.min(buddy);
                cur_order += 1;
            } else {
                break;
            }
        }
        self.push_at(cur_order, cur_off);
    }
}

/// Tunables for a [`Heap`] instance. See [`crate::common::config::VmConfig`]
/// for the VM-wide configuration these are usually derived from.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    pub initial_pool_order: u32,
    pub slab_capacity: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            initial_pool_order: 20, // 1 MiB
            slab_capacity: 4096,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeapStats {
    pub pools: usize,
    pub bytes_reserved: usize,
    pub slab_blocks_cached: usize,
}

/// A single-owner arena heap. Safe to use from exactly one thread at a time;
/// a [`crate::pool::WorkerPool`] batch borrows sub-heaps via [`Heap::borrow`]
/// and reclaims them with [`Heap::merge`].
pub struct Heap {
    id: u32,
    pools: Vec<Pool>,
    config: HeapConfig,
    /// Free lists for the slab fast path, keyed by slab order
    /// (`MIN_ORDER..=SLAB_MAX_ORDER`).
    slab_free: Vec<Vec<BlockHandle>>,
    /// Blocks freed by a sub-heap that do not belong to it; queued here for
    /// the owning heap to reclaim on the next `merge`.
    foreign: Mutex<Vec<BlockHandle>>,
}

static NEXT_HEAP_ID: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(1);

impl Heap {
    pub fn new(config: HeapConfig) -> RayResult<Self> {
        let id = NEXT_HEAP_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let pool = Pool::new(config.initial_pool_order)?;
        debug!(
            "heap {} created, initial pool order {}",
            id, config.initial_pool_order
        );
        let slab_free = (MIN_ORDER..=SLAB_MAX_ORDER).map(|_| Vec::new()).collect();
        Ok(Heap {
            id,
            pools: vec![pool],
            config,
            slab_free,
            foreign: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    fn slab_idx(order: u32) -> usize {
        (order - MIN_ORDER) as usize
    }

    pub fn alloc(&mut self, size: usize) -> RayResult<BlockHandle> {
        let order = size_to_order(size);
        if order <= SLAB_MAX_ORDER {
            let idx = Self::slab_idx(order);
            if let Some(h) = self.slab_free[idx].pop() {
                return Ok(h);
            }
        }
        for (pi, pool) in self.pools.iter_mut().enumerate() {
            if let Some(off) = pool.alloc_order(order) {
                return Ok(BlockHandle {
                    pool: pi as u32,
                    offset: off,
                    order,
                    owner: self.id,
                });
            }
        }
        self.grow(order)?;
        let pi = self.pools.len() - 1;
        let off = self.pools[pi]
            .alloc_order(order)
            .ok_or(RayError::Limit { limit: 1u64 << order })?;
        Ok(BlockHandle {
            pool: pi as u32,
            offset: off,
            order,
            owner: self.id,
        })
    }

    fn grow(&mut self, min_order: u32) -> RayResult<()> {
        let last_order = self.pools.last().map(|p| p.order).unwrap_or(self.config.initial_pool_order);
        let new_order = (last_order + 1).max(min_order + 1).min(MAX_ORDER);
        trace!("heap {} growing: new pool order {}", self.id, new_order);
        self.pools.push(Pool::new(new_order)?);
        Ok(())
    }

    pub fn free(&mut self, handle: BlockHandle) {
        if handle.owner != self.id {
            self.foreign.lock().push(handle);
            return;
        }
        if handle.order <= SLAB_MAX_ORDER && self.slab_free_len(handle.order) < self.config.slab_capacity {
            let idx = Self::slab_idx(handle.order);
            self.slab_free[idx].push(handle);
            return;
        }
        self.pools[handle.pool as usize].free_order(handle.offset, handle.order);
    }

    fn slab_free_len(&self, order: u32) -> usize {
        self.slab_free[Self::slab_idx(order)].len()
    }

    pub fn realloc(&mut self, handle: BlockHandle, new_size: usize) -> RayResult<BlockHandle> {
        let new_order = size_to_order(new_size);
        if new_order == handle.order {
            return Ok(handle);
        }
        let new_handle = self.alloc(new_size)?;
        let old_size = 1usize << handle.order;
        let copy_len = old_size.min(new_size);
        {
            let (src_slice, dst_slice) = self.block_slices(handle, new_handle);
            dst_slice[..copy_len].copy_from_slice(&src_slice[..copy_len]);
        }
        self.free(handle);
        Ok(new_handle)
    }

    fn block_slices(&mut self, src: BlockHandle, dst: BlockHandle) -> (Vec<u8>, &mut [u8]) {
        let src_bytes = self.bytes(src).to_vec();
        (src_bytes, self.bytes_mut(dst))
    }

    pub fn bytes(&self, handle: BlockHandle) -> &[u8] {
        let pool = &self.pools[handle.pool as usize];
        let start = handle.offset as usize;
        let len = 1usize << handle.order;
        &pool.backing.as_slice()[start..start + len]
    }

    pub fn bytes_mut(&mut self, handle: BlockHandle) -> &mut [u8] {
        let pool = &mut self.pools[handle.pool as usize];
        let start = handle.offset as usize;
        let len = 1usize << handle.order;
        &mut pool.backing.as_mut_slice()[start..start + len]
    }

    /// Split this heap's remaining capacity into `n` sub-heaps for a
    /// worker-pool batch. Each sub-heap starts with its own fresh pool; any
    /// block it frees that was allocated by this heap (or another sub-heap)
    /// is queued as foreign rather than coalesced locally.
    pub fn borrow(&self, n: usize) -> RayResult<Vec<Heap>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(Heap::new(self.config)?);
        }
        Ok(out)
    }

    /// Reclaim sub-heaps after a batch: fold each one's own foreign queue
    /// back into this heap and drop the sub-heap's pools.
    pub fn merge(&mut self, sub_heaps: Vec<Heap>) {
        for mut sub in sub_heaps {
            let foreign: Vec<BlockHandle> = std::mem::take(&mut *sub.foreign.lock());
            for handle in foreign {
                if handle.owner == self.id {
                    self.free(handle);
                } else {
                    self.foreign.lock().push(handle);
                }
            }
        }
        let own_foreign: Vec<BlockHandle> = std::mem::take(&mut *self.foreign.lock());
        for handle in own_foreign {
            if handle.owner == self.id {
                self.free(handle);
            }
        }
    }

    /// Flush every slab-cached block back into its pool's buddy free list,
    /// coalescing where possible, then unmap any pool that comes back fully
    /// free. Object lifetime itself is still managed entirely by
    /// [`crate::types::object::ObjRef`] refcounts; this only reclaims
    /// allocator-level bookkeeping a live heap would otherwise hold onto.
    ///
    /// Only trailing pools are ever popped: a [`BlockHandle`] carries its
    /// pool by vector index, so releasing a pool out of order would
    /// invalidate handles still live in pools after it.
    pub fn gc_sweep(&mut self) -> HeapStats {
        let slab_free = std::mem::replace(
            &mut self.slab_free,
            (MIN_ORDER..=SLAB_MAX_ORDER).map(|_| Vec::new()).collect(),
        );
        for handles in slab_free {
            for handle in handles {
                self.pools[handle.pool as usize].free_order(handle.offset, handle.order);
            }
        }

        while self.pools.len() > 1 {
            let last = self.pools.last().expect("loop guard ensures at least one pool");
            let idx = Pool::idx(last.order);
            if last.free_lists[idx].len() == 1 {
                self.pools.pop();
            } else {
                break;
            }
        }

        self.memstat()
    }

    pub fn memstat(&self) -> HeapStats {
        let bytes_reserved: usize = self.pools.iter().map(|p| p.backing.len()).sum();
        let slab_blocks_cached: usize = self.slab_free.iter().map(|v| v.len()).sum();
        HeapStats {
            pools: self.pools.len(),
            bytes_reserved,
            slab_blocks_cached,
        }
    }
}
