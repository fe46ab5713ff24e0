//! Heap round-trip properties: every live allocation is readable/writable,
//! freeing then reallocating the same size reuses space without growing the
//! pool count, and borrow/merge reclaims foreign blocks freed by a sub-heap.

use rayforce::heap::{Heap, HeapConfig};

#[test]
fn alloc_write_read_round_trips() {
    let mut heap = Heap::new(HeapConfig::default()).unwrap();
    let handle = heap.alloc(128).unwrap();
    heap.bytes_mut(handle).fill(0xAB);
    assert!(heap.bytes(handle).iter().all(|&b| b == 0xAB));
    heap.free(handle);
}

#[test]
fn repeated_alloc_free_does_not_grow_pool_count_unboundedly() {
    let mut heap = Heap::new(HeapConfig::default()).unwrap();
    let before = heap.memstat().pools;
    for _ in 0..1000 {
        let h = heap.alloc(64).unwrap();
        heap.free(h);
    }
    let after = heap.memstat().pools;
    assert_eq!(before, after);
}

#[test]
fn borrow_and_merge_reclaims_sub_heap_allocations() {
    let mut heap = Heap::new(HeapConfig::default()).unwrap();
    let mut sub_heaps = heap.borrow(4).unwrap();
    let mut handles = Vec::new();
    for sub in sub_heaps.iter_mut() {
        handles.push(sub.alloc(256).unwrap());
    }
    for (sub, h) in sub_heaps.iter_mut().zip(handles.iter()) {
        sub.free(*h);
    }
    heap.merge(sub_heaps);
    // Heap remains usable for further allocations after merge.
    let h = heap.alloc(256).unwrap();
    heap.free(h);
}

#[test]
fn gc_sweep_reports_nonzero_stats_after_allocation() {
    let mut heap = Heap::new(HeapConfig::default()).unwrap();
    let h = heap.alloc(512).unwrap();
    let stats = heap.gc_sweep();
    assert!(stats.pools >= 1);
    heap.free(h);
}
