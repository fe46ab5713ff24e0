//! Lock-free bucket table: a fixed array of CAS-append singly linked chains,
//! used where multiple pool workers insert concurrently (the parallel
//! group-by merge pass and parallel join probe building). Each bucket head
//! is an `AtomicPtr` so chains are appended to, never mutated in place;
//! readers never block on a writer.

use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
    payload: T,
    hash: u64,
    next: AtomicPtr<Node<T>>,
}

/// A bucket array where each bucket is an atomic-CAS singly linked chain.
/// `T` should be small and `Copy` (row indices, group ids).
pub struct BucketTable<T> {
    buckets: Vec<AtomicPtr<Node<T>>>,
    mask: usize,
}

impl<T: Copy> BucketTable<T> {
    pub fn with_capacity(min_buckets: usize) -> Self {
        let cap = min_buckets.max(16).next_power_of_two();
        let mut buckets = Vec::with_capacity(cap);
        for _ in 0..cap {
            buckets.push(AtomicPtr::new(std::ptr::null_mut()));
        }
        BucketTable { buckets, mask: cap - 1 }
    }

    fn bucket_idx(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    /// Append `payload` to the chain for `hash`. Lock-free: retries the CAS
    /// until it wins a race with another inserting thread.
    pub fn insert(&self, hash: u64, payload: T) {
        let idx = self.bucket_idx(hash);
        let node = Box::into_raw(Box::new(Node {
            payload,
            hash,
            next: AtomicPtr::new(std::ptr::null_mut()),
        }));
        loop {
            let head = self.buckets[idx].load(Ordering::Acquire);
            unsafe {
                (*node).next.store(head, Ordering::Relaxed);
            }
            if self.buckets[idx]
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Walk the chain for `hash`, calling `visit` for each payload whose
    /// stored hash matches. Safe to call concurrently with `insert` on other
    /// buckets; readers see a consistent (if possibly stale) snapshot of
    /// this bucket's chain.
    pub fn for_each_matching<F: FnMut(T)>(&self, hash: u64, mut visit: F) {
        let idx = self.bucket_idx(hash);
        let mut cur = self.buckets[idx].load(Ordering::Acquire);
        while !cur.is_null() {
            let node = unsafe { &*cur };
            if node.hash == hash {
                visit(node.payload);
            }
            cur = node.next.load(Ordering::Acquire);
        }
    }
}

impl<T> Drop for BucketTable<T> {
    fn drop(&mut self) {
        for bucket in &self.buckets {
            let mut cur = bucket.load(Ordering::Relaxed);
            while !cur.is_null() {
                let node = unsafe { Box::from_raw(cur) };
                cur = node.next.load(Ordering::Relaxed);
            }
        }
    }
}

unsafe impl<T: Send> Send for BucketTable<T> {}
unsafe impl<T: Send> Sync for BucketTable<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn insert_and_walk() {
        let t: BucketTable<i64> = BucketTable::with_capacity(16);
        t.insert(5, 100);
        t.insert(5, 200);
        t.insert(6, 300);
        let mut found = Vec::new();
        t.for_each_matching(5, |p| found.push(p));
        found.sort();
        assert_eq!(found, vec![100, 200]);
    }

    #[test]
    fn concurrent_inserts_all_land() {
        let t = Arc::new(BucketTable::<i64>::with_capacity(16));
        let mut handles = Vec::new();
        for tid in 0..8 {
            let t = t.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    t.insert(7, tid * 100 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut count = 0;
        t.for_each_matching(7, |_| count += 1);
        assert_eq!(count, 800);
    }
}
