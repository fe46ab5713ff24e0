//! Fused parallel aggregate: split rows across up to
//! `MAX_AGGREGATE_WORKERS` pool workers, have each build a local group
//! table over its chunk, then merge the per-worker partial results by their
//! stored hash into one final table. Only worth it above
//! `PARALLEL_ROW_THRESHOLD` rows with more than one worker available;
//! below that (or with a single worker) callers should just call
//! [`crate::aggregate::hash_aggregate::aggregate`] directly.
//!
//! Grounded on `original_source/core/group.c`'s `build_partitions`/
//! `aggregate_partitions` split, generalized here to a single-I64-key
//! sum/count/min/max reduction (the common case the fused fast path
//! targets) rather than the fully generic multi-column engine.

use crate::common::constants::{MAX_AGGREGATE_WORKERS, PARALLEL_ROW_THRESHOLD};
use crate::hash::{mix64, OpenAddressTable};
use crate::heap::Heap;
use crate::pool::WorkerPool;
use crate::types::null::{i64_is_null, I64_NULL};

struct LocalGroup {
    key: i64,
    sum: i64,
    count: i64,
    min: i64,
    max: i64,
    /// Whether any non-NULL value has folded into this group yet; a group
    /// with only NULL values reports `min`/`max` as the NULL sentinel.
    seen: bool,
}

fn local_aggregate(keys: &[i64], values: &[i64]) -> Vec<(u64, LocalGroup)> {
    let mut table: OpenAddressTable<usize> = OpenAddressTable::with_capacity((keys.len() / 2).max(8));
    let mut groups: Vec<LocalGroup> = Vec::new();
    for (i, &k) in keys.iter().enumerate() {
        let hash = mix64(crate::common::constants::GROUP_HASH_SEED, k as u64);
        let (gid, created) = table.find_or_create(hash, |gid| groups[gid].key == k, || groups.len());
        if created {
            groups.push(LocalGroup { key: k, sum: 0, count: 0, min: i64::MAX, max: i64::MIN, seen: false });
        }
        let v = values[i];
        if !i64_is_null(v) {
            let g = &mut groups[gid];
            g.sum = g.sum.wrapping_add(v);
            g.count += 1;
            g.min = g.min.min(v);
            g.max = g.max.max(v);
            g.seen = true;
        }
    }
    groups
        .into_iter()
        .map(|g| (mix64(crate::common::constants::GROUP_HASH_SEED, g.key as u64), g))
        .collect()
}

/// Parallel sum/count/min/max of `values` grouped by `keys`. Falls back to
/// running `local_aggregate` once on the whole input (still correct, just
/// serial) when the row count or worker count doesn't clear the fused
/// fast-path thresholds.
pub fn parallel_aggregate_i64(
    pool: &WorkerPool,
    heap: &mut Heap,
    keys: &[i64],
    values: &[i64],
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>) {
    let n = keys.len();
    let workers = pool.worker_count().min(MAX_AGGREGATE_WORKERS);
    let partials = if n < PARALLEL_ROW_THRESHOLD || workers <= 1 {
        vec![local_aggregate(keys, values)]
    } else {
        let chunk_size = (n + workers - 1) / workers;
        let keys_ptr = keys.as_ptr() as usize;
        let values_ptr = values.as_ptr() as usize;
        let ranges: Vec<(usize, usize)> = (0..workers)
            .map(|w| (w * chunk_size, ((w + 1) * chunk_size).min(n)))
            .filter(|(lo, hi)| lo < hi)
            .collect();
        pool.pool_map(heap, ranges, move |_heap, (lo, hi)| {
            let keys: &[i64] = unsafe { std::slice::from_raw_parts(keys_ptr as *const i64, n) };
            let values: &[i64] = unsafe { std::slice::from_raw_parts(values_ptr as *const i64, n) };
            local_aggregate(&keys[lo..hi], &values[lo..hi])
        })
    };

    // Merge pass: fold every worker's partials into one table, keyed by
    // their already-computed hash (no need to re-hash the key).
    let mut merged: OpenAddressTable<usize> = OpenAddressTable::with_capacity((n / 2).max(8));
    let mut final_groups: Vec<LocalGroup> = Vec::new();
    for worker_partials in partials {
        for (hash, g) in worker_partials {
            let (gid, created) =
                merged.find_or_create(hash, |gid| final_groups[gid].key == g.key, || final_groups.len());
            if created {
                final_groups.push(g);
            } else {
                let existing = &mut final_groups[gid];
                existing.sum = existing.sum.wrapping_add(g.sum);
                existing.count += g.count;
                if g.seen {
                    existing.min = if existing.seen { existing.min.min(g.min) } else { g.min };
                    existing.max = if existing.seen { existing.max.max(g.max) } else { g.max };
                    existing.seen = true;
                }
            }
        }
    }

    let mut out_keys = Vec::with_capacity(final_groups.len());
    let mut out_sum = Vec::with_capacity(final_groups.len());
    let mut out_count = Vec::with_capacity(final_groups.len());
    let mut out_min = Vec::with_capacity(final_groups.len());
    let mut out_max = Vec::with_capacity(final_groups.len());
    for g in final_groups {
        out_keys.push(g.key);
        out_sum.push(g.sum);
        out_count.push(g.count);
        out_min.push(if g.seen { g.min } else { I64_NULL });
        out_max.push(if g.seen { g.max } else { I64_NULL });
    }
    (out_keys, out_sum, out_count, out_min, out_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapConfig;

    #[test]
    fn matches_serial_for_small_input() {
        let pool = WorkerPool::new(4);
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let keys = vec![1i64, 2, 1, 2, 3];
        let values = vec![10i64, 20, 30, 40, 50];
        let (ks, sums, counts, _mins, _maxs) = parallel_aggregate_i64(&pool, &mut heap, &keys, &values);
        for (k, s) in ks.iter().zip(sums.iter()) {
            match k {
                1 => assert_eq!(*s, 40),
                2 => assert_eq!(*s, 60),
                3 => assert_eq!(*s, 50),
                _ => panic!("unexpected key"),
            }
        }
        assert_eq!(counts.iter().sum::<i64>(), 5);
        pool.shutdown();
    }

    #[test]
    fn null_values_are_skipped() {
        let pool = WorkerPool::new(4);
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let keys = vec![1i64, 1, 2];
        let values = vec![10i64, I64_NULL, I64_NULL];
        let (ks, sums, counts, mins, _maxs) = parallel_aggregate_i64(&pool, &mut heap, &keys, &values);
        for (i, k) in ks.iter().enumerate() {
            match k {
                1 => {
                    assert_eq!(sums[i], 10);
                    assert_eq!(counts[i], 1);
                    assert_eq!(mins[i], 10);
                }
                2 => {
                    assert_eq!(sums[i], 0);
                    assert_eq!(counts[i], 0);
                    assert_eq!(mins[i], I64_NULL);
                }
                other => panic!("unexpected key {other}"),
            }
        }
        pool.shutdown();
    }

    #[test]
    fn large_input_uses_fused_path() {
        let pool = WorkerPool::new(4);
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let n = 200_000;
        let keys: Vec<i64> = (0..n).map(|i| i % 100).collect();
        let values: Vec<i64> = (0..n).map(|_| 1).collect();
        let (ks, _sums, counts, _mins, _maxs) = parallel_aggregate_i64(&pool, &mut heap, &keys, &values);
        assert_eq!(ks.len(), 100);
        assert_eq!(counts.iter().sum::<i64>(), n);
        pool.shutdown();
    }
}
