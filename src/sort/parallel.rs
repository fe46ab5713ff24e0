//! Parallel sort: three-phase histogram / prefix-sum / scatter, same shape
//! as the serial radix sort but splitting the top digit's histogram and
//! scatter phases across the worker pool. Each of the resulting top-digit
//! buckets is small enough to finish with the serial radix/merge path, so
//! this only parallelizes the single most expensive pass.

use crate::heap::Heap;
use crate::pool::WorkerPool;
use crate::sort::radix::radix_sort_i64;
use crate::types::null::i64_is_null;

const TOP_SHIFT: u32 = 56;
const BUCKETS: usize = 256;

fn i64_sort_key(v: i64) -> u64 {
    (v as u64) ^ 0x8000_0000_0000_0000
}

/// Parallel ascending/descending sort of a large `i64` column. Splits the
/// input into `pool.worker_count()` chunks, has each worker histogram its
/// chunk's top byte, merges the per-worker histograms into one prefix-sum
/// table, then has each worker scatter its elements directly into their
/// final top-level bucket range before the buckets are each finished
/// serially.
pub fn parallel_sort_i64(pool: &WorkerPool, heap: &mut Heap, values: &[i64], ascending: bool) -> Vec<u32> {
    let n = values.len();
    let workers = pool.worker_count().max(1);
    if n == 0 || workers <= 1 {
        return radix_sort_i64(values, ascending);
    }

    let mut nulls: Vec<u32> = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if i64_is_null(v) {
            nulls.push(i as u32);
        }
    }

    let chunk_size = (n + workers - 1) / workers;
    let chunks: Vec<(usize, usize)> = (0..workers)
        .map(|w| (w * chunk_size, ((w + 1) * chunk_size).min(n)))
        .filter(|(lo, hi)| lo < hi)
        .collect();

    // Phase 1: per-chunk histogram of the top byte.
    let values_ptr = values.as_ptr() as usize;
    let histograms: Vec<[u32; BUCKETS]> = pool.pool_map(heap, chunks.clone(), move |_heap, (lo, hi)| {
        let values: &[i64] = unsafe { std::slice::from_raw_parts(values_ptr as *const i64, n) };
        let mut hist = [0u32; BUCKETS];
        for &v in &values[lo..hi] {
            if i64_is_null(v) {
                continue;
            }
            let key = i64_sort_key(v);
            hist[((key >> TOP_SHIFT) & 0xff) as usize] += 1;
        }
        hist
    });

    // Phase 2: sequential prefix sum across buckets, folding all chunk
    // histograms (this step is cheap relative to phase 1/3 and gains
    // nothing from parallelizing).
    let mut bucket_totals = [0u32; BUCKETS];
    for hist in &histograms {
        for b in 0..BUCKETS {
            bucket_totals[b] += hist[b];
        }
    }
    let mut bucket_offsets = [0u32; BUCKETS];
    let mut acc = 0u32;
    for b in 0..BUCKETS {
        bucket_offsets[b] = acc;
        acc += bucket_totals[b];
    }
    // Per-chunk starting offset within each bucket.
    let mut chunk_cursors: Vec<[u32; BUCKETS]> = vec![[0u32; BUCKETS]; chunks.len()];
    for b in 0..BUCKETS {
        let mut cursor = bucket_offsets[b];
        for (ci, hist) in histograms.iter().enumerate() {
            chunk_cursors[ci][b] = cursor;
            cursor += hist[b];
        }
    }

    // Phase 3: scatter each chunk's (non-null) indices into a shared output
    // buffer using the precomputed cursors; disjoint write ranges per
    // chunk/bucket combination mean no two tasks touch the same slot.
    let non_null_count = (n - nulls.len()) as usize;
    let mut out = vec![0u32; non_null_count];
    let out_ptr = out.as_mut_ptr() as usize;
    let jobs: Vec<(usize, (usize, usize), [u32; BUCKETS])> = chunks
        .iter()
        .zip(chunk_cursors.into_iter())
        .enumerate()
        .map(|(ci, (&range, cursors))| (ci, range, cursors))
        .collect();
    pool.pool_map(heap, jobs, move |_heap, (_ci, (lo, hi), mut cursors)| {
        let values: &[i64] = unsafe { std::slice::from_raw_parts(values_ptr as *const i64, n) };
        let out: &mut [u32] = unsafe { std::slice::from_raw_parts_mut(out_ptr as *mut u32, non_null_count) };
        for i in lo..hi {
            let v = values[i];
            if i64_is_null(v) {
                continue;
            }
            let key = i64_sort_key(v);
            let bucket = ((key >> TOP_SHIFT) & 0xff) as usize;
            out[cursors[bucket] as usize] = i as u32;
            cursors[bucket] += 1;
        }
    });

    // Finish each top-level bucket with the serial radix sort (buckets are
    // now small and independent, so a second pool round isn't worthwhile).
    let mut finished = Vec::with_capacity(non_null_count);
    for b in 0..BUCKETS {
        let start = bucket_offsets[b] as usize;
        let len = bucket_totals[b] as usize;
        if len == 0 {
            continue;
        }
        let slice = &out[start..start + len];
        let local_values: Vec<i64> = slice.iter().map(|&idx| values[idx as usize]).collect();
        let local_order = radix_sort_i64(&local_values, true);
        finished.extend(local_order.into_iter().map(|li| slice[li as usize]));
    }

    if !ascending {
        finished.reverse();
    }
    if ascending {
        let mut result = nulls;
        result.extend(finished);
        result
    } else {
        finished.extend(nulls);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapConfig;

    #[test]
    fn matches_serial_sort() {
        let pool = WorkerPool::new(4);
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let values: Vec<i64> = (0..5000).map(|i| (i * 7919) % 10007 - 5000).collect();
        let parallel = parallel_sort_i64(&pool, &mut heap, &values, true);
        let serial = radix_sort_i64(&values, true);
        let parallel_vals: Vec<i64> = parallel.iter().map(|&i| values[i as usize]).collect();
        let serial_vals: Vec<i64> = serial.iter().map(|&i| values[i as usize]).collect();
        assert_eq!(parallel_vals, serial_vals);
        pool.shutdown();
    }
}
