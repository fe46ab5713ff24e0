//! Counting sort for small-range integer columns (range below
//! `COUNTING_SORT_MAX_RANGE`), ported from the counting-sort branch of
//! `original_source/core/sort.c`'s dispatcher.

use crate::types::null::i64_is_null;

/// Counting-sort index permutation for `values`, given the value range is
/// known to be small. NULLs (`i64::MIN`) sort first ascending, last
/// descending, matching the NULL-partition convention used by the radix
/// path.
pub fn counting_sort_i64(values: &[i64], ascending: bool) -> Vec<u32> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut min = i64::MAX;
    let mut max = i64::MIN;
    let mut null_indices = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if i64_is_null(v) {
            null_indices.push(i as u32);
            continue;
        }
        min = min.min(v);
        max = max.max(v);
    }
    let non_null_count = values.len() - null_indices.len();
    if non_null_count == 0 {
        return null_indices;
    }
    let range = (max - min) as usize + 1;
    let mut buckets = vec![0u32; range];
    for &v in values {
        if !i64_is_null(v) {
            buckets[(v - min) as usize] += 1;
        }
    }
    let mut offsets = vec![0u32; range];
    let mut acc = 0u32;
    for b in 0..range {
        offsets[b] = acc;
        acc += buckets[b];
    }
    let mut out = vec![0u32; non_null_count];
    let mut cursor = offsets.clone();
    for (i, &v) in values.iter().enumerate() {
        if i64_is_null(v) {
            continue;
        }
        let bucket = (v - min) as usize;
        out[cursor[bucket] as usize] = i as u32;
        cursor[bucket] += 1;
    }
    if !ascending {
        out.reverse();
    }
    if ascending {
        let mut result = null_indices;
        result.extend(out);
        result
    } else {
        let mut result = out;
        result.extend(null_indices);
        result
    }
}
