//! Generic merge sort over an index array, ported from
//! `original_source/core/sort.c`'s `merge_sort_indices`/`mergesort_generic_obj`.
//! This is the fallback path for kinds with no cheap bit-pattern mapping
//! (symbols compared by interned string, lists by element-wise compare).

use std::cmp::Ordering;

/// Stable merge sort of `0..len` indices using `cmp`, flipped for descending
/// order by the caller (the sign multiplier `original_source` applies at the
/// comparator call site).
pub fn merge_sort_indices<F>(len: usize, ascending: bool, mut cmp: F) -> Vec<u32>
where
    F: FnMut(u32, u32) -> Ordering,
{
    let mut indices: Vec<u32> = (0..len as u32).collect();
    if len < 2 {
        return indices;
    }
    let mut buf = indices.clone();
    merge_sort_rec(&mut indices, &mut buf, 0, len, ascending, &mut cmp);
    indices
}

fn merge_sort_rec<F>(
    indices: &mut [u32],
    buf: &mut [u32],
    lo: usize,
    hi: usize,
    ascending: bool,
    cmp: &mut F,
) where
    F: FnMut(u32, u32) -> Ordering,
{
    if hi - lo < 2 {
        return;
    }
    let mid = lo + (hi - lo) / 2;
    merge_sort_rec(indices, buf, lo, mid, ascending, cmp);
    merge_sort_rec(indices, buf, mid, hi, ascending, cmp);
    buf[lo..hi].copy_from_slice(&indices[lo..hi]);
    let (mut i, mut j, mut k) = (lo, mid, lo);
    while i < mid && j < hi {
        let ord = cmp(buf[i], buf[j]);
        let take_left = if ascending {
            ord != Ordering::Greater
        } else {
            ord != Ordering::Less
        };
        if take_left {
            indices[k] = buf[i];
            i += 1;
        } else {
            indices[k] = buf[j];
            j += 1;
        }
        k += 1;
    }
    while i < mid {
        indices[k] = buf[i];
        i += 1;
        k += 1;
    }
    while j < hi {
        indices[k] = buf[j];
        j += 1;
        k += 1;
    }
}

/// Plain insertion sort of an index array; used by the merge sort's small
/// partitions in `original_source` and useful on its own for tiny inputs.
pub fn insertion_sort_indices<F>(len: usize, ascending: bool, mut cmp: F) -> Vec<u32>
where
    F: FnMut(u32, u32) -> Ordering,
{
    let mut indices: Vec<u32> = (0..len as u32).collect();
    for i in 1..indices.len() {
        let mut j = i;
        while j > 0 {
            let ord = cmp(indices[j - 1], indices[j]);
            let in_order = if ascending {
                ord != Ordering::Greater
            } else {
                ord != Ordering::Less
            };
            if in_order {
                break;
            }
            indices.swap(j - 1, j);
            j -= 1;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_ascending() {
        let values = [5i64, 3, 1, 4, 2];
        let idx = merge_sort_indices(values.len(), true, |a, b| values[a as usize].cmp(&values[b as usize]));
        let sorted: Vec<i64> = idx.iter().map(|&i| values[i as usize]).collect();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sorts_descending() {
        let values = [5i64, 3, 1, 4, 2];
        let idx = merge_sort_indices(values.len(), false, |a, b| values[a as usize].cmp(&values[b as usize]));
        let sorted: Vec<i64> = idx.iter().map(|&i| values[i as usize]).collect();
        assert_eq!(sorted, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn insertion_matches_merge() {
        let values = [9i64, 1, 8, 2, 7, 3];
        let a = merge_sort_indices(values.len(), true, |a, b| values[a as usize].cmp(&values[b as usize]));
        let b = insertion_sort_indices(values.len(), true, |a, b| values[a as usize].cmp(&values[b as usize]));
        assert_eq!(a, b);
    }
}
