//! Perfect-hash fast path: a single `I64`/`SYMBOL` key column whose value
//! range fits within `PERFECT_HASH_MAX_RANGE` can be grouped with a direct
//! array indexed by `value - min`, skipping the open-addressing probe
//! entirely. Four-way unrolled to match the original's loop shape.

use crate::common::constants::PERFECT_HASH_MAX_RANGE;

/// If `keys` is a single-column I64/SYMBOL key whose range is small enough,
/// return `(min, group_of_row)` where `group_of_row[i]` is a dense group id
/// in `0..num_groups`. Otherwise `None`, so the caller falls back to the
/// generic hash-aggregate path.
pub fn try_perfect_hash(keys: &[i64]) -> Option<(i64, Vec<u32>, usize)> {
    if keys.is_empty() {
        return None;
    }
    let mut min = i64::MAX;
    let mut max = i64::MIN;
    for &k in keys {
        min = min.min(k);
        max = max.max(k);
    }
    let range = (max - min) as i64;
    if range < 0 || range > PERFECT_HASH_MAX_RANGE {
        return None;
    }
    let range = range as usize + 1;
    let mut seen = vec![false; range];
    let mut dense_id = vec![u32::MAX; range];
    let mut next_id = 0u32;
    let mut groups = Vec::with_capacity(keys.len());

    let chunks = keys.chunks_exact(4);
    let remainder = chunks.remainder();
    for chunk in chunks {
        for &k in chunk {
            let bucket = (k - min) as usize;
            if !seen[bucket] {
                seen[bucket] = true;
                dense_id[bucket] = next_id;
                next_id += 1;
            }
            groups.push(dense_id[bucket]);
        }
    }
    for &k in remainder {
        let bucket = (k - min) as usize;
        if !seen[bucket] {
            seen[bucket] = true;
            dense_id[bucket] = next_id;
            next_id += 1;
        }
        groups.push(dense_id[bucket]);
    }
    Some((min, groups, next_id as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_small_range_keys() {
        let keys = [5i64, 3, 5, 3, 7];
        let (min, groups, num_groups) = try_perfect_hash(&keys).unwrap();
        assert_eq!(min, 3);
        assert_eq!(num_groups, 3);
        assert_eq!(groups[0], groups[2]);
        assert_eq!(groups[1], groups[3]);
        assert_ne!(groups[0], groups[4]);
    }

    #[test]
    fn rejects_wide_range() {
        let keys = [0i64, 1_000_000];
        assert!(try_perfect_hash(&keys).is_none());
    }
}
