//! Row fingerprinting for group-by: fold each key column's bit pattern
//! through the mixer, seeded with `GROUP_HASH_SEED`.

use crate::common::constants::GROUP_HASH_SEED;
use crate::hash::mix64;
use crate::types::object::ObjData;

/// One column's contribution to a row's key, reduced to a `u64` word so it
/// can be folded through the mixer uniformly regardless of element kind.
fn key_word(data: &ObjData, row: usize) -> u64 {
    match data {
        ObjData::I64(v) | ObjData::Timestamp(v) => v[row] as u64,
        ObjData::I32(v) | ObjData::Date(v) | ObjData::Time(v) => v[row] as i64 as u64,
        ObjData::F64(v) => v[row].to_bits(),
        ObjData::U8(v) | ObjData::B8(v) | ObjData::C8(v) => v[row] as u64,
        ObjData::Symbol(v) => v[row] as u64,
        ObjData::Guid(v) => {
            let g = v[row];
            u64::from_le_bytes(g[0..8].try_into().unwrap()) ^ u64::from_le_bytes(g[8..16].try_into().unwrap())
        }
        _ => 0,
    }
}

/// Fingerprint for `row` across every key column.
pub fn row_fingerprint(key_cols: &[&ObjData], row: usize) -> u64 {
    let mut h = GROUP_HASH_SEED;
    for col in key_cols {
        h = mix64(h, key_word(col, row));
    }
    h
}

/// True if every key column's value at `a` equals its value at `b`.
pub fn rows_equal(key_cols: &[&ObjData], a: usize, b: usize) -> bool {
    key_cols.iter().all(|col| match col {
        ObjData::I64(v) | ObjData::Timestamp(v) => v[a] == v[b],
        ObjData::I32(v) | ObjData::Date(v) | ObjData::Time(v) => v[a] == v[b],
        ObjData::F64(v) => v[a].to_bits() == v[b].to_bits(),
        ObjData::U8(v) | ObjData::B8(v) | ObjData::C8(v) => v[a] == v[b],
        ObjData::Symbol(v) => v[a] == v[b],
        ObjData::Guid(v) => v[a] == v[b],
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_keys_same_fingerprint() {
        let a = ObjData::I64(vec![1, 2, 1]);
        let cols = [&a];
        assert_eq!(row_fingerprint(&cols, 0), row_fingerprint(&cols, 2));
        assert_ne!(row_fingerprint(&cols, 0), row_fingerprint(&cols, 1));
    }

    #[test]
    fn equality_matches_fingerprint_collisions() {
        let a = ObjData::I64(vec![1, 2, 1]);
        let cols = [&a];
        assert!(rows_equal(&cols, 0, 2));
        assert!(!rows_equal(&cols, 0, 1));
    }
}
