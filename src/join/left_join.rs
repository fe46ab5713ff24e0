//! Left-join index build, ported from `original_source/core/join.c`:
//! `build_idx` (open-addressing table sized `2 * max(|L|, |R|)`, seeded row
//! hashes, first-insertion-wins), `ray_lj` (the full left join: validate,
//! compute key columns, build the index, union non-key column names,
//! gather via `select_column`), and the `k == 1` delegation to a generic
//! `find` primitive instead of building a multi-column index.

use crate::common::constants::JOIN_HASH_SEED;
use crate::common::error::{RayError, RayResult};
use crate::hash::{mix64, OpenAddressTable};
use crate::types::element::ElementKind;
use crate::types::null::{I32_NULL, I64_NULL, U8_NULL};
use crate::types::object::ObjData;
use crate::types::table::{table, table_column};
use crate::types::{AttrBits, ObjRef};

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

fn row_hash(cols: &[&ObjData], row: usize) -> u64 {
    let mut h = JOIN_HASH_SEED;
    for col in cols {
        h = mix64(h, key_word(col, row));
    }
    h
}

/// Row equality across two (possibly different) column sets, one value per
/// key position. Matches `join.c`'s `__eq`: I64/SYMBOL/TIMESTAMP compared as
/// i64, F64 by value, GUID by raw bytes.
fn cross_eq(left_cols: &[&ObjData], right_cols: &[&ObjData], l: usize, r: usize) -> bool {
    left_cols.iter().zip(right_cols.iter()).all(|(lc, rc)| match (lc, rc) {
        (ObjData::I64(a), ObjData::I64(b))
        | (ObjData::Timestamp(a), ObjData::Timestamp(b))
        | (ObjData::I64(a), ObjData::Timestamp(b))
        | (ObjData::Timestamp(a), ObjData::I64(b)) => a[l] == b[r],
        (ObjData::Symbol(a), ObjData::Symbol(b)) => a[l] == b[r],
        (ObjData::I32(a), ObjData::I32(b)) | (ObjData::Date(a), ObjData::Date(b)) | (ObjData::Time(a), ObjData::Time(b)) => {
            a[l] == b[r]
        }
        (ObjData::F64(a), ObjData::F64(b)) => a[l] == b[r],
        (ObjData::U8(a), ObjData::U8(b)) | (ObjData::B8(a), ObjData::B8(b)) | (ObjData::C8(a), ObjData::C8(b)) => {
            a[l] == b[r]
        }
        (ObjData::Guid(a), ObjData::Guid(b)) => a[l] == b[r],
        _ => false,
    })
}

/// Build an index over `right_cols` (length `right_len`), first-insertion
/// wins on hash collision among equal keys.
fn build_idx(right_cols: &[&ObjData], right_len: usize) -> (OpenAddressTable<usize>, Vec<u64>) {
    let capacity = (right_len.max(1) * 2).next_power_of_two();
    let mut table: OpenAddressTable<usize> = OpenAddressTable::with_capacity(capacity);
    let mut hashes = Vec::with_capacity(right_len);
    for r in 0..right_len {
        let h = row_hash(right_cols, r);
        hashes.push(h);
        table.insert_if_absent(h, r, |existing| cross_eq(right_cols, right_cols, existing, r));
    }
    (table, hashes)
}

/// Probe `left_cols` against a built right-side index, returning one
/// matched right row index per left row, or `-1` for no match.
fn probe(
    left_cols: &[&ObjData],
    left_len: usize,
    right_cols: &[&ObjData],
    idx: &OpenAddressTable<usize>,
) -> Vec<i64> {
    let mut out = Vec::with_capacity(left_len);
    for l in 0..left_len {
        let h = row_hash(left_cols, l);
        match idx.find(h, |r| cross_eq(left_cols, right_cols, l, r)) {
            Some(r) => out.push(r as i64),
            None => out.push(-1),
        }
    }
    out
}

/// `k == 1` delegates to a direct single-column index build (equivalent to
/// a generic `find`, skipping the multi-column row-hash fold).
fn find_single_key(left: &ObjData, right: &ObjData, right_len: usize, left_len: usize) -> Vec<i64> {
    let right_cols = [right];
    let (idx, _hashes) = build_idx(&right_cols, right_len);
    let left_cols = [left];
    probe(&left_cols, left_len, &right_cols, &idx)
}

fn gather_or_null(col: &ObjData, matches: &[i64]) -> ObjData {
    match col {
        ObjData::I64(v) => ObjData::I64(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I64_NULL }).collect()),
        ObjData::Timestamp(v) => {
            ObjData::Timestamp(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I64_NULL }).collect())
        }
        ObjData::Symbol(v) => {
            ObjData::Symbol(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I64_NULL }).collect())
        }
        ObjData::I32(v) => ObjData::I32(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I32_NULL }).collect()),
        ObjData::Date(v) => ObjData::Date(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I32_NULL }).collect()),
        ObjData::Time(v) => ObjData::Time(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { I32_NULL }).collect()),
        ObjData::F64(v) => ObjData::F64(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { f64::NAN }).collect()),
        ObjData::U8(v) => ObjData::U8(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { U8_NULL }).collect()),
        ObjData::B8(v) => ObjData::B8(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { U8_NULL }).collect()),
        ObjData::C8(v) => ObjData::C8(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { U8_NULL }).collect()),
        ObjData::Guid(v) => {
            ObjData::Guid(matches.iter().map(|&m| if m >= 0 { v[m as usize] } else { [0u8; 16] }).collect())
        }
        _ => ObjData::I64(vec![I64_NULL; matches.len()]),
    }
}

/// Full left join: for every row of `left`, find a matching row of `right`
/// on `left_keys`/`right_keys` (must be equal length and type-compatible
/// pairwise) and gather `right`'s non-key columns, NULL-filling rows with
/// no match.
pub fn left_join(
    left: &ObjRef,
    right: &ObjRef,
    left_keys: &[String],
    right_keys: &[String],
) -> RayResult<ObjRef> {
    if left_keys.len() != right_keys.len() {
        return Err(RayError::Arity {
            need: left_keys.len(),
            have: right_keys.len(),
            arg: 1,
        });
    }
    if left_keys.is_empty() {
        return Err(RayError::Arity { need: 1, have: 0, arg: 1 });
    }
    let left_key_cols: Vec<&ObjData> = left_keys
        .iter()
        .map(|c| table_column(left, c).map(|o| o.data()))
        .collect::<RayResult<_>>()?;
    let right_key_cols: Vec<&ObjData> = right_keys
        .iter()
        .map(|c| table_column(right, c).map(|o| o.data()))
        .collect::<RayResult<_>>()?;

    let left_len = left.len();
    let right_len = right.len();

    let matches = if left_keys.len() == 1 {
        find_single_key(left_key_cols[0], right_key_cols[0], right_len, left_len)
    } else {
        let (idx, _hashes) = build_idx(&right_key_cols, right_len);
        probe(&left_key_cols, left_len, &right_key_cols, &idx)
    };

    let left_names: Vec<String> = match left.data() {
        ObjData::Table { columns } => columns.iter().map(|(n, _)| n.clone()).collect(),
        _ => {
            return Err(RayError::Type {
                expected: ElementKind::Table,
                actual: left.kind(),
                arg: 0,
                field: None,
            })
        }
    };
    let mut columns: Vec<(String, ObjRef)> = Vec::new();
    for name in &left_names {
        columns.push((name.clone(), table_column(left, name)?.clone_ref(true)));
    }
    let right_columns = match right.data() {
        ObjData::Table { columns } => columns,
        _ => {
            return Err(RayError::Type {
                expected: ElementKind::Table,
                actual: right.kind(),
                arg: 1,
                field: None,
            })
        }
    };
    for (name, col) in right_columns {
        if right_keys.contains(name) || left_names.contains(name) {
            continue;
        }
        let gathered = gather_or_null(col.data(), &matches);
        columns.push((name.clone(), ObjRef::new(gathered, AttrBits::NONE)));
    }
    table(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::vector_i64;

    #[test]
    fn single_key_join_matches_and_nulls() {
        let left = table(vec![("id".into(), vector_i64(vec![1, 2, 3]))]).unwrap();
        let right = table(vec![
            ("id".into(), vector_i64(vec![2, 3, 4])),
            ("val".into(), vector_i64(vec![20, 30, 40])),
        ])
        .unwrap();
        let joined = left_join(&left, &right, &["id".to_string()], &["id".to_string()]).unwrap();
        let val_col = table_column(&joined, "val").unwrap();
        let ObjData::I64(vals) = val_col.data() else { unreachable!() };
        assert_eq!(vals, &vec![I64_NULL, 20, 30]);
    }

    #[test]
    fn multi_key_join() {
        let left = table(vec![
            ("a".into(), vector_i64(vec![1, 1, 2])),
            ("b".into(), vector_i64(vec![10, 20, 30])),
        ])
        .unwrap();
        let right = table(vec![
            ("a".into(), vector_i64(vec![1, 2])),
            ("b".into(), vector_i64(vec![20, 30])),
            ("note".into(), vector_i64(vec![100, 200])),
        ])
        .unwrap();
        let joined = left_join(
            &left,
            &right,
            &["a".to_string(), "b".to_string()],
            &["a".to_string(), "b".to_string()],
        )
        .unwrap();
        let note_col = table_column(&joined, "note").unwrap();
        let ObjData::I64(notes) = note_col.data() else { unreachable!() };
        assert_eq!(notes, &vec![I64_NULL, 100, 200]);
    }
}
