//! Constructors for the compound object kinds: vector, list, dict, table.
//! These mirror the `vector`/`list`/`dict`/`table` operations from the
//! object model's operation list.

use crate::common::error::{RayError, RayResult};
use crate::types::object::{AttrBits, ObjData, ObjRef};

pub fn vector_i64(values: Vec<i64>) -> ObjRef {
    ObjRef::new(ObjData::I64(values), AttrBits::NONE)
}

pub fn vector_i32(values: Vec<i32>) -> ObjRef {
    ObjRef::new(ObjData::I32(values), AttrBits::NONE)
}

pub fn vector_f64(values: Vec<f64>) -> ObjRef {
    ObjRef::new(ObjData::F64(values), AttrBits::NONE)
}

pub fn vector_u8(values: Vec<u8>) -> ObjRef {
    ObjRef::new(ObjData::U8(values), AttrBits::NONE)
}

pub fn list(items: Vec<ObjRef>) -> ObjRef {
    ObjRef::new(ObjData::List(items), AttrBits::NONE)
}

/// Build a dict, requiring `keys` and `values` to have equal length.
pub fn dict(keys: ObjRef, values: ObjRef) -> RayResult<ObjRef> {
    if keys.len() != values.len() {
        return Err(RayError::Length {
            need: keys.len(),
            have: values.len(),
            arg1: 0,
            arg2: 1,
            field1: None,
            field2: None,
        });
    }
    Ok(ObjRef::new(ObjData::Dict { keys, values }, AttrBits::NONE))
}

/// Build a table from named columns, requiring every column to share the
/// same row count.
pub fn table(columns: Vec<(String, ObjRef)>) -> RayResult<ObjRef> {
    if let Some((first_name, first_col)) = columns.first() {
        let n = first_col.len();
        for (name, col) in &columns[1..] {
            if col.len() != n {
                return Err(RayError::Length {
                    need: n,
                    have: col.len(),
                    arg1: 0,
                    arg2: 0,
                    field1: Some(first_name.clone()),
                    field2: Some(name.clone()),
                });
            }
        }
    }
    Ok(ObjRef::new(ObjData::Table { columns }, AttrBits::NONE))
}

/// Look up a column by name, as used by `AT_IDX`-style field access.
pub fn table_column<'a>(table: &'a ObjRef, name: &str) -> RayResult<&'a ObjRef> {
    match table.data() {
        ObjData::Table { columns } => columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or(RayError::Domain { arg: 0, field: Some(name.to_string()) }),
        _ => Err(RayError::Type {
            expected: crate::types::element::ElementKind::Table,
            actual: table.kind(),
            arg: 0,
            field: None,
        }),
    }
}

pub fn table_row_count(table: &ObjRef) -> usize {
    table.len()
}

/// Gather `rows` out of a single column, producing a fresh column of the
/// same kind. Compound kinds (list/dict/table/...) are not selectable this
/// way and return an empty `I64` placeholder — callers dealing with nested
/// tables should recurse through `ObjData::Table`/`ObjData::List` directly.
pub fn select_rows(data: &ObjData, rows: &[u32]) -> ObjData {
    match data {
        ObjData::I64(v) => ObjData::I64(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::I32(v) => ObjData::I32(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::F64(v) => ObjData::F64(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::U8(v) => ObjData::U8(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::B8(v) => ObjData::B8(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::C8(v) => ObjData::C8(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::Symbol(v) => ObjData::Symbol(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::Timestamp(v) => ObjData::Timestamp(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::Date(v) => ObjData::Date(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::Time(v) => ObjData::Time(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::Guid(v) => ObjData::Guid(rows.iter().map(|&r| v[r as usize]).collect()),
        ObjData::List(v) => ObjData::List(rows.iter().map(|&r| v[r as usize].clone_ref(true)).collect()),
        _ => ObjData::I64(Vec::new()),
    }
}

/// Gather `rows` out of every column of `src`, producing a new table with
/// the same column names in the same order.
pub fn select_table_rows(src: &ObjRef, rows: &[u32]) -> RayResult<ObjRef> {
    match src.data() {
        ObjData::Table { columns } => {
            let new_columns = columns
                .iter()
                .map(|(name, col)| (name.clone(), ObjRef::new(select_rows(col.data(), rows), AttrBits::NONE)))
                .collect();
            table(new_columns)
        }
        _ => Err(RayError::Type {
            expected: crate::types::element::ElementKind::Table,
            actual: src.kind(),
            arg: 0,
            field: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rejects_mismatched_columns() {
        let a = vector_i64(vec![1, 2, 3]);
        let b = vector_i64(vec![1, 2]);
        let res = table(vec![("a".into(), a), ("b".into(), b)]);
        assert!(matches!(res, Err(RayError::Length { .. })));
    }

    #[test]
    fn table_column_lookup() {
        let a = vector_i64(vec![1, 2, 3]);
        let t = table(vec![("a".into(), a)]).unwrap();
        let col = table_column(&t, "a").unwrap();
        assert_eq!(col.len(), 3);
        assert!(table_column(&t, "missing").is_err());
    }
}
