//! Partitioned execution: the `MAP-COMMON` virtual column (partition key
//! values repeated per their row counts), `where` short-circuiting over
//! whole partitions, and the collect/raze fusion that turns a `Parted`
//! object plus an optional predicate into one materialized table. Grounded
//! on `original_source/core/filter.c`'s `PARTED`/`MAP-COMMON` expansion
//! loop.

use crate::common::error::{RayError, RayResult};
use crate::query::filter::where_rows;
use crate::types::element::ElementKind;
use crate::types::object::ObjData;
use crate::types::table::{select_table_rows, table_column};
use crate::types::{AttrBits, ObjRef};

/// Expand a `MAP-COMMON` column: repeat `values[i]` `counts[i]` times.
pub fn expand_map_common(values: &ObjData, counts: &[u32]) -> ObjData {
    match values {
        ObjData::I64(v) => ObjData::I64(repeat(v, counts)),
        ObjData::I32(v) => ObjData::I32(repeat(v, counts)),
        ObjData::F64(v) => ObjData::F64(repeat(v, counts)),
        ObjData::Symbol(v) => ObjData::Symbol(repeat(v, counts)),
        ObjData::Timestamp(v) => ObjData::Timestamp(repeat(v, counts)),
        _ => ObjData::I64(Vec::new()),
    }
}

fn repeat<T: Copy>(values: &[T], counts: &[u32]) -> Vec<T> {
    let mut out = Vec::with_capacity(counts.iter().map(|&c| c as usize).sum());
    for (v, &c) in values.iter().zip(counts.iter()) {
        out.extend(std::iter::repeat(*v).take(c as usize));
    }
    out
}

/// Materialize a `Parted` object into one concatenated table, optionally
/// applying `where_pred` per partition so a proven-empty partition (no rows
/// pass the predicate) can be skipped entirely without gathering it.
pub fn collect_parted(obj: &ObjRef, where_pred: Option<&str>) -> RayResult<ObjRef> {
    let (partitions,) = match obj.data() {
        ObjData::Parted { partitions, .. } => (partitions,),
        _ => {
            return Err(RayError::Type {
                expected: ElementKind::Parted,
                actual: obj.kind(),
                arg: 0,
                field: None,
            })
        }
    };

    let mut filtered_partitions: Vec<ObjRef> = Vec::new();
    for part in partitions {
        match where_pred {
            Some(pred) => {
                let rows = where_rows(part, pred)?;
                if rows.is_empty() {
                    continue;
                }
                if rows.len() == part.len() {
                    filtered_partitions.push(part.clone_ref(true));
                } else {
                    filtered_partitions.push(select_table_rows(part, &rows)?);
                }
            }
            None => filtered_partitions.push(part.clone_ref(true)),
        }
    }

    raze(&filtered_partitions)
}

/// Concatenate a list of same-schema tables row-wise.
pub fn raze(tables: &[ObjRef]) -> RayResult<ObjRef> {
    if tables.is_empty() {
        return crate::types::table::table(Vec::new());
    }
    let first_names: Vec<String> = match tables[0].data() {
        ObjData::Table { columns } => columns.iter().map(|(n, _)| n.clone()).collect(),
        _ => {
            return Err(RayError::Type {
                expected: ElementKind::Table,
                actual: tables[0].kind(),
                arg: 0,
                field: None,
            })
        }
    };
    let mut columns: Vec<(String, ObjRef)> = Vec::new();
    for name in &first_names {
        let mut merged: Option<ObjData> = None;
        for t in tables {
            let col = table_column(t, name)?;
            merged = Some(match merged {
                None => clone_data_shallow(col.data()),
                Some(acc) => concat_data(acc, col.data()),
            });
        }
        columns.push((name.clone(), ObjRef::new(merged.unwrap(), AttrBits::NONE)));
    }
    crate::types::table::table(columns)
}

fn clone_data_shallow(data: &ObjData) -> ObjData {
    concat_data(empty_like(data), data)
}

fn empty_like(data: &ObjData) -> ObjData {
    match data {
        ObjData::I64(_) => ObjData::I64(Vec::new()),
        ObjData::I32(_) => ObjData::I32(Vec::new()),
        ObjData::F64(_) => ObjData::F64(Vec::new()),
        ObjData::U8(_) => ObjData::U8(Vec::new()),
        ObjData::B8(_) => ObjData::B8(Vec::new()),
        ObjData::C8(_) => ObjData::C8(Vec::new()),
        ObjData::Symbol(_) => ObjData::Symbol(Vec::new()),
        ObjData::Timestamp(_) => ObjData::Timestamp(Vec::new()),
        ObjData::Date(_) => ObjData::Date(Vec::new()),
        ObjData::Time(_) => ObjData::Time(Vec::new()),
        ObjData::Guid(_) => ObjData::Guid(Vec::new()),
        _ => ObjData::I64(Vec::new()),
    }
}

fn concat_data(a: ObjData, b: &ObjData) -> ObjData {
    match (a, b) {
        (ObjData::I64(mut va), ObjData::I64(vb)) => {
            va.extend_from_slice(vb);
            ObjData::I64(va)
        }
        (ObjData::I32(mut va), ObjData::I32(vb)) => {
            va.extend_from_slice(vb);
            ObjData::I32(va)
        }
        (ObjData::F64(mut va), ObjData::F64(vb)) => {
            va.extend_from_slice(vb);
            ObjData::F64(va)
        }
        (ObjData::U8(mut va), ObjData::U8(vb)) => {
            va.extend_from_slice(vb);
            ObjData::U8(va)
        }
        (ObjData::B8(mut va), ObjData::B8(vb)) => {
            va.extend_from_slice(vb);
            ObjData::B8(va)
        }
        (ObjData::C8(mut va), ObjData::C8(vb)) => {
            va.extend_from_slice(vb);
            ObjData::C8(va)
        }
        (ObjData::Symbol(mut va), ObjData::Symbol(vb)) => {
            va.extend_from_slice(vb);
            ObjData::Symbol(va)
        }
        (ObjData::Timestamp(mut va), ObjData::Timestamp(vb)) => {
            va.extend_from_slice(vb);
            ObjData::Timestamp(va)
        }
        (ObjData::Date(mut va), ObjData::Date(vb)) => {
            va.extend_from_slice(vb);
            ObjData::Date(va)
        }
        (ObjData::Time(mut va), ObjData::Time(vb)) => {
            va.extend_from_slice(vb);
            ObjData::Time(va)
        }
        (ObjData::Guid(mut va), ObjData::Guid(vb)) => {
            va.extend_from_slice(vb);
            ObjData::Guid(va)
        }
        (a, _) => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::vector_i64;

    #[test]
    fn map_common_expands_by_counts() {
        let values = ObjData::I64(vec![10, 20, 30]);
        let counts = [2u32, 0, 3];
        let expanded = expand_map_common(&values, &counts);
        let ObjData::I64(v) = expanded else { unreachable!() };
        assert_eq!(v, vec![10, 10, 30, 30, 30]);
    }

    #[test]
    fn raze_concatenates_same_schema_tables() {
        let t1 = crate::types::table::table(vec![("a".into(), vector_i64(vec![1, 2]))]).unwrap();
        let t2 = crate::types::table::table(vec![("a".into(), vector_i64(vec![3, 4]))]).unwrap();
        let razed = raze(&[t1, t2]).unwrap();
        let ObjData::I64(v) = table_column(&razed, "a").unwrap().data() else { unreachable!() };
        assert_eq!(v, &vec![1, 2, 3, 4]);
    }

    #[test]
    fn collect_parted_skips_empty_partitions() {
        let p1 = crate::types::table::table(vec![
            ("k".into(), vector_i64(vec![1, 2])),
            ("p".into(), vector_i64(vec![0, 0])),
        ])
        .unwrap();
        let p2 = crate::types::table::table(vec![
            ("k".into(), vector_i64(vec![3, 4])),
            ("p".into(), vector_i64(vec![1, 1])),
        ])
        .unwrap();
        let parted = ObjRef::new(
            ObjData::Parted { partition_keys: vec![0, 1], partitions: vec![p1, p2] },
            AttrBits::NONE,
        );
        let collected = collect_parted(&parted, Some("p")).unwrap();
        let ObjData::I64(k) = table_column(&collected, "k").unwrap().data() else { unreachable!() };
        assert_eq!(k, &vec![3, 4]);
    }
}
