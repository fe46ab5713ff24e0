//! `where`/`filter_map`/`filter_collect`, grounded on
//! `original_source/core/filter.c`. `filter_map` builds a lazy `MAP-FILTER`
//! marker over a base table; `filter_collect` forces it. A `Parted` base
//! (reached directly or through a `MAP-FILTER`) is handed to
//! [`crate::query::partition::collect_parted`], which applies the
//! PARTED-I64 sub-index rule per partition — whole-partition take when every
//! row passes, skip entirely when none do, otherwise gather the explicit
//! local row list — then razes the kept partitions into one table.

use crate::common::error::{RayError, RayResult};
use crate::query::partition::collect_parted;
use crate::types::element::ElementKind;
use crate::types::null::{f64_is_null, i64_is_null};
use crate::types::object::ObjData;
use crate::types::table::{select_table_rows, table_column};
use crate::types::{AttrBits, ObjRef};

/// Row indices where `predicate_col` is truthy (nonzero, non-null, non-NaN).
pub fn where_rows(source: &ObjRef, predicate_col: &str) -> RayResult<Vec<u32>> {
    let col = table_column(source, predicate_col)?;
    let rows = match col.data() {
        ObjData::I64(v) => v
            .iter()
            .enumerate()
            .filter(|(_, &x)| !i64_is_null(x) && x != 0)
            .map(|(i, _)| i as u32)
            .collect(),
        ObjData::I32(v) => v.iter().enumerate().filter(|(_, &x)| x != 0).map(|(i, _)| i as u32).collect(),
        ObjData::U8(v) | ObjData::B8(v) => v.iter().enumerate().filter(|(_, &x)| x != 0).map(|(i, _)| i as u32).collect(),
        ObjData::F64(v) => v
            .iter()
            .enumerate()
            .filter(|(_, &x)| !f64_is_null(x) && x != 0.0)
            .map(|(i, _)| i as u32)
            .collect(),
        other => {
            return Err(RayError::Type {
                expected: ElementKind::I64,
                actual: other.kind(),
                arg: 0,
                field: Some(predicate_col.to_string()),
            })
        }
    };
    Ok(rows)
}

/// Build a lazy `MAP-FILTER` over `base`, recursing into nested `TABLE`
/// columns the way `filter_map` in `original_source` does (a filter over a
/// table of tables maps each nested table too). Materializing is deferred
/// to [`filter_collect`].
pub fn filter_map(base: ObjRef, predicate_col: String) -> ObjRef {
    ObjRef::new(ObjData::MapFilter { base, predicate_col }, AttrBits::NONE)
}

/// Force a `MAP-FILTER` (or plain table) into a materialized table.
pub fn filter_collect(obj: &ObjRef) -> RayResult<ObjRef> {
    match obj.data() {
        ObjData::MapFilter { base, predicate_col } => {
            let collected_base = filter_collect(base)?;
            match collected_base.data() {
                ObjData::Parted { .. } => collect_parted(&collected_base, Some(predicate_col)),
                _ => {
                    let rows = where_rows(&collected_base, predicate_col)?;
                    select_table_rows(&collected_base, &rows)
                }
            }
        }
        ObjData::Table { .. } => Ok(obj.clone_ref(true)),
        ObjData::Parted { .. } => collect_parted(obj, None),
        _ => Err(RayError::Type {
            expected: ElementKind::Table,
            actual: obj.kind(),
            arg: 0,
            field: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::{table, vector_i64};

    #[test]
    fn where_rows_finds_truthy() {
        let pred = vector_i64(vec![0, 1, 0, 1, 1]);
        let t = table(vec![("p".into(), pred)]).unwrap();
        let rows = where_rows(&t, "p").unwrap();
        assert_eq!(rows, vec![1, 3, 4]);
    }

    #[test]
    fn filter_map_then_collect() {
        let a = vector_i64(vec![10, 20, 30]);
        let p = vector_i64(vec![1, 0, 1]);
        let t = table(vec![("a".into(), a), ("p".into(), p)]).unwrap();
        let lazy = filter_map(t, "p".to_string());
        let collected = filter_collect(&lazy).unwrap();
        let ObjData::I64(vals) = crate::types::table::table_column(&collected, "a").unwrap().data() else {
            unreachable!()
        };
        assert_eq!(vals, &vec![10, 30]);
    }

    #[test]
    fn filter_collect_on_parted_table_applies_per_partition() {
        let p1 = table(vec![
            ("k".into(), vector_i64(vec![1, 2])),
            ("p".into(), vector_i64(vec![0, 0])),
        ])
        .unwrap();
        let p2 = table(vec![
            ("k".into(), vector_i64(vec![3, 4])),
            ("p".into(), vector_i64(vec![1, 1])),
        ])
        .unwrap();
        let parted = ObjRef::new(
            ObjData::Parted { partition_keys: vec![0, 1], partitions: vec![p1, p2] },
            AttrBits::NONE,
        );
        let lazy = filter_map(parted, "p".to_string());
        let collected = filter_collect(&lazy).unwrap();
        let ObjData::I64(k) = crate::types::table::table_column(&collected, "k").unwrap().data() else {
            unreachable!()
        };
        assert_eq!(k, &vec![3, 4]);
    }
}
