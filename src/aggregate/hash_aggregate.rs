//! Serial hash-aggregate engine: local open-addressed group table plus
//! per-group accumulator state. `find_or_create` probes/resizes the table.
//! `aggregate` dispatches to two faster paths before falling back to this
//! generic one: [`crate::aggregate::parallel::parallel_aggregate_i64`] for a
//! single I64 key with a worker pool and enough rows to be worth splitting,
//! then [`crate::aggregate::perfect_hash::try_perfect_hash`] for a single
//! I64/SYMBOL key whose range is small. All three paths skip NULL sentinels
//! the same way: a NULL-valued row never updates `sum`/`count`/`min`/`max`/
//! `first`/`last`, and a group that never saw a non-NULL value reports
//! sum 0, count 0, avg 0.0, and the NULL sentinel for min/max/first/last.

use crate::aggregate::parallel::parallel_aggregate_i64;
use crate::aggregate::perfect_hash::try_perfect_hash;
use crate::common::error::{RayError, RayResult};
use crate::hash::OpenAddressTable;
use crate::heap::Heap;
use crate::pool::WorkerPool;
use crate::types::element::ElementKind;
use crate::types::null::{f64_is_null, i32_is_null, i64_is_null, u8_is_null, I64_NULL};
use crate::types::object::ObjData;
use crate::types::table::{select_rows, table, table_column};
use crate::types::ObjRef;

use super::fingerprint::{row_fingerprint, rows_equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    First,
    Last,
}

#[derive(Debug, Clone)]
pub struct AggSpec {
    pub func: AggFunc,
    pub input_col: String,
    pub output_name: String,
}

/// Per-group running state for one (spec, group) pair. `seen` distinguishes
/// "no non-NULL value has folded into this group yet" from a genuine zero,
/// so `min`/`max`/`first`/`last` can report the NULL sentinel instead of
/// their internal starting bound.
#[derive(Clone, Copy)]
enum Acc {
    I64 { sum: i64, count: i64, min: i64, max: i64, first: i64, last: i64, seen: bool },
    F64 { sum: f64, count: i64, min: f64, max: f64, first: f64, last: f64, seen: bool },
}

impl Acc {
    fn empty_i64() -> Self {
        Acc::I64 { sum: 0, count: 0, min: i64::MAX, max: i64::MIN, first: I64_NULL, last: I64_NULL, seen: false }
    }

    fn empty_f64() -> Self {
        Acc::F64 { sum: 0.0, count: 0, min: f64::MAX, max: f64::MIN, first: f64::NAN, last: f64::NAN, seen: false }
    }

    fn update_i64(&mut self, v: i64) {
        if let Acc::I64 { sum, count, min, max, first, last, seen } = self {
            *sum = sum.wrapping_add(v);
            *count += 1;
            *min = (*min).min(v);
            *max = (*max).max(v);
            if !*seen {
                *first = v;
            }
            *last = v;
            *seen = true;
        }
    }

    fn update_f64(&mut self, v: f64) {
        if let Acc::F64 { sum, count, min, max, first, last, seen } = self {
            *sum += v;
            *count += 1;
            *min = min.min(v);
            *max = max.max(v);
            if !*seen {
                *first = v;
            }
            *last = v;
            *seen = true;
        }
    }

    fn finalize(&self, func: AggFunc) -> ObjValue {
        match (self, func) {
            (Acc::I64 { sum, .. }, AggFunc::Sum) => ObjValue::I64(*sum),
            (Acc::I64 { count, .. }, AggFunc::Count) => ObjValue::I64(*count),
            (Acc::I64 { min, seen, .. }, AggFunc::Min) => ObjValue::I64(if *seen { *min } else { I64_NULL }),
            (Acc::I64 { max, seen, .. }, AggFunc::Max) => ObjValue::I64(if *seen { *max } else { I64_NULL }),
            (Acc::I64 { first, .. }, AggFunc::First) => ObjValue::I64(*first),
            (Acc::I64 { last, .. }, AggFunc::Last) => ObjValue::I64(*last),
            (Acc::I64 { sum, count, .. }, AggFunc::Avg) => {
                ObjValue::F64(if *count == 0 { 0.0 } else { *sum as f64 / *count as f64 })
            }
            (Acc::F64 { sum, .. }, AggFunc::Sum) => ObjValue::F64(*sum),
            (Acc::F64 { count, .. }, AggFunc::Count) => ObjValue::I64(*count),
            (Acc::F64 { min, seen, .. }, AggFunc::Min) => ObjValue::F64(if *seen { *min } else { f64::NAN }),
            (Acc::F64 { max, seen, .. }, AggFunc::Max) => ObjValue::F64(if *seen { *max } else { f64::NAN }),
            (Acc::F64 { first, .. }, AggFunc::First) => ObjValue::F64(*first),
            (Acc::F64 { last, .. }, AggFunc::Last) => ObjValue::F64(*last),
            (Acc::F64 { sum, count, .. }, AggFunc::Avg) => {
                ObjValue::F64(if *count == 0 { 0.0 } else { *sum / *count as f64 })
            }
        }
    }
}

enum ObjValue {
    I64(i64),
    F64(f64),
}

/// Group the rows of `table` by `by_cols` and compute `specs` over them.
/// Returns a fresh table: the by-columns first (one representative row per
/// group), then one output column per spec, in declaration order.
///
/// `pool`, when given, lets a single-I64-key/single-spec aggregate dispatch
/// to the fused parallel path; that path itself falls back to a single local
/// pass below `PARALLEL_ROW_THRESHOLD` rows or with one worker, so passing a
/// pool is always safe, just not always faster. A single I64/SYMBOL key
/// whose range fits `PERFECT_HASH_MAX_RANGE` gets the perfect-hash grouping
/// fast path regardless of `pool`. Anything else falls back to the generic
/// open-addressed path below.
pub fn aggregate(
    source: &ObjRef,
    by_cols: &[String],
    specs: &[AggSpec],
    pool: Option<(&WorkerPool, &mut Heap)>,
) -> RayResult<ObjRef> {
    let key_objs: Vec<&ObjRef> = by_cols.iter().map(|c| table_column(source, c)).collect::<RayResult<_>>()?;
    let key_data: Vec<&ObjData> = key_objs.iter().map(|o| o.data()).collect();
    let n = source.len();

    for spec in specs {
        let col = table_column(source, &spec.input_col)?;
        match (col.kind(), spec.func) {
            (ElementKind::I64 | ElementKind::F64, _) => {}
            (_, AggFunc::Count) => {}
            (k, AggFunc::Min | AggFunc::Max | AggFunc::Sum | AggFunc::Avg | AggFunc::First | AggFunc::Last) => {
                return Err(RayError::Type {
                    expected: ElementKind::F64,
                    actual: k,
                    arg: 0,
                    field: Some(spec.input_col.clone()),
                })
            }
        }
    }

    let value_cols: Vec<&ObjData> = specs
        .iter()
        .map(|s| table_column(source, &s.input_col).map(|c| c.data()))
        .collect::<RayResult<_>>()?;

    if let (1, 1, Some((wp, heap))) = (by_cols.len(), specs.len(), pool) {
        if let (ObjData::I64(keys), ObjData::I64(values)) = (key_data[0], value_cols[0]) {
            if matches!(specs[0].func, AggFunc::Sum | AggFunc::Count | AggFunc::Min | AggFunc::Max | AggFunc::Avg) {
                let (out_keys, out_sum, out_count, out_min, out_max) = parallel_aggregate_i64(wp, heap, keys, values);
                return build_fused_result(&by_cols[0], out_keys, &specs[0], out_sum, out_count, out_min, out_max);
            }
        }
    }

    let (group_of_row, num_groups) = if by_cols.len() == 1 {
        match key_data[0] {
            ObjData::I64(keys) | ObjData::Symbol(keys) => match try_perfect_hash(keys) {
                Some((_min, groups, num_groups)) => (groups, num_groups),
                None => generic_group_ids(&key_data, n),
            },
            _ => generic_group_ids(&key_data, n),
        }
    } else {
        generic_group_ids(&key_data, n)
    };

    let rep_rows = first_occurrence_rows(&group_of_row, num_groups);
    let accs = accumulate_groups(&group_of_row, num_groups, &value_cols);

    let mut columns: Vec<(String, ObjRef)> = Vec::new();
    for (i, name) in by_cols.iter().enumerate() {
        columns.push((name.clone(), ObjRef::new(select_rows(key_data[i], &rep_rows), crate::types::AttrBits::NONE)));
    }
    for (spec_idx, spec) in specs.iter().enumerate() {
        let values: Vec<ObjValue> = accs.iter().map(|g| g[spec_idx].finalize(spec.func)).collect();
        let col = build_output_column(spec.func, values);
        columns.push((spec.output_name.clone(), ObjRef::new(col, crate::types::AttrBits::NONE)));
    }
    table(columns)
}

/// Assemble the output table for the fused parallel path directly from its
/// (keys, sum, count, min, max) vectors, without going through `Acc` — the
/// fused routine already folded NULLs out of these per [`parallel_aggregate_i64`].
fn build_fused_result(
    key_name: &str,
    keys: Vec<i64>,
    spec: &AggSpec,
    sums: Vec<i64>,
    counts: Vec<i64>,
    mins: Vec<i64>,
    maxs: Vec<i64>,
) -> RayResult<ObjRef> {
    let value_col = match spec.func {
        AggFunc::Sum => ObjData::I64(sums),
        AggFunc::Count => ObjData::I64(counts),
        AggFunc::Min => ObjData::I64(mins),
        AggFunc::Max => ObjData::I64(maxs),
        AggFunc::Avg => ObjData::F64(
            sums.iter()
                .zip(counts.iter())
                .map(|(&s, &c)| if c == 0 { 0.0 } else { s as f64 / c as f64 })
                .collect(),
        ),
        AggFunc::First | AggFunc::Last => unreachable!("aggregate() only dispatches Sum/Count/Min/Max/Avg to the fused parallel path"),
    };
    table(vec![
        (key_name.to_string(), ObjRef::new(ObjData::I64(keys), crate::types::AttrBits::NONE)),
        (spec.output_name.clone(), ObjRef::new(value_col, crate::types::AttrBits::NONE)),
    ])
}

/// Generic multi-column grouping: probe/insert each row's fingerprint into
/// an open-addressed table, returning the row→group-id map and group count.
fn generic_group_ids(key_data: &[&ObjData], n: usize) -> (Vec<u32>, usize) {
    let mut table_idx: OpenAddressTable<usize> = OpenAddressTable::with_capacity((n / 2).max(8));
    let mut group_reps: Vec<usize> = Vec::new();
    let mut group_of_row = vec![0u32; n];
    for row in 0..n {
        let hash = row_fingerprint(key_data, row);
        let (group_id, created) =
            table_idx.find_or_create(hash, |gid| rows_equal(key_data, group_reps[gid], row), || group_reps.len());
        if created {
            group_reps.push(row);
        }
        group_of_row[row] = group_id as u32;
    }
    (group_of_row, group_reps.len())
}

/// The first row index that mapped to each group id, used to pick the
/// by-column values for the output table's representative row per group.
fn first_occurrence_rows(group_of_row: &[u32], num_groups: usize) -> Vec<u32> {
    let mut rep = vec![u32::MAX; num_groups];
    for (row, &gid) in group_of_row.iter().enumerate() {
        if rep[gid as usize] == u32::MAX {
            rep[gid as usize] = row as u32;
        }
    }
    rep
}

fn accumulate_groups(group_of_row: &[u32], num_groups: usize, value_cols: &[&ObjData]) -> Vec<Vec<Acc>> {
    let mut accs: Vec<Vec<Acc>> =
        (0..num_groups).map(|_| value_cols.iter().map(|d| empty_acc_for(d)).collect()).collect();
    for (row, &gid) in group_of_row.iter().enumerate() {
        for (spec_idx, data) in value_cols.iter().enumerate() {
            update_acc(&mut accs[gid as usize][spec_idx], data, row);
        }
    }
    accs
}

fn build_output_column(func: AggFunc, values: Vec<ObjValue>) -> ObjData {
    match func {
        AggFunc::Count => ObjData::I64(
            values
                .into_iter()
                .map(|v| match v {
                    ObjValue::I64(x) => x,
                    ObjValue::F64(x) => x as i64,
                })
                .collect(),
        ),
        AggFunc::Avg => ObjData::F64(
            values
                .into_iter()
                .map(|v| match v {
                    ObjValue::F64(x) => x,
                    ObjValue::I64(x) => x as f64,
                })
                .collect(),
        ),
        _ => match values.first() {
            Some(ObjValue::I64(_)) => ObjData::I64(
                values
                    .into_iter()
                    .map(|v| match v {
                        ObjValue::I64(x) => x,
                        ObjValue::F64(x) => x as i64,
                    })
                    .collect(),
            ),
            _ => ObjData::F64(
                values
                    .into_iter()
                    .map(|v| match v {
                        ObjValue::F64(x) => x,
                        ObjValue::I64(x) => x as f64,
                    })
                    .collect(),
            ),
        },
    }
}

fn is_row_null(data: &ObjData, row: usize) -> bool {
    match data {
        ObjData::I64(v) | ObjData::Timestamp(v) => i64_is_null(v[row]),
        ObjData::I32(v) | ObjData::Date(v) | ObjData::Time(v) => i32_is_null(v[row]),
        ObjData::F64(v) => f64_is_null(v[row]),
        ObjData::U8(v) | ObjData::B8(v) | ObjData::C8(v) => u8_is_null(v[row]),
        ObjData::Symbol(v) => i64_is_null(v[row]),
        _ => false,
    }
}

fn empty_acc_for(data: &ObjData) -> Acc {
    match data {
        ObjData::F64(_) => Acc::empty_f64(),
        _ => Acc::empty_i64(),
    }
}

fn update_acc(acc: &mut Acc, data: &ObjData, row: usize) {
    if is_row_null(data, row) {
        return;
    }
    match data {
        ObjData::I64(v) | ObjData::Timestamp(v) => acc.update_i64(v[row]),
        ObjData::I32(v) | ObjData::Date(v) | ObjData::Time(v) => acc.update_i64(v[row] as i64),
        ObjData::F64(v) => acc.update_f64(v[row]),
        _ => acc.update_i64(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::vector_i64;

    #[test]
    fn groups_and_sums() {
        let key = vector_i64(vec![1, 1, 2, 2, 2]);
        let value = vector_i64(vec![10, 20, 1, 1, 1]);
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![AggSpec { func: AggFunc::Sum, input_col: "v".into(), output_name: "total".into() }];
        let result = aggregate(&src, &["k".to_string()], &specs, None).unwrap();
        let k_col = table_column(&result, "k").unwrap();
        let v_col = table_column(&result, "total").unwrap();
        let ObjData::I64(keys) = k_col.data() else { unreachable!() };
        let ObjData::I64(totals) = v_col.data() else { unreachable!() };
        assert_eq!(keys.len(), 2);
        for (k, t) in keys.iter().zip(totals.iter()) {
            if *k == 1 {
                assert_eq!(*t, 30);
            } else {
                assert_eq!(*t, 3);
            }
        }
    }

    #[test]
    fn count_and_avg() {
        let key = vector_i64(vec![1, 1, 1]);
        let value = vector_i64(vec![2, 4, 6]);
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![
            AggSpec { func: AggFunc::Count, input_col: "v".into(), output_name: "n".into() },
            AggSpec { func: AggFunc::Avg, input_col: "v".into(), output_name: "avg".into() },
        ];
        let result = aggregate(&src, &["k".to_string()], &specs, None).unwrap();
        let n_col = table_column(&result, "n").unwrap();
        let avg_col = table_column(&result, "avg").unwrap();
        let ObjData::I64(n) = n_col.data() else { unreachable!() };
        let ObjData::F64(avg) = avg_col.data() else { unreachable!() };
        assert_eq!(n[0], 3);
        assert!((avg[0] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sum_skips_null_sentinels() {
        let key = vector_i64(vec![1, 1, 1]);
        let value = vector_i64(vec![10, I64_NULL, 20]);
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![
            AggSpec { func: AggFunc::Sum, input_col: "v".into(), output_name: "total".into() },
            AggSpec { func: AggFunc::Min, input_col: "v".into(), output_name: "lo".into() },
            AggSpec { func: AggFunc::Avg, input_col: "v".into(), output_name: "avg".into() },
        ];
        let result = aggregate(&src, &["k".to_string()], &specs, None).unwrap();
        let ObjData::I64(total) = table_column(&result, "total").unwrap().data() else { unreachable!() };
        let ObjData::I64(lo) = table_column(&result, "lo").unwrap().data() else { unreachable!() };
        let ObjData::F64(avg) = table_column(&result, "avg").unwrap().data() else { unreachable!() };
        assert_eq!(total[0], 30);
        assert_eq!(lo[0], 10);
        assert!((avg[0] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn all_null_group_reports_zero_and_sentinel() {
        let key = vector_i64(vec![1, 1]);
        let value = vector_i64(vec![I64_NULL, I64_NULL]);
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![
            AggSpec { func: AggFunc::Sum, input_col: "v".into(), output_name: "total".into() },
            AggSpec { func: AggFunc::Avg, input_col: "v".into(), output_name: "avg".into() },
            AggSpec { func: AggFunc::Min, input_col: "v".into(), output_name: "lo".into() },
            AggSpec { func: AggFunc::Count, input_col: "v".into(), output_name: "n".into() },
        ];
        let result = aggregate(&src, &["k".to_string()], &specs, None).unwrap();
        let ObjData::I64(total) = table_column(&result, "total").unwrap().data() else { unreachable!() };
        let ObjData::F64(avg) = table_column(&result, "avg").unwrap().data() else { unreachable!() };
        let ObjData::I64(lo) = table_column(&result, "lo").unwrap().data() else { unreachable!() };
        let ObjData::I64(n) = table_column(&result, "n").unwrap().data() else { unreachable!() };
        assert_eq!(total[0], 0);
        assert_eq!(avg[0], 0.0);
        assert_eq!(lo[0], I64_NULL);
        assert_eq!(n[0], 0);
    }

    #[test]
    fn range_at_boundary_uses_perfect_hash_path() {
        use crate::aggregate::perfect_hash::try_perfect_hash;
        let at_limit: Vec<i64> = (0..=65536).collect();
        assert!(try_perfect_hash(&at_limit).is_some());
        let over_limit: Vec<i64> = (0..=65537).collect();
        assert!(try_perfect_hash(&over_limit).is_none());
    }

    #[test]
    fn perfect_hash_path_matches_generic_result() {
        let key = vector_i64(vec![5, 3, 5, 3, 7]);
        let value = vector_i64(vec![1, 2, 3, 4, 5]);
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![AggSpec { func: AggFunc::Sum, input_col: "v".into(), output_name: "total".into() }];
        let result = aggregate(&src, &["k".to_string()], &specs, None).unwrap();
        let ObjData::I64(keys) = table_column(&result, "k").unwrap().data() else { unreachable!() };
        let ObjData::I64(totals) = table_column(&result, "total").unwrap().data() else { unreachable!() };
        for (k, t) in keys.iter().zip(totals.iter()) {
            match k {
                5 => assert_eq!(*t, 4),
                3 => assert_eq!(*t, 6),
                7 => assert_eq!(*t, 5),
                other => panic!("unexpected key {other}"),
            }
        }
    }

    #[test]
    fn fused_parallel_path_matches_generic_result() {
        let pool = WorkerPool::new(4);
        let mut heap = Heap::new(crate::heap::HeapConfig::default()).unwrap();
        let n = 200_000;
        let key = vector_i64((0..n).map(|i| i % 50).collect());
        let value = vector_i64((0..n).map(|_| 1).collect());
        let src = table(vec![("k".into(), key), ("v".into(), value)]).unwrap();
        let specs = vec![AggSpec { func: AggFunc::Sum, input_col: "v".into(), output_name: "total".into() }];
        let result = aggregate(&src, &["k".to_string()], &specs, Some((&pool, &mut heap))).unwrap();
        let ObjData::I64(keys) = table_column(&result, "k").unwrap().data() else { unreachable!() };
        let ObjData::I64(totals) = table_column(&result, "total").unwrap().data() else { unreachable!() };
        assert_eq!(keys.len(), 50);
        assert_eq!(totals.iter().sum::<i64>(), n);
        pool.shutdown();
    }
}
