//! Top-level sort dispatcher: attribute fast path, then pick counting /
//! radix / merge (serial or parallel) by element kind, range, and length,
//! exactly the table from `original_source/core/sort.c`'s entry point.

use crate::common::constants::{
    COUNTING_SORT_MAX_RANGE, PARALLEL_SORT_THRESHOLD,
};
use crate::common::error::{RayError, RayResult};
use crate::heap::Heap;
use crate::pool::WorkerPool;
use crate::sort::counting::counting_sort_i64;
use crate::sort::merge::merge_sort_indices;
use crate::sort::radix::{radix_sort_f64, radix_sort_i64};
use crate::types::object::{AttrBits, ObjData};
use crate::types::symbol::SymbolTable;
use crate::types::ElementKind;
use crate::types::ObjRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

fn i64_range(values: &[i64]) -> Option<(i64, i64)> {
    let mut it = values.iter().filter(|&&v| v != i64::MIN);
    let first = *it.next()?;
    let (mut lo, mut hi) = (first, first);
    for &v in it {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    Some((lo, hi))
}

/// Compute the sort permutation for `column`, consulting its attribute bits
/// first: a column already tagged `ASC`/`DESC` matching the requested
/// direction returns the identity permutation without touching the data.
pub fn sort_indices(
    column: &ObjRef,
    direction: Direction,
    symbols: &SymbolTable,
    pool: Option<(&WorkerPool, &mut Heap)>,
) -> RayResult<Vec<u32>> {
    let attrs = column.attrs();
    let wants_asc = direction == Direction::Ascending;
    if (wants_asc && attrs.has(AttrBits::ASC)) || (!wants_asc && attrs.has(AttrBits::DESC)) {
        return Ok((0..column.len() as u32).collect());
    }
    let ascending = wants_asc;
    match column.data() {
        ObjData::I64(v) | ObjData::Timestamp(v) => Ok(dispatch_i64(v, ascending, pool)),
        ObjData::I32(v) | ObjData::Date(v) | ObjData::Time(v) => {
            let widened: Vec<i64> = v.iter().map(|&x| x as i64).collect();
            Ok(dispatch_i64(&widened, ascending, pool))
        }
        ObjData::F64(v) => Ok(dispatch_f64(v, ascending)),
        ObjData::U8(v) | ObjData::B8(v) | ObjData::C8(v) => {
            let widened: Vec<i64> = v.iter().map(|&x| x as i64).collect();
            Ok(counting_sort_i64(&widened, ascending))
        }
        ObjData::Symbol(ids) => Ok(merge_sort_indices(ids.len(), ascending, |a, b| {
            let sa = symbols.get(ids[a as usize]);
            let sb = symbols.get(ids[b as usize]);
            sa.cmp(&sb)
        })),
        ObjData::Guid(g) => Ok(merge_sort_indices(g.len(), ascending, |a, b| {
            g[a as usize].cmp(&g[b as usize])
        })),
        other => Err(RayError::Nyi { op: other.kind() }),
    }
}

fn dispatch_i64(values: &[i64], ascending: bool, pool: Option<(&WorkerPool, &mut Heap)>) -> Vec<u32> {
    if let Some((pool, heap)) = pool {
        if values.len() >= PARALLEL_SORT_THRESHOLD && pool.worker_count() > 1 {
            return crate::sort::parallel::parallel_sort_i64(pool, heap, values, ascending);
        }
    }
    match i64_range(values) {
        Some((lo, hi)) if (hi - lo) as usize <= COUNTING_SORT_MAX_RANGE => {
            counting_sort_i64(values, ascending)
        }
        _ => radix_sort_i64(values, ascending),
    }
}

fn dispatch_f64(values: &[f64], ascending: bool) -> Vec<u32> {
    radix_sort_f64(values, ascending)
}

pub fn element_size_hint(kind: ElementKind) -> usize {
    kind.element_size().unwrap_or(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::vector_i64;

    #[test]
    fn attribute_fast_path_skips_sort() {
        let col = ObjRef::new(ObjData::I64(vec![5, 1, 3]), AttrBits::ASC);
        let symbols = SymbolTable::new();
        let idx = sort_indices(&col, Direction::Ascending, &symbols, None).unwrap();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn i64_column_sorts() {
        let col = vector_i64(vec![5, 1, 3, 2, 4]);
        let symbols = SymbolTable::new();
        let idx = sort_indices(&col, Direction::Ascending, &symbols, None).unwrap();
        let ObjData::I64(values) = col.data() else { unreachable!() };
        let sorted: Vec<i64> = idx.iter().map(|&i| values[i as usize]).collect();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }
}
