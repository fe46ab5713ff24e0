//! The `select` pipeline: fetch, filter, group, take, project, with
//! context-frame teardown on error short-circuit. Reserved keys are
//! `{from, take, where, by}`; everything else in a query dict names a
//! projected column or aggregate output. Grounded on
//! `original_source/core/query.c` and the teacher's `execution/context.rs`/
//! `execution/pipeline.rs` context-frame-chain idiom.

use crate::aggregate::{aggregate, AggSpec};
use crate::common::error::RayResult;
use crate::heap::Heap;
use crate::pool::WorkerPool;
use crate::query::context::QueryContext;
use crate::query::filter::where_rows;
use crate::types::table::{select_table_rows, table, table_column};
use crate::types::ObjRef;

/// One query dict's worth of reserved keys, already resolved to concrete
/// values (the Lisp evaluator that would parse a raw dict is out of scope;
/// see [`crate::query::eval`]).
#[derive(Default)]
pub struct QuerySpec {
    pub where_pred: Option<String>,
    pub by: Option<Vec<String>>,
    pub agg_specs: Vec<AggSpec>,
    pub take: Option<usize>,
    pub project: Option<Vec<String>>,
}

/// Run `spec` against `from`, pushing a new context frame and tearing it
/// down (popping back to the caller's frame) whether the pipeline succeeds
/// or a step returns early with an error. `pool`, when given a worker pool
/// with more than one worker, lets a qualifying group-by step use the fused
/// parallel aggregate (see [`crate::aggregate::aggregate`]).
pub fn select(
    ctx: QueryContext,
    from: ObjRef,
    spec: &QuerySpec,
    pool: Option<(&WorkerPool, &mut Heap)>,
) -> (QueryContext, RayResult<ObjRef>) {
    let ctx = ctx.push(from);
    let result = run_pipeline(&ctx, spec, pool);
    let ctx = ctx.pop().expect("select always pushes exactly one frame");
    (ctx, result)
}

fn run_pipeline(ctx: &QueryContext, spec: &QuerySpec, pool: Option<(&WorkerPool, &mut Heap)>) -> RayResult<ObjRef> {
    let base = ctx.current_table().expect("select pushed a frame with a table").clone_ref(true);

    let filtered = match &spec.where_pred {
        Some(pred) => {
            let rows = where_rows(&base, pred)?;
            select_table_rows(&base, &rows)?
        }
        None => base,
    };

    let grouped = match &spec.by {
        Some(by_cols) => aggregate(&filtered, by_cols, &spec.agg_specs, pool)?,
        None => filtered,
    };

    let taken = match spec.take {
        Some(n) if n < grouped.len() => {
            let rows: Vec<u32> = (0..n as u32).collect();
            select_table_rows(&grouped, &rows)?
        }
        _ => grouped,
    };

    match &spec.project {
        Some(names) => {
            let mut columns = Vec::with_capacity(names.len());
            for name in names {
                let col = table_column(&taken, name)?;
                columns.push((name.clone(), col.clone_ref(true)));
            }
            table(columns)
        }
        None => Ok(taken),
    }
}
