//! The `eval` collaborator: since the Lisp reader/evaluator is out of
//! scope, the query driver only needs a narrow `Evaluator` trait it can
//! call into for per-row/per-column expressions. `ConstEvaluator` is a test
//! double that handles the two expression shapes the driver itself
//! generates (`Column` references and pre-built `Const` values).

use crate::common::error::{RayError, RayResult};
use crate::query::context::QueryContext;
use crate::types::table::table_column;
use crate::types::ObjRef;

#[derive(Clone)]
pub enum Expr {
    Const(ObjRef),
    Column(String),
}

pub trait Evaluator {
    fn eval(&self, expr: &Expr, ctx: &QueryContext) -> RayResult<ObjRef>;
}

/// Minimal evaluator: resolves `Column` against the context's current
/// table and returns `Const` values unchanged. Sufficient to drive and test
/// the query pipeline without a real front end.
pub struct ConstEvaluator;

impl Evaluator for ConstEvaluator {
    fn eval(&self, expr: &Expr, ctx: &QueryContext) -> RayResult<ObjRef> {
        match expr {
            Expr::Const(obj) => Ok(obj.clone_ref(true)),
            Expr::Column(name) => {
                let table = ctx.current_table().ok_or(RayError::Domain { arg: 0, field: Some(name.clone()) })?;
                Ok(table_column(table, name)?.clone_ref(true))
            }
        }
    }
}
