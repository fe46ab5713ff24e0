//! Query context frame chain: each nested `select` pushes a frame holding
//! its current table and a parent pointer, rather than the teacher's
//! transaction-carrying `ExecutionContext` (transactions are out of scope
//! here). Grounded on the teacher's `execution/context.rs` for the general
//! shape of a context object threaded through a pipeline, reworked around
//! parent-linked frames instead of a transaction/catalog handle.

use crate::types::symbol::SymbolTable;
use crate::types::ObjRef;
use std::sync::Arc;

/// One frame of query evaluation: the table currently in scope plus a link
/// to the enclosing query's frame (for nested `select`s referencing an
/// outer table's columns).
pub struct QueryContext {
    table: Option<ObjRef>,
    parent: Option<Box<QueryContext>>,
    symbols: Arc<SymbolTable>,
}

impl QueryContext {
    pub fn root(symbols: Arc<SymbolTable>) -> Self {
        QueryContext { table: None, parent: None, symbols }
    }

    /// Push a new frame scoped to `table`, keeping this frame as its parent.
    pub fn push(self, table: ObjRef) -> QueryContext {
        QueryContext {
            table: Some(table),
            symbols: self.symbols.clone(),
            parent: Some(Box::new(self)),
        }
    }

    /// Pop back to the parent frame, discarding this one (teardown on
    /// query-step completion or error short-circuit).
    pub fn pop(self) -> Option<QueryContext> {
        self.parent.map(|p| *p)
    }

    pub fn current_table(&self) -> Option<&ObjRef> {
        self.table.as_ref().or_else(|| self.parent.as_ref().and_then(|p| p.current_table()))
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::{table, vector_i64};

    #[test]
    fn push_pop_round_trips() {
        let symbols = Arc::new(SymbolTable::new());
        let ctx = QueryContext::root(symbols);
        let t = table(vec![("a".into(), vector_i64(vec![1, 2, 3]))]).unwrap();
        let ctx = ctx.push(t);
        assert!(ctx.current_table().is_some());
        let ctx = ctx.pop().unwrap();
        assert!(ctx.current_table().is_none());
    }
}
