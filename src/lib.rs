//! Rayforce - in-process columnar analytics engine: query execution core.
//!
//! Tagged value/object model, per-VM arena heap, parallel worker pool,
//! sort, group-by hash aggregation, left-join index build, and partitioned
//! query execution.

pub mod aggregate;
pub mod common;
pub mod hash;
pub mod heap;
pub mod join;
pub mod pool;
pub mod query;
pub mod sort;
pub mod types;

pub use common::{RayError, RayResult, VmConfig};
pub use heap::Heap;
pub use pool::WorkerPool;
pub use types::{AttrBits, ElementKind, ObjData, ObjRef, SymbolTable};

#[cfg(test)]
mod tests {
    use crate::types::table::{table, vector_i64};

    #[test]
    fn crate_public_surface_builds_a_table() {
        let col = vector_i64(vec![1, 2, 3]);
        let t = table(vec![("a".to_string(), col)]).unwrap();
        assert_eq!(t.len(), 3);
    }
}
