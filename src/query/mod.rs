//! Query execution: context frames, the narrow `Evaluator` collaborator,
//! `where`/filter materialization, partitioned-table collect/raze, and the
//! `select` pipeline tying them together.

pub mod context;
pub mod driver;
pub mod eval;
pub mod filter;
pub mod partition;

pub use context::QueryContext;
pub use driver::{select, QuerySpec};
pub use eval::{ConstEvaluator, Evaluator, Expr};
pub use filter::{filter_collect, filter_map, where_rows};
pub use partition::{collect_parted, expand_map_common, raze};
