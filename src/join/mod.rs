//! Left-join index build. Grounded on `original_source/core/join.c`.

pub mod left_join;

pub use left_join::left_join;
