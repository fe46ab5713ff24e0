//! Sort dispatch: attribute fast paths, then counting/radix/merge sort
//! chosen by element kind and value range, with serial and parallel
//! variants. Grounded on `original_source/core/sort.c`.

pub mod counting;
pub mod dispatch;
pub mod merge;
pub mod parallel;
pub mod radix;

pub use dispatch::{sort_indices, Direction};
