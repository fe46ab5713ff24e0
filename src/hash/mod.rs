pub mod bucket;
pub mod mixer;
pub mod open_addressing;

pub use bucket::BucketTable;
pub use mixer::{mix64, mix64x4, mix_fold};
pub use open_addressing::OpenAddressTable;
