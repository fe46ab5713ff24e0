//! Tunable constants referenced throughout the query execution core.

/// Below this row count, aggregation and sort dispatchers never bother
/// splitting work across the pool.
pub const PARALLEL_ROW_THRESHOLD: usize = 100_000;

/// Hard cap on workers used by the fused parallel aggregate, regardless of
/// how many executors the pool reports.
pub const MAX_AGGREGATE_WORKERS: usize = 16;

/// Largest key range the perfect-hash group-by fast path will build a direct
/// array for.
pub const PERFECT_HASH_MAX_RANGE: i64 = 65_536;

/// Seed folded into every group-by row fingerprint.
pub const GROUP_HASH_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Seed folded into every left-join row hash.
pub const JOIN_HASH_SEED: u64 = 0xa5b6_c7d8_e9f0_1234;

/// CityHash-style mixer constant used by the 64-bit mixer in `hash::mixer`.
pub const HASH_MIX_CONST: u64 = 0x9ddf_ea08_eb38_2d69;

/// Upper bound on elements a single-pass counting sort will index directly.
pub const COUNTING_SORT_MAX_RANGE: usize = 1_000_000;

/// Row count at/above which sort dispatch considers parallel variants.
pub const PARALLEL_SORT_THRESHOLD: usize = 16 * 4096;

pub const U8_RANGE: usize = 256;

/// Open-addressing table load factor above which a resize is triggered.
pub const HASH_TABLE_MAX_LOAD: f64 = 0.7;

/// Reserved keys recognized by the query driver's input dict.
pub const QUERY_RESERVED_KEYS: [&str; 4] = ["from", "take", "where", "by"];
