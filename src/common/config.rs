//! VM-wide configuration, analogous to the teacher's `DatabaseConfig`.

use crate::heap::HeapConfig;

/// Configuration for a single `Vm` instance: heap sizing, worker count, and
/// the swap-path fallback used when an anonymous pool allocation fails.
#[derive(Debug, Clone)]
pub struct VmConfig {
    pub heap: HeapConfig,
    /// Number of pool executors, not counting the calling thread (executor
    /// 0 reuses the thread that calls into the pool). Defaults to
    /// `num_cpus::get() - 1`.
    pub worker_count: usize,
    /// Directory `heap::backing` falls back to when anonymous mmap fails.
    /// Read from the `HEAP_SWAP` environment variable if unset here.
    pub swap_dir: Option<std::path::PathBuf>,
}

impl Default for VmConfig {
    fn default() -> Self {
        let worker_count = num_cpus::get().saturating_sub(1).max(1);
        VmConfig {
            heap: HeapConfig::default(),
            worker_count,
            swap_dir: std::env::var("HEAP_SWAP").ok().map(std::path::PathBuf::from),
        }
    }
}

impl VmConfig {
    pub fn with_worker_count(mut self, n: usize) -> Self {
        self.worker_count = n.max(1);
        self
    }
}
