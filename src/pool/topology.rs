//! SMT-aware executor numbering. Real thread-sibling pinning is a per-OS
//! syscall (`sched_setaffinity` on Linux); here we only compute the logical
//! executor ids a pool should spin up, leaving actual pinning as a platform
//! extension point the way the teacher's `ParallelContext::from_system`
//! leaves rayon's global pool size as the source of truth.

/// Number of executors to spin up given a requested worker count, clamped to
/// the machine's logical CPU count minus the calling thread (which acts as
/// executor 0).
pub fn executor_count(requested: usize) -> usize {
    let available = num_cpus::get().saturating_sub(1).max(1);
    requested.min(available).max(1)
}
