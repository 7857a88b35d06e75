// src/engine/pool.rs
//
// Thread pool management for batch processing.
//
// A single global pool serves every batch that asks for default concurrency
// instead of building a new pool per call. Thread count comes from
// std::thread::available_parallelism() (which respects cgroup/CPU quota)
// and can be overridden with LUNARZ_THREADS.
//
// The global pool is initialized lazily on first use. Changing
// LUNARZ_THREADS after that has no effect.

use crate::error::LunarzError;
use rayon::ThreadPool;
use std::sync::OnceLock;

/// Maximum allowed concurrency value for a batch
pub const MAX_CONCURRENCY: usize = 1024;

/// Minimum number of rayon threads to ensure at least some parallelism
const MIN_RAYON_THREADS: usize = 1;

pub const THREADS_ENV: &str = "LUNARZ_THREADS";

static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

fn default_thread_count() -> usize {
    let detected = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_RAYON_THREADS);
    std::env::var(THREADS_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(detected)
        .clamp(MIN_RAYON_THREADS, MAX_CONCURRENCY)
}

/// Shared pool, or None if the OS refused to spawn threads at all.
pub fn get_pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = default_thread_count();
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("lunarz-worker-{i}"))
                .build()
                .or_else(|e| {
                    tracing::warn!(target: "lunarz::batch", num_threads, error = %e, "falling back to minimal pool");
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(MIN_RAYON_THREADS)
                        .build()
                })
                .ok()
        })
        .as_ref()
}

/// Dedicated pool of exactly `threads` workers.
pub fn build_pool(threads: usize) -> Result<ThreadPool, LunarzError> {
    if threads == 0 || threads > MAX_CONCURRENCY {
        return Err(LunarzError::invalid_parameter(
            "batch",
            "concurrency",
            threads.to_string(),
            format!("must be 0 or 1-{MAX_CONCURRENCY}"),
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("lunarz-batch-{i}"))
        .build()
        .map_err(|e| LunarzError::internal_panic(format!("failed to build thread pool: {e}")))
}
