//! Shared worker pool for the surrogate loop.
//!
//! Surrogates are independent, so one pool serves every test in the
//! process. Worker threads are named so they can be told apart in profilers.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Get or initialize the shared surrogate pool.
///
/// Uses one thread per logical CPU, or `PC_THREADS` when that variable holds
/// a positive integer. Falls back to rayon's global pool if the custom pool
/// cannot be built.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> Option<&'static ThreadPool> {
    if let Some(pool) = THREAD_POOL.get() {
        return Some(pool);
    }

    let threads = std::env::var("PC_THREADS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(0);

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("pc-surrogate-{}", i))
        .build()
    {
        Ok(pool) => Some(THREAD_POOL.get_or_init(|| pool)),
        Err(e) => {
            log::warn!("could not build surrogate thread pool, using rayon global pool: {}", e);
            None
        }
    }
}

/// Run `op` inside the shared surrogate pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Run `op` directly (no `parallel` feature).
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
