//! Rayon-based parallelisation utilities.
//!
//! Sensitivity cells are independent pure computations, so they are
//! mapped over a flat index space and collected in index order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minimum number of items before fanning out to the thread pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16;

/// Configuration for parallel execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelConfig {
    /// Minimum items before using parallelism
    pub parallel_threshold: usize,
    /// Dedicated pool size; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            num_threads: None,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(parallel_threshold: usize, num_threads: Option<usize>) -> Self {
        Self {
            parallel_threshold,
            num_threads: num_threads.map(|n| n.max(1)),
        }
    }

    /// Always sequential.
    pub fn sequential() -> Self {
        Self::new(usize::MAX, None)
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelize(&self, n_items: usize) -> bool {
        n_items >= self.parallel_threshold
    }
}

/// Maps `0..n` through `mapper`, in parallel when the config allows.
///
/// Results are returned in index order regardless of execution order.
///
/// # Arguments
///
/// * `n` - Number of items
/// * `config` - Threshold and pool sizing
/// * `mapper` - Function applied to each index
pub fn map_indices<R, F>(n: usize, config: &ParallelConfig, mapper: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    if !config.should_parallelize(n) {
        return (0..n).map(mapper).collect();
    }

    match config.num_threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| (0..n).into_par_iter().map(&mapper).collect()),
            Err(err) => {
                warn!(error = %err, threads, "Dedicated pool unavailable, using global pool");
                (0..n).into_par_iter().map(mapper).collect()
            }
        },
        None => (0..n).into_par_iter().map(mapper).collect(),
    }
}
