//! Partition execution strategies.
//!
//! A scheduler runs one kernel invocation per constraint id of a single
//! partition and reports how many constraints the kernel skipped. The
//! stepper calls it once per partition, in table order, and never starts
//! the next partition before the previous one has returned.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessera_types::{ConstraintId, TesseraError, TesseraResult};

use crate::config::{SchedulerKind, SolverConfig};

/// Constraints handed to a single rayon task at minimum.
const MIN_BATCH: usize = 32;

/// Kernel run per constraint. Returns `true` when the constraint was skipped.
pub type Kernel<'a> = dyn Fn(ConstraintId) -> bool + Sync + 'a;

/// Execution strategy for one partition.
pub trait Scheduler: Send + Sync {
    /// Runs `kernel` on every id and returns the skip count.
    ///
    /// Implementations may run ids concurrently. Callers guarantee that
    /// ids in one call touch disjoint particles.
    fn run(&self, ids: &[ConstraintId], kernel: &Kernel<'_>) -> u64;

    /// Returns the scheduler's name.
    fn name(&self) -> &str;
}

/// Runs constraints on the calling thread in partition order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler;

impl Scheduler for SequentialScheduler {
    fn run(&self, ids: &[ConstraintId], kernel: &Kernel<'_>) -> u64 {
        ids.iter().filter(|&&id| kernel(id)).count() as u64
    }

    fn name(&self) -> &str {
        "sequential"
    }
}

/// Parallel-for over each partition with rayon.
pub struct ParallelScheduler {
    pool: Option<ThreadPool>,
}

impl ParallelScheduler {
    /// Uses rayon's global pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Uses a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> TesseraResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tessera-xpbd-{i}"))
            .build()
            .map_err(|e| TesseraError::InvalidConfig(format!("thread pool: {e}")))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn run_batch(ids: &[ConstraintId], kernel: &Kernel<'_>) -> u64 {
        ids.par_iter()
            .with_min_len(MIN_BATCH)
            .map(|&id| u64::from(kernel(id)))
            .sum()
    }
}

impl Default for ParallelScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ParallelScheduler {
    fn run(&self, ids: &[ConstraintId], kernel: &Kernel<'_>) -> u64 {
        if ids.len() < MIN_BATCH {
            return SequentialScheduler.run(ids, kernel);
        }
        match &self.pool {
            Some(pool) => pool.install(|| Self::run_batch(ids, kernel)),
            None => Self::run_batch(ids, kernel),
        }
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

impl std::fmt::Debug for ParallelScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelScheduler")
            .field("threads", &self.threads())
            .finish()
    }
}

/// Builds the scheduler selected by `config`.
pub fn from_config(config: &SolverConfig) -> TesseraResult<Box<dyn Scheduler>> {
    Ok(match config.scheduler {
        SchedulerKind::Sequential => Box::new(SequentialScheduler),
        SchedulerKind::Parallel if config.threads == 0 => Box::new(ParallelScheduler::new()),
        SchedulerKind::Parallel => Box::new(ParallelScheduler::with_threads(config.threads)?),
    })
}
