//! Solver configuration.
//!
//! Parameters that control stepping behavior: default iteration and
//! substep counts, scheduling, elastic projection order, mass policy.

use serde::{Deserialize, Serialize};
use tessera_types::constants::{DEFAULT_ITERATIONS, DEFAULT_SUBSTEPS, EPSILON};
use tessera_types::{TesseraError, TesseraResult};

/// How constraints within one partition are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerKind {
    /// One thread, partition order.
    Sequential,
    /// `rayon` parallel-for over each partition.
    Parallel,
}

/// How the two sub-constraints of an elastic element are projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElasticProjection {
    /// Deviatoric first, then volumetric on the updated positions.
    Sequential,
    /// Both multipliers from one 2×2 solve, which converges faster when
    /// the two gradients are nearly parallel.
    Coupled,
}

/// What a particle mass of exactly zero means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroMassPolicy {
    /// Zero mass is an error.
    Reject,
    /// Zero mass pins the particle (inverse mass 0).
    Pin,
}

/// Configuration for the XPBD solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Projection sweeps per substep used by `Xpbd::advance`.
    pub iterations: u32,

    /// Substeps per frame used by `Xpbd::advance`.
    pub substeps: u32,

    /// Execution strategy for partitions.
    pub scheduler: SchedulerKind,

    /// Worker threads for the parallel scheduler. 0 uses rayon's global pool.
    pub threads: usize,

    /// Elastic sub-constraint projection order.
    pub elastic_projection: ElasticProjection,

    /// Handling of zero particle masses.
    pub zero_mass: ZeroMassPolicy,

    /// Weighted gradient norms below this skip the constraint.
    pub degenerate_epsilon: f32,

    /// Whether to evaluate residuals after every step and report them to
    /// the inspection hook.
    pub report_residuals: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            substeps: DEFAULT_SUBSTEPS,
            scheduler: SchedulerKind::Parallel,
            threads: 0,
            elastic_projection: ElasticProjection::Sequential,
            zero_mass: ZeroMassPolicy::Pin,
            degenerate_epsilon: EPSILON,
            report_residuals: false,
        }
    }
}

impl SolverConfig {
    /// Creates a config for debugging (single thread, few iterations,
    /// residuals reported every step).
    pub fn debug() -> Self {
        Self {
            iterations: 3,
            scheduler: SchedulerKind::Sequential,
            report_residuals: true,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more iterations and substeps).
    pub fn high_quality() -> Self {
        Self {
            iterations: 30,
            substeps: 4,
            ..Default::default()
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> TesseraResult<()> {
        if self.substeps == 0 {
            return Err(TesseraError::InvalidConfig(
                "substeps must be at least 1".into(),
            ));
        }
        if !self.degenerate_epsilon.is_finite() || self.degenerate_epsilon < 0.0 {
            return Err(TesseraError::InvalidConfig(format!(
                "degenerate_epsilon must be non-negative, got {}",
                self.degenerate_epsilon
            )));
        }
        Ok(())
    }
}
