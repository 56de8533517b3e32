//! # tessera-solver
//!
//! Substepped, partition-parallel XPBD for tetrahedral soft bodies.
//!
//! ## Key Types
//!
//! - [`Xpbd`] — Solver facade: owns all state, runs `step(dt, iterations, substeps)`
//! - [`ParticleSystem`] — SoA buffers for positions, velocities, forces, masses
//! - [`ElasticityConstraintModel`] — Stable Neo-Hookean element constraints
//! - [`PartitionTable`] — Conflict-free constraint groups, visited in order
//! - [`Scheduler`] — Pluggable execution of one partition (sequential, rayon)
//! - [`SolverConfig`] — Solver configuration
//! - [`XpbdSnapshot`] — Binary checkpoints

pub mod coloring;
pub mod config;
pub mod elasticity;
pub mod particles;
pub mod partition;
mod projection;
pub mod scheduler;
mod shared;
pub mod snapshot;
pub mod xpbd;

pub use coloring::greedy_partitions;
pub use config::{ElasticProjection, SchedulerKind, SolverConfig, ZeroMassPolicy};
pub use elasticity::{ElasticityConstraintModel, TetConstraint};
pub use particles::ParticleSystem;
pub use partition::PartitionTable;
pub use scheduler::{ParallelScheduler, Scheduler, SequentialScheduler};
pub use snapshot::XpbdSnapshot;
pub use xpbd::{StepPhase, Xpbd};
