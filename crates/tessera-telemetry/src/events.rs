//! Simulation event types.
//!
//! Structured events emitted by the stepper at fixed points of each
//! step. Events are lightweight value types that carry just enough data
//! to be useful for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the solver.
///
/// Events are tagged with a step index and carry domain-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Step number (0-indexed).
    pub step: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Step started.
    StepBegin {
        /// Frame time step (seconds).
        dt: f32,
        /// Projection sweeps per substep.
        iterations: u32,
        /// Number of substeps.
        substeps: u32,
    },

    /// Substep completed (velocities integrated).
    SubstepEnd {
        /// Substep index within the step.
        substep: u32,
    },

    /// Step completed.
    StepEnd {
        /// Wall-clock time for the entire step (seconds).
        wall_time: f64,
        /// Constraint visits skipped because of a zero denominator or
        /// degenerate geometry.
        skipped: u64,
    },

    /// Post-step constraint residual summary.
    Residual {
        /// Largest `|C + α̃λ|` over all elastic sub-constraints.
        max_elastic: f32,
        /// Number of contacts still violated.
        violated_contacts: u32,
    },

    /// Custom event for extensibility.
    Custom {
        /// Arbitrary label.
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl SimulationEvent {
    /// Creates a new event for the given step.
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }
}
