//! Inspection hooks called by the stepper.
//!
//! Hooks observe the step loop at fixed points without the solver
//! knowing what they do with the information.

use crate::bus::EventBus;
use crate::events::{EventKind, SimulationEvent};

/// Trait for solver inspection hooks.
///
/// All methods default to no-ops, so a hook only implements the points
/// it cares about.
///
/// # Lifecycle
///
/// ```text
/// for each step:
///   hook.on_step_begin(...)
///   for each substep:
///     hook.on_substep_end(...)
///   hook.on_residual(...)      // only when residual reporting is enabled
///   hook.on_step_end(...)
/// ```
pub trait InspectionHook: Send {
    /// Called before the first substep.
    fn on_step_begin(&mut self, step: u64, dt: f32, iterations: u32, substeps: u32) {
        let _ = (step, dt, iterations, substeps);
    }

    /// Called after velocities of a substep are integrated.
    fn on_substep_end(&mut self, step: u64, substep: u32) {
        let _ = (step, substep);
    }

    /// Called with the post-step residual summary.
    fn on_residual(&mut self, step: u64, max_elastic: f32, violated_contacts: u32) {
        let _ = (step, max_elastic, violated_contacts);
    }

    /// Called after the last substep.
    fn on_step_end(&mut self, step: u64, wall_time: f64, skipped: u64) {
        let _ = (step, wall_time, skipped);
    }

    /// Returns the hook's name for logging.
    fn name(&self) -> &str;
}

/// Hook that ignores everything.
pub struct NullHook;

impl InspectionHook for NullHook {
    fn name(&self) -> &str {
        "null_hook"
    }
}

/// Hook that bridges to the telemetry event bus.
///
/// Translates stepper lifecycle calls into events and flushes the bus at
/// the end of every step.
pub struct TelemetryHook {
    bus: EventBus,
}

impl TelemetryHook {
    /// Creates a hook that emits into `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Access to the bus, e.g. to register more sinks.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }
}

impl Default for TelemetryHook {
    fn default() -> Self {
        Self::new(EventBus::new())
    }
}

impl InspectionHook for TelemetryHook {
    fn on_step_begin(&mut self, step: u64, dt: f32, iterations: u32, substeps: u32) {
        self.bus.emit(SimulationEvent::new(
            step,
            EventKind::StepBegin {
                dt,
                iterations,
                substeps,
            },
        ));
    }

    fn on_substep_end(&mut self, step: u64, substep: u32) {
        self.bus
            .emit(SimulationEvent::new(step, EventKind::SubstepEnd { substep }));
    }

    fn on_residual(&mut self, step: u64, max_elastic: f32, violated_contacts: u32) {
        self.bus.emit(SimulationEvent::new(
            step,
            EventKind::Residual {
                max_elastic,
                violated_contacts,
            },
        ));
    }

    fn on_step_end(&mut self, step: u64, wall_time: f64, skipped: u64) {
        self.bus.emit(SimulationEvent::new(
            step,
            EventKind::StepEnd { wall_time, skipped },
        ));
        self.bus.flush();
    }

    fn name(&self) -> &str {
        "telemetry_hook"
    }
}
