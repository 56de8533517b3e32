//! # tessera-telemetry
//!
//! Event bus for solver telemetry. The stepper reports lifecycle points
//! (step begin/end, substeps, skipped constraints) through an
//! [`InspectionHook`]; [`TelemetryHook`] turns them into structured
//! [`SimulationEvent`]s consumed by pluggable sinks.

pub mod bus;
pub mod events;
pub mod hooks;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use hooks::{InspectionHook, NullHook, TelemetryHook};
pub use sinks::{EventSink, TracingSink, VecSink};
