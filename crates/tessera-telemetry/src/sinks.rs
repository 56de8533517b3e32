//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (collect in memory, forward to `tracing`, etc.).

use std::sync::{Arc, Mutex};

use crate::events::{EventKind, SimulationEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called when the simulation ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Shared storage a [`VecSink`] writes into.
pub type SharedEvents = Arc<Mutex<Vec<SimulationEvent>>>;

/// Collects events in memory for tests and inspection.
///
/// The sink is boxed into the bus, so collected events are read through
/// the handle returned by [`VecSink::events`].
pub struct VecSink {
    events: SharedEvents,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the collected events. Stays valid after the sink is boxed.
    pub fn events(&self) -> SharedEvents {
        Arc::clone(&self.events)
    }
}

impl Default for VecSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        // A poisoned lock only means a reader panicked; keep collecting
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
///
/// Per-substep events go to `trace`, everything else to `debug`.
pub struct TracingSink;

impl TracingSink {
    /// Creates a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        match &event.kind {
            EventKind::SubstepEnd { substep } => {
                tracing::trace!(step = event.step, substep, "substep_end");
            }
            kind => {
                tracing::debug!(step = event.step, event = ?kind, "simulation_event");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
