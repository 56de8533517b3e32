//! Solver state checkpoints for replay and debugging.
//!
//! A snapshot holds everything `Xpbd::step` mutates plus the inputs it
//! reads each frame, so restoring one and stepping again reproduces the
//! original trajectory.

use serde::{Deserialize, Serialize};
use tessera_types::{TesseraError, TesseraResult};

/// A complete solver state snapshot.
///
/// Serialized with `bincode` for compact binary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpbdSnapshot {
    /// Number of completed steps when this snapshot was taken.
    pub step: u64,
    /// Simulation time in seconds.
    pub sim_time: f64,
    /// Particle positions (flat: [x0, y0, z0, x1, y1, z1, ...]).
    pub positions: Vec<f32>,
    /// Particle velocities (flat).
    pub velocities: Vec<f32>,
    /// External forces (flat).
    pub external_forces: Vec<f32>,
    /// Per-particle inverse mass.
    pub inverse_masses: Vec<f32>,
    /// Elastic multipliers `[deviatoric, volumetric]` per element.
    pub elastic_multipliers: Vec<[f32; 2]>,
    /// Contact multipliers.
    pub collision_multipliers: Vec<f32>,
}

impl XpbdSnapshot {
    /// Number of particles captured.
    pub fn particle_count(&self) -> usize {
        self.inverse_masses.len()
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> TesseraResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| TesseraError::Serialization(format!("Snapshot serialization failed: {e}")))
    }

    /// Deserializes from binary format.
    pub fn from_bytes(data: &[u8]) -> TesseraResult<Self> {
        bincode::deserialize(data).map_err(|e| {
            TesseraError::Serialization(format!("Snapshot deserialization failed: {e}"))
        })
    }
}

pub(crate) fn flatten(values: &[tessera_math::Vec3]) -> Vec<f32> {
    values.iter().flat_map(|v| v.to_array()).collect()
}

pub(crate) fn unflatten(values: &[f32]) -> Vec<tessera_math::Vec3> {
    values
        .chunks_exact(3)
        .map(tessera_math::Vec3::from_slice)
        .collect()
}
