//! Particle state — SoA buffers for all per-particle data.
//!
//! This is the primary mutable data structure during stepping.
//! The stepper reads and writes these buffers every substep.

use tessera_math::Vec3;
use tessera_mesh::TetMesh;
use tessera_types::{TesseraError, TesseraResult};

use crate::config::ZeroMassPolicy;

/// SoA particle buffers.
///
/// # Layout
///
/// All arrays have length `len()`, fixed at construction:
/// ```text
/// pos_x: [x0, x1, x2, ...]
/// pos_y: [y0, y1, y2, ...]
/// ...
/// ```
///
/// Setters validate the whole input before writing, so a rejected call
/// leaves the buffers untouched.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    // ─── Position (current) ───
    pub(crate) pos_x: Vec<f32>,
    pub(crate) pos_y: Vec<f32>,
    pub(crate) pos_z: Vec<f32>,

    // ─── Position at the start of the substep ───
    pub(crate) prev_x: Vec<f32>,
    pub(crate) prev_y: Vec<f32>,
    pub(crate) prev_z: Vec<f32>,

    // ─── Velocity ───
    pub(crate) vel_x: Vec<f32>,
    pub(crate) vel_y: Vec<f32>,
    pub(crate) vel_z: Vec<f32>,

    // ─── External force accumulator ───
    pub(crate) force_x: Vec<f32>,
    pub(crate) force_y: Vec<f32>,
    pub(crate) force_z: Vec<f32>,

    // ─── Mass (inverse mass 0 = pinned) ───
    pub(crate) mass: Vec<f32>,
    pub(crate) inv_mass: Vec<f32>,
}

impl ParticleSystem {
    /// Creates particles at `positions` with unit mass, at rest and unforced.
    pub fn new(positions: &[Vec3]) -> Self {
        let n = positions.len();
        let pos_x: Vec<f32> = positions.iter().map(|p| p.x).collect();
        let pos_y: Vec<f32> = positions.iter().map(|p| p.y).collect();
        let pos_z: Vec<f32> = positions.iter().map(|p| p.z).collect();
        Self {
            prev_x: pos_x.clone(),
            prev_y: pos_y.clone(),
            prev_z: pos_z.clone(),
            pos_x,
            pos_y,
            pos_z,
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
            vel_z: vec![0.0; n],
            force_x: vec![0.0; n],
            force_y: vec![0.0; n],
            force_z: vec![0.0; n],
            mass: vec![1.0; n],
            inv_mass: vec![1.0; n],
        }
    }

    /// Creates one particle per mesh vertex.
    pub fn from_mesh(mesh: &TetMesh) -> Self {
        let positions: Vec<Vec3> = (0..mesh.vertex_count())
            .map(|i| mesh.position_vec3(i))
            .collect();
        Self::new(&positions)
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns true if there are no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    fn check_len(&self, what: &'static str, actual: usize) -> TesseraResult<()> {
        if actual != self.len() {
            return Err(TesseraError::dimension(what, self.len(), actual));
        }
        Ok(())
    }

    /// Overwrites all positions.
    pub fn set_positions(&mut self, positions: &[Vec3]) -> TesseraResult<()> {
        self.check_len("positions", positions.len())?;
        scatter(positions, &mut self.pos_x, &mut self.pos_y, &mut self.pos_z);
        Ok(())
    }

    /// Overwrites all velocities.
    pub fn set_velocities(&mut self, velocities: &[Vec3]) -> TesseraResult<()> {
        self.check_len("velocities", velocities.len())?;
        scatter(velocities, &mut self.vel_x, &mut self.vel_y, &mut self.vel_z);
        Ok(())
    }

    /// Overwrites all external forces. Forces persist across steps until
    /// overwritten.
    pub fn set_external_forces(&mut self, forces: &[Vec3]) -> TesseraResult<()> {
        self.check_len("external forces", forces.len())?;
        scatter(forces, &mut self.force_x, &mut self.force_y, &mut self.force_z);
        Ok(())
    }

    /// Sets per-particle masses, stored internally as inverse mass.
    ///
    /// Negative or non-finite masses are rejected. A mass of exactly zero
    /// is rejected or pins the particle, per `policy`.
    pub fn set_masses(&mut self, masses: &[f32], policy: ZeroMassPolicy) -> TesseraResult<()> {
        self.check_len("masses", masses.len())?;
        for (index, &value) in masses.iter().enumerate() {
            let rejected = !value.is_finite()
                || value < 0.0
                || (value == 0.0 && policy == ZeroMassPolicy::Reject);
            if rejected {
                return Err(TesseraError::InvalidMass { index, value });
            }
        }

        self.mass.copy_from_slice(masses);
        for (inv, &m) in self.inv_mass.iter_mut().zip(masses) {
            *inv = if m == 0.0 { 0.0 } else { 1.0 / m };
        }
        Ok(())
    }

    /// Current positions.
    pub fn positions(&self) -> Vec<Vec3> {
        gather(&self.pos_x, &self.pos_y, &self.pos_z)
    }

    /// Current velocities.
    pub fn velocities(&self) -> Vec<Vec3> {
        gather(&self.vel_x, &self.vel_y, &self.vel_z)
    }

    /// External forces.
    pub fn external_forces(&self) -> Vec<Vec3> {
        gather(&self.force_x, &self.force_y, &self.force_z)
    }

    /// Masses as last set (0 for pinned particles set with mass 0).
    pub fn masses(&self) -> &[f32] {
        &self.mass
    }

    /// Inverse masses.
    pub fn inverse_masses(&self) -> &[f32] {
        &self.inv_mass
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Returns true if particle `i` has infinite mass.
    #[inline]
    pub fn is_pinned(&self, i: usize) -> bool {
        self.inv_mass[i] == 0.0
    }

    /// Overwrites inverse masses directly. Inputs are checked by the caller.
    pub(crate) fn restore_inverse_masses(&mut self, inv_mass: &[f32]) {
        for (i, &w) in inv_mass.iter().enumerate() {
            self.inv_mass[i] = w;
            self.mass[i] = if w > 0.0 { 1.0 / w } else { 0.0 };
        }
    }

    /// Prediction: `x_prev = x`, `x = x + h·v + h²·w·f`.
    ///
    /// Pinned particles keep their position.
    pub(crate) fn predict(&mut self, h: f32) {
        let h2 = h * h;
        for i in 0..self.len() {
            self.prev_x[i] = self.pos_x[i];
            self.prev_y[i] = self.pos_y[i];
            self.prev_z[i] = self.pos_z[i];

            let w = self.inv_mass[i];
            if w == 0.0 {
                continue;
            }
            self.pos_x[i] += h * self.vel_x[i] + h2 * w * self.force_x[i];
            self.pos_y[i] += h * self.vel_y[i] + h2 * w * self.force_y[i];
            self.pos_z[i] += h * self.vel_z[i] + h2 * w * self.force_z[i];
        }
    }

    /// Velocity update `v = (x − x_prev) / h`. Pinned particles get zero velocity.
    pub(crate) fn integrate_velocities(&mut self, h: f32) {
        let inv_h = 1.0 / h;
        for i in 0..self.len() {
            if self.inv_mass[i] == 0.0 {
                self.vel_x[i] = 0.0;
                self.vel_y[i] = 0.0;
                self.vel_z[i] = 0.0;
                continue;
            }
            self.vel_x[i] = (self.pos_x[i] - self.prev_x[i]) * inv_h;
            self.vel_y[i] = (self.pos_y[i] - self.prev_y[i]) * inv_h;
            self.vel_z[i] = (self.pos_z[i] - self.prev_z[i]) * inv_h;
        }
    }
}

fn scatter(values: &[Vec3], x: &mut [f32], y: &mut [f32], z: &mut [f32]) {
    for (i, v) in values.iter().enumerate() {
        x[i] = v.x;
        y[i] = v.y;
        z[i] = v.z;
    }
}

fn gather(x: &[f32], y: &[f32], z: &[f32]) -> Vec<Vec3> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((&x, &y), &z)| Vec3::new(x, y, z))
        .collect()
}
