//! Per-frame collision constraint storage.

use tessera_math::Vec3;
use tessera_types::{TesseraError, TesseraResult};
use tracing::debug;

use crate::contact::CollisionConstraint;

/// Active contacts and their Lagrange multipliers.
///
/// Contacts are replaced wholesale every frame; nothing is carried
/// across frames. Multipliers are zeroed at the start of each substep.
#[derive(Debug, Clone, Default)]
pub struct CollisionConstraintModel {
    constraints: Vec<CollisionConstraint>,
    lambdas: Vec<f32>,
}

impl CollisionConstraintModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs this frame's contacts, replacing the previous list.
    ///
    /// Every contact is validated first; on error the previous list is kept.
    pub fn set_constraints(
        &mut self,
        constraints: Vec<CollisionConstraint>,
        particle_count: usize,
    ) -> TesseraResult<()> {
        for (i, c) in constraints.iter().enumerate() {
            c.validate(particle_count).map_err(|e| match e {
                TesseraError::InvalidConfig(msg) => {
                    TesseraError::InvalidConfig(format!("contact {i}: {msg}"))
                }
                other => other,
            })?;
        }
        debug!(count = constraints.len(), "Installed collision constraints");
        self.lambdas = vec![0.0; constraints.len()];
        self.constraints = constraints;
        Ok(())
    }

    /// Removes all contacts.
    pub fn clear(&mut self) {
        self.constraints.clear();
        self.lambdas.clear();
    }

    /// The installed contacts.
    pub fn constraints(&self) -> &[CollisionConstraint] {
        &self.constraints
    }

    /// Number of installed contacts.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Returns true if no contacts are installed.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Zeroes every multiplier.
    pub fn reset_multipliers(&mut self) {
        self.lambdas.fill(0.0);
    }

    /// Accumulated multiplier per contact.
    pub fn lagrange_multipliers(&self) -> &[f32] {
        &self.lambdas
    }

    /// Overwrites the multipliers, e.g. when restoring a checkpoint.
    pub fn set_lagrange_multipliers(&mut self, lambdas: &[f32]) -> TesseraResult<()> {
        if lambdas.len() != self.lambdas.len() {
            return Err(TesseraError::dimension(
                "collision multipliers",
                self.lambdas.len(),
                lambdas.len(),
            ));
        }
        self.lambdas.copy_from_slice(lambdas);
        Ok(())
    }

    /// Unscaled compliance per contact.
    pub fn compliance(&self) -> Vec<f32> {
        self.constraints.iter().map(|c| c.compliance).collect()
    }

    /// One-sided residual `max(0, −(C + α̃λ))` per contact at positions `x`,
    /// with `α̃ = α / h²`. Degenerate contacts report zero.
    pub fn residuals(&self, x: &[Vec3], h: f32) -> Vec<f32> {
        let inv_h2 = 1.0 / (h * h);
        self.constraints
            .iter()
            .zip(&self.lambdas)
            .map(|(c, &lambda)| match c.evaluate(&gather(c, x)) {
                Some(s) => (-(s.value + c.compliance * inv_h2 * lambda)).max(0.0),
                None => 0.0,
            })
            .collect()
    }

    /// Number of contacts whose separation is negative at positions `x`.
    pub fn penetrating_count(&self, x: &[Vec3]) -> usize {
        self.constraints
            .iter()
            .filter_map(|c| c.evaluate(&gather(c, x)))
            .filter(|s| s.value < 0.0)
            .count()
    }

    /// Contacts and multipliers borrowed together for projection.
    pub fn split_mut(&mut self) -> (&[CollisionConstraint], &mut [f32]) {
        (&self.constraints, &mut self.lambdas)
    }
}

fn gather(c: &CollisionConstraint, x: &[Vec3]) -> [Vec3; 4] {
    let mut out = [Vec3::ZERO; 4];
    for (slot, &p) in c.particles().iter().enumerate() {
        out[slot] = x[p as usize];
    }
    out
}
