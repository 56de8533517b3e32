//! Per-constraint projection kernels.
//!
//! A [`ProjectionContext`] holds shared views of the particle positions and
//! both multiplier buffers for one substep. Kernels read and write only the
//! slots of the particles and multipliers their constraint owns, which is
//! what the partition precondition makes race-free.

use tessera_contact::{one_sided_delta_lambda, CollisionConstraint};
use tessera_material::ConstitutiveModel;
use tessera_math::kinematics::{deformation_gradient, node_gradients};
use tessera_math::xpbd::{coupled_delta_lambda, delta_lambda};
use tessera_math::Vec3;
use tessera_types::ConstraintId;

use crate::config::ElasticProjection;
use crate::elasticity::TetConstraint;
use crate::shared::SharedSlice;

/// What happened when a constraint was visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The constraint was projected (or was an inactive contact).
    Projected,
    /// Zero weighted gradient norm or degenerate geometry.
    Skipped,
}

/// Shared state for projecting one substep.
pub(crate) struct ProjectionContext<'a> {
    pub pos_x: SharedSlice<'a, f32>,
    pub pos_y: SharedSlice<'a, f32>,
    pub pos_z: SharedSlice<'a, f32>,
    pub inv_mass: &'a [f32],
    pub elements: &'a [TetConstraint],
    pub elastic_lambdas: SharedSlice<'a, [f32; 2]>,
    pub model: &'a dyn ConstitutiveModel,
    pub contacts: &'a [CollisionConstraint],
    pub contact_lambdas: SharedSlice<'a, f32>,
    /// `1 / h²` of the current substep.
    pub inv_h2: f32,
    pub mode: ElasticProjection,
    pub epsilon: f32,
}

impl ProjectionContext<'_> {
    /// Projects one constraint.
    ///
    /// # Safety
    ///
    /// The id is in range, and no constraint running concurrently with this
    /// call touches the same particles or the same constraint id.
    #[inline]
    pub unsafe fn project(&self, id: ConstraintId) -> Visit {
        match id {
            ConstraintId::Elastic(e) => self.project_element(e.index()),
            ConstraintId::Collision(c) => self.project_contact(c.index()),
        }
    }

    #[inline(always)]
    unsafe fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x.read(i), self.pos_y.read(i), self.pos_z.read(i))
    }

    #[inline(always)]
    unsafe fn displace(&self, i: usize, dx: Vec3) {
        self.pos_x.write(i, self.pos_x.read(i) + dx.x);
        self.pos_y.write(i, self.pos_y.read(i) + dx.y);
        self.pos_z.write(i, self.pos_z.read(i) + dx.z);
    }

    unsafe fn project_element(&self, e: usize) -> Visit {
        let element = &self.elements[e];
        let idx = element.indices.map(|i| i as usize);
        let w = idx.map(|i| self.inv_mass[i]);
        let alpha = [
            element.compliance[0] * self.inv_h2,
            element.compliance[1] * self.inv_h2,
        ];
        let mut lambda = self.elastic_lambdas.read(e);

        let x = idx.map(|i| self.position(i));
        let f = deformation_gradient(&x, element.dm_inv);
        let [dev, vol] = self.model.evaluate(&f, element.gamma);
        let gd = node_gradients(dev.gradient, element.dm_inv);
        let gh = node_gradients(vol.gradient, element.dm_inv);

        let visit = match self.mode {
            ElasticProjection::Coupled => {
                let mut a11 = 0.0_f64;
                let mut a12 = 0.0_f64;
                let mut a22 = 0.0_f64;
                for k in 0..4 {
                    let wk = w[k] as f64;
                    a11 += wk * gd[k].dot(gd[k]) as f64;
                    a12 += wk * gd[k].dot(gh[k]) as f64;
                    a22 += wk * gh[k].dot(gh[k]) as f64;
                }
                if a11.max(a22) < self.epsilon as f64 {
                    return Visit::Skipped;
                }
                let b = [
                    -(dev.value + alpha[0] * lambda[0]) as f64,
                    -(vol.value + alpha[1] * lambda[1]) as f64,
                ];
                let solved = coupled_delta_lambda(
                    a11 + alpha[0] as f64,
                    a12,
                    a22 + alpha[1] as f64,
                    b,
                );
                match solved {
                    Some([dl_d, dl_h]) => {
                        for k in 0..4 {
                            if w[k] > 0.0 {
                                self.displace(idx[k], w[k] * (dl_d * gd[k] + dl_h * gh[k]));
                            }
                        }
                        lambda[0] += dl_d;
                        lambda[1] += dl_h;
                        Visit::Projected
                    }
                    // Singular coupling: resolve the pair one after the other
                    None => self.project_element_sequential(element, &idx, &w, alpha, &mut lambda),
                }
            }
            ElasticProjection::Sequential => {
                self.project_element_sequential(element, &idx, &w, alpha, &mut lambda)
            }
        };

        self.elastic_lambdas.write(e, lambda);
        visit
    }

    /// Deviatoric then volumetric, re-evaluating `F` in between.
    unsafe fn project_element_sequential(
        &self,
        element: &TetConstraint,
        idx: &[usize; 4],
        w: &[f32; 4],
        alpha: [f32; 2],
        lambda: &mut [f32; 2],
    ) -> Visit {
        let mut visit = Visit::Projected;
        for k in 0..2 {
            let x = idx.map(|i| self.position(i));
            let f = deformation_gradient(&x, element.dm_inv);
            let sub = self.model.evaluate(&f, element.gamma)[k];
            let g = node_gradients(sub.gradient, element.dm_inv);
            let weighted: f32 = (0..4).map(|j| w[j] * g[j].length_squared()).sum();
            if weighted < self.epsilon {
                visit = Visit::Skipped;
                continue;
            }
            let Some(dl) = delta_lambda(sub.value, lambda[k], alpha[k], weighted, self.epsilon)
            else {
                visit = Visit::Skipped;
                continue;
            };
            for j in 0..4 {
                if w[j] > 0.0 {
                    self.displace(idx[j], w[j] * dl * g[j]);
                }
            }
            lambda[k] += dl;
        }
        visit
    }

    unsafe fn project_contact(&self, c: usize) -> Visit {
        let contact = &self.contacts[c];
        let particles = contact.particles();
        let mut x = [Vec3::ZERO; 4];
        let mut w = [0.0_f32; 4];
        for (slot, &p) in particles.iter().enumerate() {
            x[slot] = self.position(p as usize);
            w[slot] = self.inv_mass[p as usize];
        }

        let Some(separation) = contact.evaluate(&x) else {
            return Visit::Skipped;
        };
        if separation.value >= 0.0 {
            return Visit::Projected;
        }

        let g = separation.gradients;
        let weighted: f32 = (0..particles.len())
            .map(|k| w[k] * g[k].length_squared())
            .sum();
        if weighted < self.epsilon {
            return Visit::Skipped;
        }

        let lambda = self.contact_lambdas.read(c);
        let alpha = contact.compliance * self.inv_h2;
        let Some(dl) =
            one_sided_delta_lambda(separation.value, lambda, alpha, weighted, self.epsilon)
        else {
            return Visit::Skipped;
        };
        for (slot, &p) in particles.iter().enumerate() {
            if w[slot] > 0.0 {
                self.displace(p as usize, w[slot] * dl * g[slot]);
            }
        }
        self.contact_lambdas.write(c, lambda + dl);
        Visit::Projected
    }
}
