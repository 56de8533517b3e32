//! Stable Neo-Hookean model split into two XPBD constraints.
//!
//! - `C_D = ‖F‖_F − √3`, compliance `1 / (μ V₀)`
//! - `C_H = det F − γ`, compliance `1 / (λ V₀)`
//!
//! Both vanish at `F = I` when `γ = 1`, so the undeformed element is a
//! fixpoint of each constraint on its own and the pair can be projected
//! one after the other. The Poisson ratio enters through the ratio of the
//! two compliances.
//!
//! `∂C_H/∂F` is the cofactor matrix, which stays well defined as `J`
//! passes through zero, so inverted elements recover.

use tessera_math::kinematics::{cofactor, frobenius_norm_sq};
use tessera_math::Mat3;

use crate::lame::LameParameters;
use crate::traits::{ConstitutiveModel, SubConstraint};

/// `√3 = ‖I‖_F`, the deviatoric invariant of the undeformed state.
const REST_NORM: f32 = 1.732_050_8;

/// Stable Neo-Hookean constitutive model.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableNeoHookean;

impl ConstitutiveModel for StableNeoHookean {
    /// `det F` at which the volumetric constraint is satisfied. With the
    /// deviatoric offset in place this is the rest volume ratio for every
    /// material.
    fn rest_stable_gamma(&self, _lame: &LameParameters) -> f32 {
        1.0
    }

    fn compliance(&self, lame: &LameParameters, rest_volume: f32) -> [f32; 2] {
        [1.0 / (lame.mu * rest_volume), 1.0 / (lame.lambda * rest_volume)]
    }

    fn evaluate(&self, f: &Mat3, gamma: f32) -> [SubConstraint; 2] {
        let norm = frobenius_norm_sq(*f).sqrt();
        // A collapsed F has no defined deviatoric direction
        let dev_gradient = if norm > f32::EPSILON {
            *f * (1.0 / norm)
        } else {
            Mat3::ZERO
        };

        [
            SubConstraint {
                value: norm - REST_NORM,
                gradient: dev_gradient,
            },
            SubConstraint {
                value: f.determinant() - gamma,
                gradient: cofactor(*f),
            },
        ]
    }

    fn rest_deviation(&self, f: &Mat3) -> [f32; 2] {
        [
            frobenius_norm_sq(*f).sqrt() - REST_NORM,
            f.determinant() - 1.0,
        ]
    }

    fn name(&self) -> &str {
        "stable_neo_hookean"
    }
}
