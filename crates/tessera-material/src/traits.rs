//! Constitutive model trait — the core material abstraction.
//!
//! Every material model implements this trait, enabling the solver
//! to swap energy formulations without changing its projection loop.

use tessera_math::Mat3;

use crate::lame::LameParameters;

/// One scalar constraint of the deformation gradient.
#[derive(Debug, Clone, Copy)]
pub struct SubConstraint {
    /// Constraint value `C(F)`.
    pub value: f32,
    /// Derivative `∂C/∂F`. The solver maps it to node gradients.
    pub gradient: Mat3,
}

/// Trait for constitutive models expressed as XPBD constraints.
///
/// A model splits its energy into two sub-constraints, deviatoric first
/// and volumetric second. The solver owns one Lagrange multiplier and
/// one compliance per sub-constraint.
///
/// # Strategy Pattern
///
/// Implementors can be swapped at runtime through `Box<dyn ConstitutiveModel>`.
pub trait ConstitutiveModel: Send + Sync {
    /// Volumetric target `det F` precomputed per element at rest.
    fn rest_stable_gamma(&self, lame: &LameParameters) -> f32;

    /// Unscaled compliances `[deviatoric, volumetric]` for an element of
    /// the given rest volume. The solver divides by `dt_sub²`.
    fn compliance(&self, lame: &LameParameters, rest_volume: f32) -> [f32; 2];

    /// Evaluates both sub-constraints at deformation gradient `f`.
    fn evaluate(&self, f: &Mat3, gamma: f32) -> [SubConstraint; 2];

    /// Deviation of each sub-constraint from the undeformed state,
    /// used for diagnostics only.
    fn rest_deviation(&self, f: &Mat3) -> [f32; 2];

    /// Returns the name of this constitutive model.
    fn name(&self) -> &str;
}
