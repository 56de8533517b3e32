//! # tessera-math
//!
//! Linear algebra primitives for the Tessera solver.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, `Mat3`)
//! - Tetrahedron kinematics: rest shape, deformation gradient, cofactor,
//!   and the chain rule from ∂C/∂F to per-node gradients
//! - Closest-point queries used by live contact evaluation
//! - Scalar and coupled XPBD multiplier updates

pub mod kinematics;
pub mod proximity;
pub mod xpbd;

// Re-export glam types as the canonical math types for Tessera.
pub use glam::{Mat3, Vec3};
