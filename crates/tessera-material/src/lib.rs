//! # tessera-material
//!
//! Constitutive model abstraction and material database.
//!
//! ## Design
//!
//! The [`ConstitutiveModel`] trait splits an elastic energy into scalar
//! XPBD constraints of the deformation gradient. [`StableNeoHookean`] is
//! the production model; its deviatoric and volumetric terms each get
//! their own compliance and Lagrange multiplier in the solver.
//!
//! [`LameParameters`] are validated on construction, so a solver built
//! from them never sees a non-positive stiffness. The [`MaterialDatabase`]
//! stores named presets given as Young's modulus and Poisson ratio.

pub mod database;
pub mod lame;
pub mod neo_hookean;
pub mod properties;
pub mod traits;

pub use database::MaterialDatabase;
pub use lame::LameParameters;
pub use neo_hookean::StableNeoHookean;
pub use properties::ElasticMaterial;
pub use traits::{ConstitutiveModel, SubConstraint};
