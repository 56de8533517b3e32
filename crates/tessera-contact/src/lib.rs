//! # tessera-contact
//!
//! Non-penetration constraints for the XPBD solver.
//!
//! Contacts are produced by an external collision-detection stage and
//! handed to the solver once per frame. This crate owns:
//! 1. **Contact types** — a closed set of shapes (point-point,
//!    point-triangle, edge-edge) referencing 2–4 particles
//! 2. **Separation** — live evaluation of the signed separation and its
//!    per-particle gradient against current positions
//! 3. **Response** — the one-sided multiplier update that never pulls
//!    surfaces together
//! 4. **Model** — the per-frame constraint list and its multipliers

pub mod contact;
pub mod model;
pub mod response;
pub mod separation;

pub use contact::{CollisionConstraint, ContactType};
pub use model::CollisionConstraintModel;
pub use response::one_sided_delta_lambda;
pub use separation::Separation;
