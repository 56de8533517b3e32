//! # tessera-types
//!
//! Shared types, identifiers, error types, and physical constants
//! for the Tessera soft-body XPBD solver.
//!
//! This crate has zero domain logic — it defines the vocabulary
//! that all other Tessera crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{TesseraError, TesseraResult};
pub use ids::{ConstraintId, ConstraintKind, ContactId, ElementId};
