//! Error types for the Tessera solver.
//!
//! All crates return `TesseraResult<T>` from fallible operations.
//! A failed setter never leaves partially written state behind.

use thiserror::Error;

/// Unified error type for the Tessera solver.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Input shape does not match the fixed particle, element, or contact count.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A particle mass is zero (when pinning is disabled), negative, or not finite.
    #[error("Invalid mass {value} for particle {index}")]
    InvalidMass { index: usize, value: f32 },

    /// Material parameter is out of valid range.
    #[error("Invalid material parameter: {0}")]
    InvalidMaterial(String),

    /// Step or solver configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reference mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A constraint partition references a constraint that does not exist,
    /// or two constraints in one partition share a particle.
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TesseraError {
    /// Shorthand for a [`TesseraError::DimensionMismatch`].
    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Convenience alias for `Result<T, TesseraError>`.
pub type TesseraResult<T> = Result<T, TesseraError>;
