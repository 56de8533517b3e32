//! Engineering description of an elastic material.

use serde::{Deserialize, Serialize};
use tessera_types::constants::{DEFAULT_POISSON_RATIO, DEFAULT_YOUNG_MODULUS};
use tessera_types::TesseraResult;

use crate::lame::LameParameters;

/// Isotropic elastic material given by Young's modulus and Poisson ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticMaterial {
    /// Human-readable name (e.g., "silicone").
    pub name: String,

    /// Young's modulus in Pa.
    pub young_modulus: f32,

    /// Poisson ratio, in `(0, 0.5)`. Values near 0.5 are nearly incompressible.
    pub poisson_ratio: f32,
}

impl ElasticMaterial {
    /// Creates a named material.
    pub fn new(name: impl Into<String>, young_modulus: f32, poisson_ratio: f32) -> Self {
        Self {
            name: name.into(),
            young_modulus,
            poisson_ratio,
        }
    }

    /// Converts to validated Lamé parameters.
    pub fn lame(&self) -> TesseraResult<LameParameters> {
        LameParameters::from_young_poisson(self.young_modulus, self.poisson_ratio)
    }
}

impl Default for ElasticMaterial {
    fn default() -> Self {
        Self::new("default", DEFAULT_YOUNG_MODULUS, DEFAULT_POISSON_RATIO)
    }
}
