//! Lamé coefficients and their conversion from engineering constants.

use serde::{Deserialize, Serialize};
use tessera_types::{TesseraError, TesseraResult};

/// First and second Lamé parameters of an isotropic material.
///
/// `mu` is the shear modulus, `lambda` the first Lamé parameter.
/// Both are strictly positive and finite once constructed through
/// [`LameParameters::new`] or [`LameParameters::from_young_poisson`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LameParameters {
    /// Shear modulus μ.
    pub mu: f32,
    /// First Lamé parameter λ.
    pub lambda: f32,
}

impl LameParameters {
    /// Creates validated Lamé parameters.
    pub fn new(mu: f32, lambda: f32) -> TesseraResult<Self> {
        let params = Self { mu, lambda };
        params.validate()?;
        Ok(params)
    }

    /// Converts Young's modulus `E` and Poisson ratio `ν`.
    ///
    /// `μ = E / (2(1 + ν))`, `λ = Eν / ((1 + ν)(1 − 2ν))`.
    /// Requires `E > 0` and `0 < ν < 0.5`.
    pub fn from_young_poisson(young_modulus: f32, poisson_ratio: f32) -> TesseraResult<Self> {
        if !young_modulus.is_finite() || young_modulus <= 0.0 {
            return Err(TesseraError::InvalidMaterial(format!(
                "Young's modulus must be positive, got {young_modulus}"
            )));
        }
        if !poisson_ratio.is_finite() || poisson_ratio <= 0.0 || poisson_ratio >= 0.5 {
            return Err(TesseraError::InvalidMaterial(format!(
                "Poisson ratio must lie in (0, 0.5), got {poisson_ratio}"
            )));
        }

        let e = young_modulus;
        let nu = poisson_ratio;
        let mu = e / (2.0 * (1.0 + nu));
        let lambda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
        Self::new(mu, lambda)
    }

    /// Checks that both coefficients are positive and finite.
    pub fn validate(&self) -> TesseraResult<()> {
        if !self.mu.is_finite() || self.mu <= 0.0 {
            return Err(TesseraError::InvalidMaterial(format!(
                "Shear modulus mu must be positive, got {}",
                self.mu
            )));
        }
        if !self.lambda.is_finite() || self.lambda <= 0.0 {
            return Err(TesseraError::InvalidMaterial(format!(
                "Lamé lambda must be positive, got {}",
                self.lambda
            )));
        }
        Ok(())
    }

    /// Recovers Young's modulus.
    pub fn young_modulus(&self) -> f32 {
        self.mu * (3.0 * self.lambda + 2.0 * self.mu) / (self.lambda + self.mu)
    }

    /// Recovers the Poisson ratio.
    pub fn poisson_ratio(&self) -> f32 {
        self.lambda / (2.0 * (self.lambda + self.mu))
    }
}
