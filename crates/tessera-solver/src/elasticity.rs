//! Stable Neo-Hookean element constraints.
//!
//! Precomputes per-tetrahedron rest-state data and holds the per-substep
//! Lagrange multipliers. Every element carries two sub-constraints,
//! deviatoric (index 0) and volumetric (index 1), each with its own
//! compliance and multiplier.
//!
//! ## Rest Data
//!
//! For each tetrahedron:
//! 1. `Dm⁻¹` from the reference edge matrix
//! 2. Rest volume `V₀ = |det Dm| / 6`
//! 3. Rest-stable gamma and compliances from the element's Lamé parameters

use tessera_material::{ConstitutiveModel, LameParameters, StableNeoHookean};
use tessera_math::kinematics::{deformation_gradient, rest_shape};
use tessera_math::{Mat3, Vec3};
use tessera_mesh::TetMesh;
use tessera_types::{TesseraError, TesseraResult};

/// Precomputed data for a single tetrahedral element.
#[derive(Debug, Clone, Copy)]
pub struct TetConstraint {
    /// Particle indices of the four nodes.
    pub indices: [u32; 4],
    /// Inverse of the rest edge matrix.
    pub dm_inv: Mat3,
    /// Rest volume.
    pub rest_volume: f32,
    /// Element material.
    pub lame: LameParameters,
    /// Volumetric offset `γ`.
    pub gamma: f32,
    /// Unscaled compliances `[deviatoric, volumetric]`.
    pub compliance: [f32; 2],
}

/// All elastic element constraints of a body.
pub struct ElasticityConstraintModel {
    elements: Vec<TetConstraint>,
    lambdas: Vec<[f32; 2]>,
    model: Box<dyn ConstitutiveModel>,
}

impl ElasticityConstraintModel {
    /// Builds element constraints from a mesh with one material per element.
    ///
    /// Fails on a degenerate element or a material count mismatch.
    pub fn from_mesh(mesh: &TetMesh, lame: &[LameParameters]) -> TesseraResult<Self> {
        Self::with_model(mesh, lame, Box::new(StableNeoHookean))
    }

    /// Like [`from_mesh`](Self::from_mesh) with a custom constitutive model.
    pub fn with_model(
        mesh: &TetMesh,
        lame: &[LameParameters],
        model: Box<dyn ConstitutiveModel>,
    ) -> TesseraResult<Self> {
        let n = mesh.tetrahedron_count();
        if lame.len() != n {
            return Err(TesseraError::dimension("Lamé coefficients", n, lame.len()));
        }

        let mut elements = Vec::with_capacity(n);
        for (e, params) in lame.iter().enumerate() {
            params.validate()?;
            let rest = rest_shape(&mesh.tetrahedron_positions(e)).ok_or_else(|| {
                TesseraError::InvalidMesh(format!("Tetrahedron {e} is degenerate"))
            })?;
            elements.push(TetConstraint {
                indices: mesh.tetrahedron(e),
                dm_inv: rest.dm_inv,
                rest_volume: rest.volume,
                lame: *params,
                gamma: 0.0,
                compliance: [0.0; 2],
            });
        }

        let mut this = Self {
            lambdas: vec![[0.0; 2]; n],
            elements,
            model,
        };
        this.prepare_constraints();
        Ok(this)
    }

    /// Recomputes gamma and compliance from the current Lamé parameters.
    pub fn prepare_constraints(&mut self) {
        for element in &mut self.elements {
            element.gamma = self.model.rest_stable_gamma(&element.lame);
            element.compliance = self.model.compliance(&element.lame, element.rest_volume);
        }
    }

    /// Replaces every element's material and re-prepares the constraints.
    pub fn set_lame_coefficients(&mut self, lame: &[LameParameters]) -> TesseraResult<()> {
        if lame.len() != self.elements.len() {
            return Err(TesseraError::dimension(
                "Lamé coefficients",
                self.elements.len(),
                lame.len(),
            ));
        }
        for params in lame {
            params.validate()?;
        }
        for (element, params) in self.elements.iter_mut().zip(lame) {
            element.lame = *params;
        }
        self.prepare_constraints();
        Ok(())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Per-element rest data.
    pub fn elements(&self) -> &[TetConstraint] {
        &self.elements
    }

    /// The constitutive model shared by all elements.
    pub fn model(&self) -> &dyn ConstitutiveModel {
        self.model.as_ref()
    }

    /// Per-element Lamé parameters.
    pub fn lame_coefficients(&self) -> Vec<LameParameters> {
        self.elements.iter().map(|e| e.lame).collect()
    }

    /// Per-element `Dm⁻¹`.
    pub fn shape_matrix_inverses(&self) -> Vec<Mat3> {
        self.elements.iter().map(|e| e.dm_inv).collect()
    }

    /// Per-element rest-stable gamma.
    pub fn rest_stable_gamma(&self) -> Vec<f32> {
        self.elements.iter().map(|e| e.gamma).collect()
    }

    /// Per-element rest volume.
    pub fn rest_volumes(&self) -> Vec<f32> {
        self.elements.iter().map(|e| e.rest_volume).collect()
    }

    /// Per-element unscaled compliance `[deviatoric, volumetric]`.
    pub fn compliance(&self) -> Vec<[f32; 2]> {
        self.elements.iter().map(|e| e.compliance).collect()
    }

    /// Per-element multipliers `[deviatoric, volumetric]`.
    pub fn lagrange_multipliers(&self) -> &[[f32; 2]] {
        &self.lambdas
    }

    /// Overwrites the multipliers, e.g. when restoring a checkpoint.
    pub fn set_lagrange_multipliers(&mut self, lambdas: &[[f32; 2]]) -> TesseraResult<()> {
        if lambdas.len() != self.lambdas.len() {
            return Err(TesseraError::dimension(
                "elastic multipliers",
                self.lambdas.len(),
                lambdas.len(),
            ));
        }
        self.lambdas.copy_from_slice(lambdas);
        Ok(())
    }

    /// Zeroes every multiplier.
    pub fn reset_multipliers(&mut self) {
        self.lambdas.fill([0.0; 2]);
    }

    /// Particles of element `e`.
    pub fn particles(&self, e: usize) -> Option<[u32; 4]> {
        self.elements.get(e).map(|el| el.indices)
    }

    /// Deformation gradient of element `e` at positions `x`.
    pub fn deformation_gradient(&self, e: usize, x: &[Vec3]) -> Mat3 {
        let element = &self.elements[e];
        let nodes = element.indices.map(|i| x[i as usize]);
        deformation_gradient(&nodes, element.dm_inv)
    }

    /// XPBD residuals `|C + α̃λ|` of both sub-constraints of every element,
    /// with `α̃ = α / h²`.
    pub fn residuals(&self, x: &[Vec3], h: f32) -> Vec<[f32; 2]> {
        let inv_h2 = 1.0 / (h * h);
        (0..self.elements.len())
            .map(|e| {
                let element = &self.elements[e];
                let f = self.deformation_gradient(e, x);
                let [dev, vol] = self.model.evaluate(&f, element.gamma);
                let lambda = self.lambdas[e];
                [
                    (dev.value + element.compliance[0] * inv_h2 * lambda[0]).abs(),
                    (vol.value + element.compliance[1] * inv_h2 * lambda[1]).abs(),
                ]
            })
            .collect()
    }

    /// Deviation from the undeformed state per element, `[‖F‖ − √3, det F − 1]`.
    pub fn rest_deviation(&self, x: &[Vec3]) -> Vec<[f32; 2]> {
        (0..self.elements.len())
            .map(|e| self.model.rest_deviation(&self.deformation_gradient(e, x)))
            .collect()
    }

    /// Rest data and multipliers borrowed together for projection.
    pub(crate) fn split_mut(
        &mut self,
    ) -> (&[TetConstraint], &mut [[f32; 2]], &dyn ConstitutiveModel) {
        (&self.elements, &mut self.lambdas, self.model.as_ref())
    }
}

impl std::fmt::Debug for ElasticityConstraintModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticityConstraintModel")
            .field("elements", &self.elements.len())
            .field("model", &self.model.name())
            .finish()
    }
}
