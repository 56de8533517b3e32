//! Contact constraint data types.
//!
//! A `CollisionConstraint` represents one active contact between
//! primitives, as resolved by collision detection.

use serde::{Deserialize, Serialize};
use tessera_types::{TesseraError, TesseraResult};

/// Shape of a contact. Determines how many particles are involved and
/// how the separation function is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactType {
    /// Two particles kept at least `thickness` apart.
    PointPoint,
    /// A particle kept on the positive side of a triangle.
    PointTriangle,
    /// Two edges kept apart along the detection normal.
    EdgeEdge,
}

impl ContactType {
    /// Number of particles referenced by this contact type.
    #[inline]
    pub fn arity(self) -> usize {
        match self {
            ContactType::PointPoint => 2,
            ContactType::PointTriangle | ContactType::EdgeEdge => 4,
        }
    }
}

/// An active contact between 2–4 particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConstraint {
    /// Contact shape.
    pub contact_type: ContactType,

    /// Particle indices.
    ///
    /// For `PointPoint`: `[p, q, _, _]`
    /// For `PointTriangle`: `[p, tri_v0, tri_v1, tri_v2]`
    /// For `EdgeEdge`: `[edge_a_v0, edge_a_v1, edge_b_v0, edge_b_v1]`
    pub indices: [u32; 4],

    /// Minimum allowed separation.
    pub thickness: f32,

    /// Detection normal (points from B to A). Required for `EdgeEdge`;
    /// used by `PointPoint` only when the two particles coincide.
    pub normal: [f32; 3],

    /// Compliance α (inverse stiffness). Near zero for hard contact.
    pub compliance: f32,
}

impl CollisionConstraint {
    /// Contact between two particles.
    pub fn point_point(p: u32, q: u32, thickness: f32, compliance: f32) -> Self {
        Self {
            contact_type: ContactType::PointPoint,
            indices: [p, q, p, q],
            thickness,
            normal: [0.0, 1.0, 0.0],
            compliance,
        }
    }

    /// Contact between particle `p` and triangle `tri`.
    pub fn point_triangle(p: u32, tri: [u32; 3], thickness: f32, compliance: f32) -> Self {
        Self {
            contact_type: ContactType::PointTriangle,
            indices: [p, tri[0], tri[1], tri[2]],
            thickness,
            normal: [0.0, 0.0, 0.0],
            compliance,
        }
    }

    /// Contact between edge `a` and edge `b`, separated along `normal`.
    pub fn edge_edge(
        a: [u32; 2],
        b: [u32; 2],
        normal: [f32; 3],
        thickness: f32,
        compliance: f32,
    ) -> Self {
        Self {
            contact_type: ContactType::EdgeEdge,
            indices: [a[0], a[1], b[0], b[1]],
            thickness,
            normal,
            compliance,
        }
    }

    /// Replaces the detection normal.
    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = normal;
        self
    }

    /// Particles this contact touches.
    #[inline]
    pub fn particles(&self) -> &[u32] {
        &self.indices[..self.contact_type.arity()]
    }

    /// Checks indices, thickness, compliance and normal.
    pub fn validate(&self, particle_count: usize) -> TesseraResult<()> {
        let particles = self.particles();
        if let Some(&idx) = particles.iter().find(|&&idx| idx as usize >= particle_count) {
            return Err(TesseraError::InvalidConfig(format!(
                "Contact references particle {} (particle count: {})",
                idx, particle_count
            )));
        }
        let repeated = (0..particles.len())
            .any(|i| (i + 1..particles.len()).any(|j| particles[i] == particles[j]));
        if repeated {
            return Err(TesseraError::InvalidConfig(format!(
                "Contact has repeated particle indices: {:?}",
                particles
            )));
        }
        if !self.thickness.is_finite() || self.thickness < 0.0 {
            return Err(TesseraError::InvalidConfig(format!(
                "Contact thickness must be non-negative, got {}",
                self.thickness
            )));
        }
        if !self.compliance.is_finite() || self.compliance < 0.0 {
            return Err(TesseraError::InvalidConfig(format!(
                "Contact compliance must be non-negative, got {}",
                self.compliance
            )));
        }
        let [nx, ny, nz] = self.normal;
        let len_sq = nx * nx + ny * ny + nz * nz;
        if !len_sq.is_finite()
            || (self.contact_type == ContactType::EdgeEdge && len_sq < f32::EPSILON)
        {
            return Err(TesseraError::InvalidConfig(format!(
                "Contact normal is not usable: {:?}",
                self.normal
            )));
        }
        Ok(())
    }
}
