//! Core tetrahedral mesh type with SoA (Structure of Arrays) layout.
//!
//! The SoA layout stores each coordinate channel contiguously:
//! - `pos_x: [x0, x1, x2, ...]`
//! - `pos_y: [y0, y1, y2, ...]`
//! - `pos_z: [z0, z1, z2, ...]`

use serde::{Deserialize, Serialize};
use tessera_math::Vec3;
use tessera_types::{TesseraError, TesseraResult};

use crate::topology::boundary_faces;

/// A tetrahedral mesh stored in Structure-of-Arrays layout.
///
/// `triangles` is the surface (used by contact collaborators),
/// `tetrahedra` is the volume connectivity the elasticity model is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetMesh {
    // --- Vertex data (SoA) ---
    /// X coordinates of all vertices.
    pub pos_x: Vec<f32>,
    /// Y coordinates of all vertices.
    pub pos_y: Vec<f32>,
    /// Z coordinates of all vertices.
    pub pos_z: Vec<f32>,

    // --- Connectivity ---
    /// Surface triangles, flat: `[t0v0, t0v1, t0v2, t1v0, ...]`.
    pub triangles: Vec<u32>,
    /// Tetrahedra, flat: `[e0v0, e0v1, e0v2, e0v3, e1v0, ...]`.
    pub tetrahedra: Vec<u32>,
}

impl TetMesh {
    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns the number of surface triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Returns the number of tetrahedra.
    #[inline]
    pub fn tetrahedron_count(&self) -> usize {
        self.tetrahedra.len() / 4
    }

    /// Returns the position of vertex `i` as `[x, y, z]`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.pos_x[i], self.pos_y[i], self.pos_z[i]]
    }

    /// Returns the position as a `glam::Vec3`.
    #[inline]
    pub fn position_vec3(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    /// Returns the three vertex indices of surface triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let base = t * 3;
        [self.triangles[base], self.triangles[base + 1], self.triangles[base + 2]]
    }

    /// Returns the four vertex indices of tetrahedron `e`.
    #[inline]
    pub fn tetrahedron(&self, e: usize) -> [u32; 4] {
        let base = e * 4;
        [
            self.tetrahedra[base],
            self.tetrahedra[base + 1],
            self.tetrahedra[base + 2],
            self.tetrahedra[base + 3],
        ]
    }

    /// Returns the four vertex positions of tetrahedron `e`.
    pub fn tetrahedron_positions(&self, e: usize) -> [Vec3; 4] {
        self.tetrahedron(e).map(|v| self.position_vec3(v as usize))
    }

    /// Creates an empty mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, tetrahedron_capacity: usize) -> Self {
        Self {
            pos_x: Vec::with_capacity(vertex_capacity),
            pos_y: Vec::with_capacity(vertex_capacity),
            pos_z: Vec::with_capacity(vertex_capacity),
            triangles: Vec::new(),
            tetrahedra: Vec::with_capacity(tetrahedron_capacity * 4),
        }
    }

    /// Validates mesh integrity.
    ///
    /// Checks:
    /// - All SoA arrays have the same length
    /// - Connectivity lengths are multiples of 3 / 4
    /// - Indices are within bounds
    /// - No element repeats a vertex
    pub fn validate(&self) -> TesseraResult<()> {
        let n = self.pos_x.len();

        if self.pos_y.len() != n || self.pos_z.len() != n {
            return Err(TesseraError::InvalidMesh(
                "Position arrays have inconsistent lengths".into(),
            ));
        }
        if self.triangles.len() % 3 != 0 {
            return Err(TesseraError::InvalidMesh(
                "Triangle index count is not divisible by 3".into(),
            ));
        }
        if self.tetrahedra.len() % 4 != 0 {
            return Err(TesseraError::InvalidMesh(
                "Tetrahedron index count is not divisible by 4".into(),
            ));
        }

        for (name, buffer) in [("triangle", &self.triangles), ("tetrahedron", &self.tetrahedra)] {
            if let Some((i, &idx)) = buffer.iter().enumerate().find(|&(_, &idx)| idx as usize >= n) {
                return Err(TesseraError::InvalidMesh(format!(
                    "{} index {} at position {} is out of range (vertex count: {})",
                    name, idx, i, n
                )));
            }
        }

        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t);
            if a == b || b == c || a == c {
                return Err(TesseraError::InvalidMesh(format!(
                    "Triangle {} has repeated vertex indices: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
        }

        for e in 0..self.tetrahedron_count() {
            let v = self.tetrahedron(e);
            let repeated = (0..4).any(|i| (i + 1..4).any(|j| v[i] == v[j]));
            if repeated {
                return Err(TesseraError::InvalidMesh(format!(
                    "Tetrahedron {} has repeated vertex indices: {:?}",
                    e, v
                )));
            }
        }

        Ok(())
    }

    /// Constructs a mesh from interleaved position data and tetrahedra.
    ///
    /// Converts `[x0, y0, z0, x1, y1, z1, ...]` to SoA layout and derives
    /// the surface triangles from the boundary faces of the tetrahedra.
    pub fn from_interleaved(positions: &[f32], tetrahedra: &[u32]) -> TesseraResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(TesseraError::InvalidMesh(
                "Interleaved positions length not divisible by 3".into(),
            ));
        }

        let n = positions.len() / 3;
        let mut mesh = Self::with_capacity(n, tetrahedra.len() / 4);
        for p in positions.chunks_exact(3) {
            mesh.pos_x.push(p[0]);
            mesh.pos_y.push(p[1]);
            mesh.pos_z.push(p[2]);
        }
        mesh.tetrahedra = tetrahedra.to_vec();

        // Validate before deriving faces so bad indices surface as errors
        mesh.validate()?;
        mesh.triangles = boundary_faces(&mesh.tetrahedra);
        Ok(mesh)
    }
}
