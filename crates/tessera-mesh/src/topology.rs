//! Mesh topology queries.
//!
//! Builds adjacency data from the tetrahedron index buffer. The solver
//! itself never needs adjacency at step time; these queries back mesh
//! construction (surface extraction) and offline partition tooling.

use std::collections::HashMap;

use crate::mesh::TetMesh;

/// Faces of a tetrahedron `[v0, v1, v2, v3]`, wound so the normal points
/// away from the opposite vertex when the element is positively oriented.
const TET_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// Precomputed topology information for a tetrahedral mesh.
#[derive(Debug, Clone)]
pub struct Topology {
    /// For each vertex, the tetrahedra that contain it.
    pub vertex_elements: Vec<Vec<u32>>,

    /// Boundary faces (faces owned by exactly one tetrahedron), flat.
    pub boundary_faces: Vec<u32>,
}

impl Topology {
    /// Build topology from a tetrahedral mesh.
    pub fn build(mesh: &TetMesh) -> Self {
        let mut vertex_elements: Vec<Vec<u32>> = vec![Vec::new(); mesh.vertex_count()];
        for e in 0..mesh.tetrahedron_count() {
            for v in mesh.tetrahedron(e) {
                vertex_elements[v as usize].push(e as u32);
            }
        }

        Self {
            vertex_elements,
            boundary_faces: boundary_faces(&mesh.tetrahedra),
        }
    }

    /// Number of boundary faces.
    pub fn boundary_face_count(&self) -> usize {
        self.boundary_faces.len() / 3
    }

    /// Elements sharing at least one vertex with element `e`, excluding `e`.
    pub fn element_neighbors(&self, mesh: &TetMesh, e: usize) -> Vec<u32> {
        let mut neighbors: Vec<u32> = mesh
            .tetrahedron(e)
            .iter()
            .flat_map(|&v| self.vertex_elements[v as usize].iter().copied())
            .filter(|&other| other as usize != e)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}

/// Extracts the boundary faces of a flat tetrahedron buffer.
///
/// A face is on the boundary when no other tetrahedron shares it. Faces keep
/// the winding of their owning element and are returned in first-seen order.
pub fn boundary_faces(tetrahedra: &[u32]) -> Vec<u32> {
    let mut counts: HashMap<[u32; 3], usize> = HashMap::new();
    let mut order: Vec<([u32; 3], [u32; 3])> = Vec::new();

    for tet in tetrahedra.chunks_exact(4) {
        for face in TET_FACES {
            let oriented = [tet[face[0]], tet[face[1]], tet[face[2]]];
            let mut key = oriented;
            key.sort_unstable();
            let count = counts.entry(key).or_insert(0);
            if *count == 0 {
                order.push((key, oriented));
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter(|(key, _)| counts.get(key) == Some(&1))
        .flat_map(|(_, oriented)| oriented)
        .collect()
}
