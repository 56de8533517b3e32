//! Procedural mesh generators for tests and benchmarks.
//!
//! These generators produce deterministic, positively oriented
//! tetrahedral meshes with outward-wound surface triangles.

use tessera_math::kinematics::signed_volume;

use crate::mesh::TetMesh;
use crate::topology::boundary_faces;

/// Generates a single right-corner tetrahedron with legs of length `edge`.
///
/// Vertices are `0`, `edge·X`, `edge·Y`, `edge·Z`; the volume is `edge³/6`.
///
/// # Example
/// ```
/// use tessera_mesh::generators::single_tetrahedron;
/// let mesh = single_tetrahedron(1.0);
/// assert_eq!(mesh.vertex_count(), 4);
/// assert_eq!(mesh.triangle_count(), 4);
/// ```
pub fn single_tetrahedron(edge: f32) -> TetMesh {
    let mut mesh = TetMesh::with_capacity(4, 1);
    for p in [[0.0, 0.0, 0.0], [edge, 0.0, 0.0], [0.0, edge, 0.0], [0.0, 0.0, edge]] {
        mesh.pos_x.push(p[0]);
        mesh.pos_y.push(p[1]);
        mesh.pos_z.push(p[2]);
    }
    mesh.tetrahedra = vec![0, 1, 2, 3];
    mesh.triangles = boundary_faces(&mesh.tetrahedra);
    mesh
}

/// Generates an axis-aligned block of `nx × ny × nz` cubes of side `cell`,
/// each split into six tetrahedra (Kuhn / Freudenthal subdivision).
///
/// The block spans `[0, nx·cell] × [0, ny·cell] × [0, nz·cell]`.
/// Every cube is split along its main diagonal, so neighboring cubes
/// share faces conformingly.
pub fn tet_block(nx: usize, ny: usize, nz: usize, cell: f32) -> TetMesh {
    let (vx, vy, vz) = (nx + 1, ny + 1, nz + 1);
    let mut mesh = TetMesh::with_capacity(vx * vy * vz, nx * ny * nz * 6);

    for k in 0..vz {
        for j in 0..vy {
            for i in 0..vx {
                mesh.pos_x.push(i as f32 * cell);
                mesh.pos_y.push(j as f32 * cell);
                mesh.pos_z.push(k as f32 * cell);
            }
        }
    }

    let index = |i: usize, j: usize, k: usize| (i + vx * (j + vy * k)) as u32;
    const AXIS_ORDERS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for order in AXIS_ORDERS {
                    // Walk from the cube's min corner to its max corner
                    let mut corner = [i, j, k];
                    let mut tet = [index(i, j, k); 4];
                    for (slot, axis) in order.into_iter().enumerate() {
                        corner[axis] += 1;
                        tet[slot + 1] = index(corner[0], corner[1], corner[2]);
                    }

                    let x = tet.map(|v| mesh.position_vec3(v as usize));
                    if signed_volume(&x) < 0.0 {
                        tet.swap(2, 3);
                    }
                    mesh.tetrahedra.extend_from_slice(&tet);
                }
            }
        }
    }

    mesh.triangles = boundary_faces(&mesh.tetrahedra);
    mesh
}
