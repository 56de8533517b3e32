//! # tessera-mesh
//!
//! Tetrahedral reference mesh with Structure-of-Arrays (SoA) layout.
//!
//! ## Key Types
//!
//! - [`TetMesh`] — Rest positions, surface triangles and tetrahedra in
//!   contiguous buffers. Particle and element counts of a solver instance
//!   are derived from it.
//! - [`Topology`] — Vertex-to-element adjacency and boundary faces.
//! - Procedural generators for tests (single tetrahedron, Kuhn-split blocks).

pub mod generators;
pub mod mesh;
pub mod topology;

pub use mesh::TetMesh;
pub use topology::Topology;
