//! Tetrahedron kinematics for constraint-based elasticity.
//!
//! For a tetrahedron with nodes x0..x3 the edge matrix is
//! `Ds = [x1-x0, x2-x0, x3-x0]` and the deformation gradient is
//! `F = Ds · Dm⁻¹`, where `Dm` is the edge matrix at rest.
//!
//! A scalar constraint `C(F)` has per-node gradients obtained by the
//! chain rule: `[∇₁C, ∇₂C, ∇₃C] = (∂C/∂F) · Dm⁻ᵀ` and `∇₀C = -(∇₁C + ∇₂C + ∇₃C)`.

use glam::{Mat3, Vec3};
use tessera_types::constants::DEGENERATE_VOLUME_THRESHOLD;

/// Precomputed rest-state data for one tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestShape {
    /// Inverse of the rest edge matrix `Dm`.
    pub dm_inv: Mat3,
    /// Unsigned rest volume.
    pub volume: f32,
}

/// Edge matrix `[x1-x0, x2-x0, x3-x0]`.
#[inline]
pub fn edge_matrix(x: &[Vec3; 4]) -> Mat3 {
    Mat3::from_cols(x[1] - x[0], x[2] - x[0], x[3] - x[0])
}

/// Signed volume of a tetrahedron (positive for right-handed node order).
#[inline]
pub fn signed_volume(x: &[Vec3; 4]) -> f32 {
    edge_matrix(x).determinant() / 6.0
}

/// Computes the rest shape of a tetrahedron.
///
/// Returns `None` when the element is degenerate (flat or collapsed),
/// since `Dm` is then not invertible.
pub fn rest_shape(x: &[Vec3; 4]) -> Option<RestShape> {
    let dm = edge_matrix(x);
    let det = dm.determinant();
    let volume = det.abs() / 6.0;
    if !volume.is_finite() || volume < DEGENERATE_VOLUME_THRESHOLD {
        return None;
    }
    Some(RestShape {
        dm_inv: dm.inverse(),
        volume,
    })
}

/// Deformation gradient `F = Ds · Dm⁻¹`.
#[inline]
pub fn deformation_gradient(x: &[Vec3; 4], dm_inv: Mat3) -> Mat3 {
    edge_matrix(x) * dm_inv
}

/// Cofactor matrix of `F`, which equals `∂det(F)/∂F`.
#[inline]
pub fn cofactor(f: Mat3) -> Mat3 {
    Mat3::from_cols(
        f.y_axis.cross(f.z_axis),
        f.z_axis.cross(f.x_axis),
        f.x_axis.cross(f.y_axis),
    )
}

/// Squared Frobenius norm `tr(FᵀF)`.
#[inline]
pub fn frobenius_norm_sq(f: Mat3) -> f32 {
    f.x_axis.length_squared() + f.y_axis.length_squared() + f.z_axis.length_squared()
}

/// Maps `∂C/∂F` to the gradient with respect to each of the four nodes.
pub fn node_gradients(dc_df: Mat3, dm_inv: Mat3) -> [Vec3; 4] {
    let h = dc_df * dm_inv.transpose();
    let g1 = h.x_axis;
    let g2 = h.y_axis;
    let g3 = h.z_axis;
    [-(g1 + g2 + g3), g1, g2, g3]
}
