//! Scalar XPBD multiplier updates.
//!
//! For a constraint `C` with compliance `α̃ = α / h²`, accumulated
//! multiplier `λ` and weighted gradient norm `Σ w‖∇C‖²`:
//!
//! `Δλ = −(C + α̃λ) / (Σ w‖∇C‖² + α̃)`

/// Single-constraint multiplier increment.
///
/// Returns `None` when the denominator falls below `epsilon`, which happens
/// when every participant is pinned and the constraint is rigid.
#[inline]
pub fn delta_lambda(
    value: f32,
    lambda: f32,
    alpha_tilde: f32,
    weighted_norm_sq: f32,
    epsilon: f32,
) -> Option<f32> {
    let denom = weighted_norm_sq + alpha_tilde;
    if denom < epsilon || !denom.is_finite() {
        return None;
    }
    Some(-(value + alpha_tilde * lambda) / denom)
}

/// Smallest `det / (a₁₁ a₂₂)` accepted by [`coupled_delta_lambda`].
pub const COUPLED_RELATIVE_TOLERANCE: f64 = 1e-12;

/// Two constraints sharing particles, solved together.
///
/// `a₁₁ = Σw∇C₁·∇C₁ + α̃₁`, `a₁₂ = Σw∇C₁·∇C₂`, `a₂₂ = Σw∇C₂·∇C₂ + α̃₂`
/// and `b = [−(C₁ + α̃₁λ₁), −(C₂ + α̃₂λ₂)]`.
///
/// Entries are taken in `f64`: gradients of the two constraints are often
/// nearly parallel, which makes an `f32` determinant cancel.
/// Returns `None` when the system is singular to working precision.
#[inline]
pub fn coupled_delta_lambda(a11: f64, a12: f64, a22: f64, b: [f64; 2]) -> Option<[f32; 2]> {
    let [b1, b2] = b;
    let det = a11 * a22 - a12 * a12;
    let scale = a11 * a22;
    if !det.is_finite() || scale <= 0.0 || det <= COUPLED_RELATIVE_TOLERANCE * scale {
        return None;
    }
    Some([
        ((a22 * b1 - a12 * b2) / det) as f32,
        ((a11 * b2 - a12 * b1) / det) as f32,
    ])
}
