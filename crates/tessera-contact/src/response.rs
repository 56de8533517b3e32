//! One-sided XPBD response for contacts.

use tessera_math::xpbd::delta_lambda;

/// Multiplier increment for an inequality constraint `C ≥ 0`.
///
/// Returns `None` when the contact is inactive (`C ≥ 0`) or every
/// participant is pinned. Otherwise the accumulated multiplier is clamped
/// at zero, so the returned increment never pulls surfaces together.
#[inline]
pub fn one_sided_delta_lambda(
    value: f32,
    lambda: f32,
    alpha_tilde: f32,
    weighted_norm_sq: f32,
    epsilon: f32,
) -> Option<f32> {
    if value >= 0.0 {
        return None;
    }
    let dl = delta_lambda(value, lambda, alpha_tilde, weighted_norm_sq, epsilon)?;
    Some((lambda + dl).max(0.0) - lambda)
}
