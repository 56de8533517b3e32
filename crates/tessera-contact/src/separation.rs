//! Live evaluation of contact separation functions.
//!
//! Each contact type defines `C(x) = signed separation − thickness` and
//! its gradient with respect to the participating particles. Positions
//! are read at projection time, so the constraint follows the particles
//! as earlier partitions move them.

use tessera_math::proximity::{closest_segment_params, project_point_on_triangle};
use tessera_math::Vec3;

use crate::contact::{CollisionConstraint, ContactType};

/// Constraint value and per-particle gradients.
///
/// Only the first `arity` gradients are meaningful.
#[derive(Debug, Clone, Copy)]
pub struct Separation {
    /// `C(x)`. Negative means the contact is violated.
    pub value: f32,
    /// `∇ₚC` for each referenced particle.
    pub gradients: [Vec3; 4],
}

impl CollisionConstraint {
    /// Evaluates the separation against positions `x`, ordered like `indices`.
    ///
    /// Returns `None` when the geometry is degenerate (zero-area triangle,
    /// coincident points without a usable normal).
    pub fn evaluate(&self, x: &[Vec3; 4]) -> Option<Separation> {
        let hint = Vec3::from_array(self.normal);
        match self.contact_type {
            ContactType::PointPoint => {
                let d = x[0] - x[1];
                let dist = d.length();
                let n = if dist > f32::EPSILON {
                    d / dist
                } else {
                    hint.try_normalize()?
                };
                Some(Separation {
                    value: n.dot(d) - self.thickness,
                    gradients: [n, -n, Vec3::ZERO, Vec3::ZERO],
                })
            }
            ContactType::PointTriangle => {
                let proj = project_point_on_triangle(x[0], x[1], x[2], x[3])?;
                let n = proj.normal;
                let [u, v, w] = proj.barycentric;
                Some(Separation {
                    value: proj.distance - self.thickness,
                    gradients: [n, -u * n, -v * n, -w * n],
                })
            }
            ContactType::EdgeEdge => {
                let n = hint.try_normalize()?;
                let (s, t) = closest_segment_params(x[0], x[1], x[2], x[3]);
                let pa = x[0].lerp(x[1], s);
                let pb = x[2].lerp(x[3], t);
                Some(Separation {
                    value: n.dot(pa - pb) - self.thickness,
                    gradients: [(1.0 - s) * n, s * n, -(1.0 - t) * n, -t * n],
                })
            }
        }
    }
}
