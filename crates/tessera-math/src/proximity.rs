//! Closest-point queries for contact constraints.
//!
//! Contact constraints are evaluated live against current particle
//! positions. These helpers return the geometric quantities the
//! separation functions need: a normal, a signed distance, and
//! interpolation weights for distributing the gradient.

use glam::Vec3;
use tessera_types::constants::DEGENERATE_AREA_THRESHOLD;

/// Projection of a point onto a triangle's supporting plane.
#[derive(Debug, Clone, Copy)]
pub struct TriangleProjection {
    /// Unit normal `(b-a) × (c-a)`, following the triangle winding.
    pub normal: Vec3,
    /// Signed distance of the point along `normal`.
    pub distance: f32,
    /// Barycentric weights `(u, v, w)` of the closest point, clamped to
    /// the triangle and renormalized to sum to one.
    pub barycentric: [f32; 3],
}

/// Projects `p` onto triangle `(a, b, c)`.
///
/// Returns `None` for degenerate triangles.
pub fn project_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<TriangleProjection> {
    let ab = b - a;
    let ac = c - a;
    let n = ab.cross(ac);
    let area2 = n.length();
    if area2 < DEGENERATE_AREA_THRESHOLD {
        return None;
    }
    let normal = n / area2;
    let ap = p - a;
    let distance = ap.dot(normal);

    // Barycentric coordinates of the in-plane projection (Cramer's rule)
    let projected = ap - normal * distance;
    let d00 = ab.dot(ab);
    let d01 = ab.dot(ac);
    let d11 = ac.dot(ac);
    let d20 = projected.dot(ab);
    let d21 = projected.dot(ac);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < DEGENERATE_AREA_THRESHOLD {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    let clamped = [u.max(0.0), v.max(0.0), w.max(0.0)];
    let sum = clamped[0] + clamped[1] + clamped[2];
    let barycentric = if sum > 0.0 {
        [clamped[0] / sum, clamped[1] / sum, clamped[2] / sum]
    } else {
        [1.0 / 3.0; 3]
    };

    Some(TriangleProjection {
        normal,
        distance,
        barycentric,
    })
}

/// Parameters `(s, t)` of the closest points `p0 + s(p1-p0)` and
/// `q0 + t(q1-q0)` between two segments, both clamped to `[0, 1]`.
pub fn closest_segment_params(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> (f32, f32) {
    let eps = f32::EPSILON;
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= eps && e <= eps {
        return (0.0, 0.0);
    }
    if a <= eps {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }

    let c = d1.dot(r);
    if e <= eps {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }

    let b = d1.dot(d2);
    let denom = a * e - b * b;
    // Parallel segments: any s works, start from p0
    let mut s = if denom > eps {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (b * s + f) / e;

    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}
