use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Takes the square root of `x`, treating negative values as zero.
///
/// Rounding can push quantities that are physically non-negative
/// (such as `v^2 + 2as` at the end of a braking zone) slightly below zero.
#[inline(always)]
pub fn safe_sqrt(x: f64) -> f64 {
    f64::max(x, 0.0).sqrt()
}

/// Computes the unsigned angle between two vectors in radians.
///
/// Returns `None` if either vector has zero length.
pub fn angle_between(u: Vector2d, v: Vector2d) -> Option<f64> {
    let mag = u.magnitude() * v.magnitude();
    if mag <= 0.0 || !mag.is_finite() {
        return None;
    }
    let cos = (u.dot(v) / mag).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// Returns true if both coordinates of the point are finite.
pub fn is_finite_point(p: Point2d) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Returns the midpoint of two points.
pub fn midpoint(p1: Point2d, p2: Point2d) -> Point2d {
    p1.midpoint(p2)
}
