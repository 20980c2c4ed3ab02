// ==============================================================================
// math.rs — PLANAR VECTOR HELPERS
// ------------------------------------------------------------------------------
// Vec2 is nalgebra's Vector2<f64> (value semantics, +, -, neg, scalar *).
// The helpers here cover the pieces the simulation needs on top of it:
// - heading(deg): unit vector at an angle in degrees (0° = +X, CCW in math
//   coordinates, clockwise on a y-down screen)
// - wrap_degrees(): normalize into [0, 360)
// - signed_angle(from, to): atan2(cross, dot), radians in (-π, π]
// - normalize(): checked, fails on zero length instead of producing NaN
// ==============================================================================

use nalgebra::Vector2;

use crate::error::{Result, SimError};

pub type Vec2 = Vector2<f64>;

/// Below this length a vector is treated as zero.
pub const EPSILON: f64 = 1e-9;

#[inline]
pub fn vec2(x: f64, y: f64) -> Vec2 {
    Vec2::new(x, y)
}

#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

#[inline]
pub fn is_zero(v: &Vec2) -> bool {
    v.norm_squared() <= EPSILON * EPSILON
}

/// Unit vector pointing at `degrees`.
#[inline]
pub fn heading(degrees: f64) -> Vec2 {
    let rad = degrees.to_radians();
    vec2(rad.cos(), rad.sin())
}

/// Wraps an angle in degrees into `[0, 360)`.
#[inline]
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed angle in radians that rotates `from` onto `to`.
#[inline]
pub fn signed_angle(from: &Vec2, to: &Vec2) -> f64 {
    cross(from, to).atan2(from.dot(to))
}

/// Rotates `v` counter-clockwise (math convention) by `radians`.
#[inline]
pub fn rotate(v: &Vec2, radians: f64) -> Vec2 {
    let (s, c) = radians.sin_cos();
    vec2(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Checked normalize. Callers that can see a stationary vehicle must guard
/// with [`is_zero`] first or handle the error.
pub fn normalize(v: &Vec2) -> Result<Vec2> {
    v.try_normalize(EPSILON).ok_or(SimError::ZeroLengthVector)
}

/// Closest point to `p` on the segment `a..b`.
pub fn closest_point_on_segment(p: &Vec2, a: &Vec2, b: &Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
