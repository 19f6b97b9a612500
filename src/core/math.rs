//! Vector and Force Helpers
//!
//! Thin layer over `glam` for the handful of vector operations the
//! knockback and movement code need. The important property is that a
//! degenerate direction never turns into a NaN impulse: every function
//! that normalizes returns `Option`.

use glam::{Vec2, Vec3};

/// Vectors shorter than this are treated as zero length.
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// Unit direction from `from` towards `to`.
///
/// Returns `None` when the two points coincide.
#[inline]
pub fn push_direction(from: Vec3, to: Vec3) -> Option<Vec3> {
    let delta = to - from;
    if delta.length_squared() <= DIRECTION_EPSILON * DIRECTION_EPSILON {
        return None;
    }
    delta.try_normalize()
}

/// Combine a push direction with an upward lift and scale to `magnitude`.
///
/// `normalize(direction + up * lift) * magnitude`. Returns `None` if the
/// combined vector is degenerate (e.g. pushing straight down with a lift of 1).
#[inline]
pub fn compose_impulse(direction: Vec3, upward_lift: f32, magnitude: f32) -> Option<Vec3> {
    (direction + Vec3::Y * upward_lift)
        .try_normalize()
        .map(|dir| dir * magnitude)
}

/// Map a 2D stick/keyboard vector onto the XZ plane.
///
/// Stick "up" (+y) is world forward (+z).
#[inline]
pub fn flat_direction(input: Vec2) -> Vec3 {
    Vec3::new(input.x, 0.0, input.y)
}

/// Linear interpolation between two scalars.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
