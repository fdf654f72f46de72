//! Math type aliases and helper functions.

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// Normalize `v`, returning `None` when the result would not be finite.
///
/// A zero-length vector (or one whose squared length underflows to zero)
/// has no direction, so there is nothing meaningful to return.
pub fn try_normalize(v: &Vec3) -> Option<Vec3> {
    let len_sq = v.norm_squared();
    if len_sq == 0.0 || !len_sq.is_finite() {
        return None;
    }
    let n = *v / len_sq.sqrt();
    if n.iter().all(|c| c.is_finite()) {
        Some(n)
    } else {
        None
    }
}

/// Bit-exact key for a position.
///
/// Two positions map to the same key iff every coordinate has the same bit
/// pattern, except that `-0.0` is folded onto `+0.0`.
pub fn position_key(v: &Vec3) -> [u32; 3] {
    [canonical_bits(v.x), canonical_bits(v.y), canonical_bits(v.z)]
}

fn canonical_bits(c: f32) -> u32 {
    if c == 0.0 { 0 } else { c.to_bits() }
}

/// Component-wise approximate equality, for tests and diagnostics.
pub fn approx_eq(a: &Vec3, b: &Vec3, eps: f32) -> bool {
    (a - b).amax() <= eps
}
