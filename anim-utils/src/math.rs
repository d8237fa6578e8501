//! Scalar helpers.

/// Relative float comparison with a `1e-6` tolerance scaled by the larger
/// magnitude (absolute below `1.0`).
pub fn float_eq(x: f32, y: f32) -> bool {
    const EPSILON: f32 = 0.000_001;
    (x - y).abs() <= EPSILON * 1.0_f32.max(x.abs().max(y.abs()))
}

/// Maps `value` from `[in_start, in_end]` onto `[out_start, out_end]`.
pub fn remap(value: f32, in_start: f32, in_end: f32, out_start: f32, out_end: f32) -> f32 {
    (value - in_start) / (in_end - in_start) * (out_end - out_start) + out_start
}
