//! Clamping and linear range mapping.
//!
//! The PID works on signals normalized to `[-1, 1]`. Both helpers tolerate
//! inverted bounds without panicking (unlike `f64::clamp`); range validity is
//! enforced once in `PidParameters::validate`.

use kenbot_common::consts::{NORMALIZED_MAX, NORMALIZED_MIN};

/// Limit `value` to `[min, max]`. NaN passes through unchanged.
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Map `value` linearly from `[from_min, from_max]` onto `[to_min, to_max]`.
///
/// A degenerate source range divides by zero and yields a non-finite result.
#[inline]
pub fn scale(value: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    let fraction = (value - from_min) / (from_max - from_min);
    to_min + fraction * (to_max - to_min)
}

/// Clamp `value` to `[min, max]` and map it onto `[-1, 1]`.
#[inline]
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    scale(clamp(value, min, max), min, max, NORMALIZED_MIN, NORMALIZED_MAX)
}

/// Clamp `value` to `[-1, 1]` and map it onto `[min, max]`.
///
/// The result is clamped again so rounding never leaves `[min, max]`.
#[inline]
pub fn denormalize(value: f64, min: f64, max: f64) -> f64 {
    let mapped = scale(
        clamp(value, NORMALIZED_MIN, NORMALIZED_MAX),
        NORMALIZED_MIN,
        NORMALIZED_MAX,
        min,
        max,
    );
    clamp(mapped, min, max)
}
