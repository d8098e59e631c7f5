//! Math function wrappers for std/no_std compatibility
//!
//! Uses standard library math when available, falls back to libm for no_std.

#[cfg(feature = "std")]
#[inline]
pub fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}

#[cfg(feature = "std")]
#[inline]
pub fn abs(x: f64) -> f64 {
    x.abs()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn abs(x: f64) -> f64 {
    libm::fabs(x)
}

/// Standardized deviation of `value`, 0 when the spread is degenerate
///
/// A zero (or non-finite) standard deviation never divides; callers treat
/// the dimension as carrying no signal.
#[inline]
pub fn z_score(value: f64, mean: f64, stddev: f64) -> f64 {
    if stddev > 0.0 && stddev.is_finite() {
        (value - mean) / stddev
    } else {
        0.0
    }
}
