//! Error type shared by the validated entry points
//!
//! Only two things can go wrong inside this crate: the caller hands over
//! something that is not a legal parameter or sample, or an internal heap
//! invariant breaks. Empty input and zero variance are ordinary results.

/// Errors returned by validated operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyticsError {
    /// A parameter or sample was rejected before entering any algorithm
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Human readable cause
        reason: InvalidReason,
    },

    /// An internal structure lost its ordering or size invariant
    #[error("internal invariant violated: {0}")]
    InvariantViolation(&'static str),
}

/// Why a parameter was rejected
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InvalidReason {
    /// Value must be strictly positive
    #[error("must be positive, got {0}")]
    NotPositive(i64),
    /// Value must not be negative
    #[error("must not be negative, got {0}")]
    Negative(f64),
    /// NaN or infinite value
    #[error("must be finite, got {value} at row {index}")]
    NotFinite {
        /// Offending value
        value: f64,
        /// Position in the input sequence
        index: usize,
    },
}

impl AnalyticsError {
    pub(crate) fn not_positive(name: &'static str, value: i64) -> Self {
        AnalyticsError::InvalidParameter {
            name,
            reason: InvalidReason::NotPositive(value),
        }
    }

    pub(crate) fn negative(name: &'static str, value: f64) -> Self {
        AnalyticsError::InvalidParameter {
            name,
            reason: InvalidReason::Negative(value),
        }
    }

    pub(crate) fn not_finite(name: &'static str, value: f64, index: usize) -> Self {
        AnalyticsError::InvalidParameter {
            name,
            reason: InvalidReason::NotFinite { value, index },
        }
    }

    /// True for errors caused by caller input
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, AnalyticsError::InvalidParameter { .. })
    }
}

/// Check a sample value, returning it unchanged when finite
#[inline]
pub(crate) fn finite(name: &'static str, value: f64, index: usize) -> Result<f64, AnalyticsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyticsError::not_finite(name, value, index))
    }
}

/// Check a threshold: NaN and negative values are rejected
pub(crate) fn threshold(name: &'static str, value: f64) -> Result<f64, AnalyticsError> {
    if value.is_nan() {
        return Err(AnalyticsError::not_finite(name, value, 0));
    }
    if value < 0.0 {
        return Err(AnalyticsError::negative(name, value));
    }
    Ok(value)
}

/// Convert a caller supplied `k` into a count of results
///
/// Request handlers usually parse `k` as a signed integer; anything below 1
/// is rejected here instead of silently becoming an empty answer.
///
/// ```
/// use tripstats::error::validate_k;
///
/// assert_eq!(validate_k(5), Ok(5));
/// assert!(validate_k(0).is_err());
/// assert!(validate_k(-3).is_err());
/// ```
pub fn validate_k(k: i64) -> Result<usize, AnalyticsError> {
    if k <= 0 {
        return Err(AnalyticsError::not_positive("k", k));
    }
    usize::try_from(k).map_err(|_| AnalyticsError::not_positive("k", k))
}
