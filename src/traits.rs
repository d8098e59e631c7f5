//! Core traits shared by the streaming structures
//!
//! Every retained structure implements [`Sketch`]; frequency counters add
//! [`FrequencySketch`] and [`HeavyHitters`].

use crate::error::AnalyticsError;
use core::fmt::Debug;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Error during a merge of two structures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Structures have incompatible configurations
    IncompatibleConfig {
        expected: String,
        found: String,
    },
    /// Merging would break an internal invariant
    Invariant(&'static str),
}

impl core::fmt::Display for MergeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MergeError::IncompatibleConfig { expected, found } => {
                write!(f, "incompatible config: expected {}, found {}", expected, found)
            }
            MergeError::Invariant(what) => write!(f, "invariant violated during merge: {}", what),
        }
    }
}

impl core::error::Error for MergeError {}

impl From<AnalyticsError> for MergeError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvariantViolation(what) => MergeError::Invariant(what),
            AnalyticsError::InvalidParameter { name, .. } => MergeError::IncompatibleConfig {
                expected: String::from("finite samples"),
                found: String::from(name),
            },
        }
    }
}

/// Core trait for all streaming structures
pub trait Sketch: Clone + Debug {
    /// The type of item this structure processes
    type Item: ?Sized;

    /// Add an item
    ///
    /// Malformed items are rejected rather than coerced.
    fn update(&mut self, item: &Self::Item) -> Result<(), AnalyticsError>;

    /// Merge another structure into this one
    fn merge(&mut self, other: &Self) -> Result<(), MergeError>;

    /// Reset to empty state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of items processed
    fn count(&self) -> u64;

    /// Check if nothing has been processed
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Exact frequency counters
pub trait FrequencySketch: Sketch {
    /// Frequency of an item, 0 if never seen
    fn estimate_frequency(&self, item: &Self::Item) -> u64;

    /// Check if frequency reaches threshold
    fn exceeds_threshold(&self, item: &Self::Item, threshold: u64) -> bool {
        self.estimate_frequency(item) >= threshold
    }
}

/// Heavy hitters / Top-K capability
pub trait HeavyHitters: FrequencySketch
where
    Self::Item: Sized + Clone,
{
    /// Items whose frequency is at least `threshold` of the total count
    ///
    /// Threshold is a fraction of total count (0.0 to 1.0)
    fn heavy_hitters(&self, threshold: f64) -> Vec<(Self::Item, u64)>;

    /// Top-k most frequent items, count descending
    fn top_k(&self, k: usize) -> Vec<(Self::Item, u64)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_error_from_analytics() {
        let err: MergeError = AnalyticsError::InvariantViolation("sizes").into();
        assert_eq!(err, MergeError::Invariant("sizes"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_merge_error_display() {
        let err = MergeError::IncompatibleConfig {
            expected: "window 100".into(),
            found: "window 50".into(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible config: expected window 100, found window 50"
        );
    }
}
