//! Exact streaming median over two heaps
//!
//! The lower half of the samples lives in a max-heap, the upper half in a
//! min-heap. Every lower sample is ≤ every upper sample and the lower heap
//! holds the extra sample when the count is odd, so the median is always
//! readable from the two tops.

use crate::error::{self, AnalyticsError};
use crate::traits::{MergeError, Sketch};
use core::cmp::{Ordering, Reverse};

#[cfg(feature = "std")]
use std::{collections::BinaryHeap, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{collections::BinaryHeap, vec::Vec};

/// A finite sample with a total order
#[derive(Clone, Copy, Debug, PartialEq)]
struct Sample(f64);

impl Eq for Sample {}

impl PartialOrd for Sample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sample {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Streaming median with O(log n) insertion and O(1) reads
///
/// Correct after every insertion, not only at the end of a batch. This is
/// the one structure meant to be kept across calls; it is not internally
/// synchronized, so share it behind a lock if several threads feed it.
///
/// # Example
///
/// ```
/// use tripstats::quantiles::StreamingMedian;
///
/// let mut median = StreamingMedian::new();
/// let mut seen = Vec::new();
///
/// for value in [5.0, 2.0, 8.0, 1.0] {
///     median.insert(value).unwrap();
///     seen.push(median.median().unwrap());
/// }
///
/// assert_eq!(seen, vec![5.0, 3.5, 5.0, 3.5]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StreamingMedian {
    /// Max-heap: lower half, holds the extra sample on odd counts
    lower: BinaryHeap<Sample>,
    /// Min-heap: upper half
    upper: BinaryHeap<Reverse<Sample>>,
}

impl StreamingMedian {
    /// Create an empty estimator
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an estimator from a batch of samples
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Result<Self, AnalyticsError> {
        let mut median = Self::new();
        for value in values {
            median.insert(value)?;
        }
        Ok(median)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.lower.len() + self.upper.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Add one sample
    ///
    /// NaN and infinities are rejected. If the heaps are found out of
    /// order afterwards the insertion fails with
    /// [`AnalyticsError::InvariantViolation`].
    pub fn insert(&mut self, value: f64) -> Result<(), AnalyticsError> {
        let value = error::finite("value", value, self.len())?;
        let sample = Sample(value);

        match self.lower.peek() {
            Some(top) if sample > *top => self.upper.push(Reverse(sample)),
            _ => self.lower.push(sample),
        }

        self.rebalance();
        self.check_invariant()
    }

    fn rebalance(&mut self) {
        while self.lower.len() > self.upper.len() + 1 {
            match self.lower.pop() {
                Some(top) => self.upper.push(Reverse(top)),
                None => break,
            }
        }
        while self.upper.len() > self.lower.len() {
            match self.upper.pop() {
                Some(Reverse(top)) => self.lower.push(top),
                None => break,
            }
        }
    }

    fn check_invariant(&self) -> Result<(), AnalyticsError> {
        let (lo, hi) = (self.lower.len(), self.upper.len());
        if lo != hi && lo != hi + 1 {
            tracing::error!(lower = lo, upper = hi, "median heaps out of balance");
            return Err(AnalyticsError::InvariantViolation("median heap sizes out of balance"));
        }
        if let (Some(low_top), Some(Reverse(high_top))) = (self.lower.peek(), self.upper.peek()) {
            if low_top > high_top {
                tracing::error!(
                    lower_top = low_top.0,
                    upper_top = high_top.0,
                    "median heaps overlap"
                );
                return Err(AnalyticsError::InvariantViolation("median heaps overlap"));
            }
        }
        Ok(())
    }

    /// Current median, `None` before the first sample
    ///
    /// Odd counts return the middle sample; even counts return the mean of
    /// the two middle samples.
    pub fn median(&self) -> Option<f64> {
        let low = self.lower.peek()?.0;
        if self.lower.len() > self.upper.len() {
            return Some(low);
        }
        let Reverse(high) = self.upper.peek()?;
        let mid = (low + high.0) / 2.0;
        if mid.is_finite() {
            Some(mid)
        } else {
            // The sum overflowed; halve first
            Some(low / 2.0 + high.0 / 2.0)
        }
    }

    /// All samples, in no particular order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.lower
            .iter()
            .map(|s| s.0)
            .chain(self.upper.iter().map(|Reverse(s)| s.0))
    }
}

impl Sketch for StreamingMedian {
    type Item = f64;

    fn update(&mut self, item: &f64) -> Result<(), AnalyticsError> {
        self.insert(*item)
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        for value in other.values() {
            self.insert(value)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.lower.clear();
        self.upper.clear();
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + (self.lower.capacity() + self.upper.capacity()) * core::mem::size_of::<Sample>()
    }

    fn count(&self) -> u64 {
        self.len() as u64
    }
}

/// Median of a batch, `None` for an empty batch
///
/// ```
/// use tripstats::quantiles::median_of;
///
/// assert_eq!(median_of([3.0, 1.0, 2.0]).unwrap(), Some(2.0));
/// assert_eq!(median_of(Vec::new()).unwrap(), None);
/// assert!(median_of([1.0, f64::NAN]).is_err());
/// ```
pub fn median_of<I: IntoIterator<Item = f64>>(values: I) -> Result<Option<f64>, AnalyticsError> {
    let median = StreamingMedian::from_values(values)?;
    tracing::debug!(samples = median.len(), median = ?median.median(), "median computed");
    Ok(median.median())
}

#[cfg(feature = "serde")]
impl serde::Serialize for StreamingMedian {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let lower: Vec<f64> = self.lower.iter().map(|s| s.0).collect();
        let upper: Vec<f64> = self.upper.iter().map(|Reverse(s)| s.0).collect();

        let mut state = serializer.serialize_struct("StreamingMedian", 2)?;
        state.serialize_field("lower", &lower)?;
        state.serialize_field("upper", &upper)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StreamingMedian {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct MedianData {
            lower: Vec<f64>,
            upper: Vec<f64>,
        }

        let data = MedianData::deserialize(deserializer)?;
        StreamingMedian::from_values(data.lower.into_iter().chain(data.upper))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }

    #[test]
    fn test_prefix_medians() {
        let mut median = StreamingMedian::new();
        let mut seen = Vec::new();
        for value in [5.0, 2.0, 8.0, 1.0] {
            median.insert(value).unwrap();
            seen.push(median.median().unwrap());
        }
        assert_eq!(seen, vec![5.0, 3.5, 5.0, 3.5]);
    }

    #[test]
    fn test_empty() {
        let median = StreamingMedian::new();
        assert!(median.is_empty());
        assert_eq!(median.median(), None);
        assert_eq!(median.len(), 0);
    }

    #[test]
    fn test_single_value() {
        let mut median = StreamingMedian::new();
        median.insert(42.0).unwrap();
        assert_eq!(median.median(), Some(42.0));
    }

    #[test]
    fn test_matches_sort_every_prefix() {
        let values: Vec<f64> = (0..300)
            .map(|i| ((i * 7_919) % 211) as f64 - 100.0 + (i % 3) as f64 * 0.25)
            .collect();

        let mut median = StreamingMedian::new();
        for (i, &value) in values.iter().enumerate() {
            median.insert(value).unwrap();
            assert_eq!(median.median(), sorted_median(&values[..=i]), "prefix {}", i + 1);
        }
    }

    #[test]
    fn test_duplicates() {
        let median = StreamingMedian::from_values([7.0; 9]).unwrap();
        assert_eq!(median.median(), Some(7.0));
        assert_eq!(median.len(), 9);
    }

    #[test]
    fn test_sizes_stay_balanced() {
        let mut median = StreamingMedian::new();
        for i in 0..100 {
            median.insert(-(i as f64)).unwrap();
            assert!(median.lower.len() == median.upper.len() || median.lower.len() == median.upper.len() + 1);
        }
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut median = StreamingMedian::new();
        median.insert(1.0).unwrap();

        let err = median.insert(f64::NAN).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(median.insert(f64::INFINITY).is_err());
        assert_eq!(median.len(), 1);
        assert_eq!(median.median(), Some(1.0));
    }

    #[test]
    fn test_merge() {
        let mut m1 = StreamingMedian::from_values([1.0, 9.0, 3.0]).unwrap();
        let m2 = StreamingMedian::from_values([4.0, 7.0]).unwrap();

        m1.merge(&m2).unwrap();

        assert_eq!(m1.len(), 5);
        assert_eq!(m1.median(), Some(4.0));
    }

    #[test]
    fn test_clear() {
        let mut median = StreamingMedian::from_values([1.0, 2.0]).unwrap();
        median.clear();
        assert!(median.is_empty());
        assert_eq!(median.median(), None);
    }

    #[test]
    fn test_even_median_near_max() {
        let median = StreamingMedian::from_values([1.0e308, 1.7e308]).unwrap();
        let m = median.median().unwrap();
        assert!(m.is_finite());
        assert!((m - 1.35e308).abs() <= 1.35e308 * 1e-12);

        let extremes = StreamingMedian::from_values([f64::MAX, f64::MAX]).unwrap();
        assert_eq!(extremes.median(), Some(f64::MAX));

        let spread = StreamingMedian::from_values([-f64::MAX, f64::MAX]).unwrap();
        assert_eq!(spread.median(), Some(0.0));
    }

    #[test]
    fn test_median_of() {
        assert_eq!(median_of([10.0, 30.0, 20.0, 40.0]).unwrap(), Some(25.0));
        assert_eq!(median_of(core::iter::empty()).unwrap(), None);
    }
}
