//! Windowed anomaly detection over a single metric stream
//!
//! Keeps the last `window_size` values and their mean/M2. Eviction uses the
//! inverse Welford step, so each observation costs O(1).

use crate::error::{self, AnalyticsError};
use crate::math;

#[cfg(feature = "std")]
use std::{collections::VecDeque, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{collections::VecDeque, vec::Vec};

/// Rolling detector configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RollingConfig {
    /// Number of most recent values the statistics cover
    pub window_size: usize,
    /// Flag when |z| is strictly above this
    pub threshold: f64,
    /// No value is flagged until the window holds this many
    pub min_samples: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            threshold: super::DEFAULT_THRESHOLD,
            min_samples: 3,
        }
    }
}

impl RollingConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.window_size == 0 {
            return Err(AnalyticsError::not_positive("window_size", 0));
        }
        if self.min_samples == 0 {
            return Err(AnalyticsError::not_positive("min_samples", 0));
        }
        error::threshold("threshold", self.threshold)?;
        Ok(())
    }
}

/// Stateful z-score detector over a sliding window
///
/// Each observed value is scored against the window it just joined, using
/// the population standard deviation of that window.
///
/// # Example
///
/// ```
/// use tripstats::anomaly::{RollingConfig, RollingDetector};
///
/// let mut detector = RollingDetector::new(RollingConfig {
///     window_size: 10,
///     threshold: 2.0,
///     min_samples: 3,
/// })
/// .unwrap();
///
/// for fare in [10.0, 11.0, 9.0, 12.0, 10.0, 11.0, 9.0, 10.0] {
///     assert!(!detector.observe(fare).unwrap());
/// }
/// assert!(detector.observe(60.0).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct RollingDetector {
    config: RollingConfig,
    window: VecDeque<f64>,
    mean: f64,
    m2: f64,
    /// Values observed since creation or the last clear
    observed: u64,
}

impl RollingDetector {
    pub fn new(config: RollingConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self {
            config,
            window: VecDeque::new(),
            mean: 0.0,
            m2: 0.0,
            observed: 0,
        })
    }

    pub fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// Values currently in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Total values observed
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Window mean, 0 when empty
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation of the window
    pub fn stddev(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        math::sqrt(self.m2.max(0.0) / self.window.len() as f64)
    }

    /// Z-score of `value` against the current window
    ///
    /// 0 until the window holds `min_samples` (and at least two) values, or
    /// when the window has no spread.
    pub fn z_score(&self, value: f64) -> f64 {
        let n = self.window.len();
        if n < self.config.min_samples.max(2) {
            return 0.0;
        }
        math::z_score(value, self.mean, self.stddev())
    }

    /// Push a value and report whether it is anomalous
    pub fn observe(&mut self, value: f64) -> Result<bool, AnalyticsError> {
        let value = error::finite("value", value, self.observed as usize)?;

        if self.window.len() == self.config.window_size {
            if let Some(oldest) = self.window.pop_front() {
                self.remove(oldest);
            }
        }
        self.window.push_back(value);
        self.push(value);
        self.observed += 1;

        // Bound drift from repeated add/remove pairs
        if self.observed % (self.config.window_size as u64).saturating_mul(16) == 0 {
            self.resync();
        }

        let z = self.z_score(value);
        let flagged = math::abs(z) > self.config.threshold;
        if flagged {
            tracing::trace!(value, z, mean = self.mean, "rolling anomaly");
        }
        Ok(flagged)
    }

    /// Observe every value, returning the positions that were flagged
    pub fn observe_all<I: IntoIterator<Item = f64>>(&mut self, values: I) -> Result<Vec<usize>, AnalyticsError> {
        let mut flagged = Vec::new();
        for (i, value) in values.into_iter().enumerate() {
            if self.observe(value)? {
                flagged.push(i);
            }
        }
        tracing::debug!(flagged = flagged.len(), window = self.len(), "rolling scan finished");
        Ok(flagged)
    }

    /// Drop all state, keeping the configuration
    pub fn clear(&mut self) {
        self.window.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
        self.observed = 0;
    }

    fn push(&mut self, value: f64) {
        let n = self.window.len() as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);
    }

    /// Inverse Welford step; `window` no longer holds `value`
    fn remove(&mut self, value: f64) {
        let n = self.window.len();
        if n == 0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let old_mean = self.mean;
        self.mean -= (value - old_mean) / n as f64;
        self.m2 -= (value - old_mean) * (value - self.mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    fn resync(&mut self) {
        let mut count = 0.0;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for &value in &self.window {
            count += 1.0;
            let delta = value - mean;
            mean += delta / count;
            m2 += delta * (value - mean);
        }
        self.mean = mean;
        self.m2 = m2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::RunningStats;

    fn detector(window_size: usize, threshold: f64) -> RollingDetector {
        RollingDetector::new(RollingConfig {
            window_size,
            threshold,
            min_samples: 3,
        })
        .unwrap()
    }

    #[test]
    fn test_steady_stream_not_flagged() {
        let mut d = RollingDetector::new(RollingConfig {
            threshold: 2.0,
            ..RollingConfig::default()
        })
        .unwrap();
        let flagged = d
            .observe_all([10.0, 11.0, 9.0, 12.0, 10.0, 11.0, 9.0, 10.0])
            .unwrap();
        assert!(flagged.is_empty());
        assert_eq!(d.len(), 8);
    }

    #[test]
    fn test_spike_flagged() {
        let mut d = detector(20, 2.5);
        let mut values = vec![5.0, 5.5, 4.5, 5.0, 5.2, 4.8, 5.1, 4.9, 5.0, 5.3];
        values.push(40.0);
        let flagged = d.observe_all(values).unwrap();
        assert_eq!(flagged, vec![10]);
    }

    #[test]
    fn test_min_samples() {
        let mut d = detector(10, 0.0);
        assert!(!d.observe(1.0).unwrap());
        assert!(!d.observe(100.0).unwrap());
        // third value reaches min_samples
        assert!(d.observe(1_000.0).unwrap());
    }

    #[test]
    fn test_constant_window_never_flags() {
        let mut d = detector(5, 0.0);
        for _ in 0..20 {
            assert!(!d.observe(3.0).unwrap());
        }
        assert_eq!(d.stddev(), 0.0);
    }

    #[test]
    fn test_window_eviction_matches_batch() {
        let mut d = detector(7, 2.5);
        let values: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 * 0.5 + 1e6).collect();

        for (i, &value) in values.iter().enumerate() {
            d.observe(value).unwrap();
            let start = (i + 1).saturating_sub(7);
            let batch = RunningStats::from_values(values[start..=i].iter().copied());
            assert_eq!(d.len(), i + 1 - start);
            assert!((d.mean() - batch.mean()).abs() < 1e-6, "mean at {}", i);
            assert!((d.stddev() - batch.stddev()).abs() < 1e-4, "stddev at {}", i);
        }
    }

    #[test]
    fn test_invalid_config() {
        let bad_window = RollingConfig {
            window_size: 0,
            ..RollingConfig::default()
        };
        assert!(RollingDetector::new(bad_window).unwrap_err().is_invalid_parameter());

        let bad_threshold = RollingConfig {
            threshold: -2.0,
            ..RollingConfig::default()
        };
        assert!(RollingDetector::new(bad_threshold).is_err());

        let bad_min = RollingConfig {
            min_samples: 0,
            ..RollingConfig::default()
        };
        assert!(RollingDetector::new(bad_min).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut d = detector(4, 2.5);
        d.observe(1.0).unwrap();
        assert!(d.observe(f64::NAN).is_err());
        assert_eq!(d.len(), 1);
        assert_eq!(d.observed(), 1);
    }

    #[test]
    fn test_unbounded_window() {
        let mut d = RollingDetector::new(RollingConfig {
            window_size: usize::MAX,
            ..RollingConfig::default()
        })
        .unwrap();
        let flagged = d.observe_all([10.0, 11.0, 9.0, 10.0, 11.0, 9.0]).unwrap();
        assert!(flagged.is_empty());
        assert_eq!(d.len(), 6);
        assert!((d.mean() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear() {
        let mut d = detector(4, 2.5);
        d.observe_all([1.0, 2.0, 3.0]).unwrap();
        d.clear();
        assert!(d.is_empty());
        assert_eq!(d.mean(), 0.0);
        assert_eq!(d.config().window_size, 4);
    }
}
