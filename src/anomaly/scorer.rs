//! Batch z-score scoring of trip observations
//!
//! Two passes over the batch: the first feeds one [`RunningStats`] per
//! dimension, the second standardizes every value against its dimension's
//! population mean and standard deviation.

use crate::error::{self, AnalyticsError};
use crate::math;
use crate::statistics::RunningStats;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Number of scored dimensions per observation
pub const DIMENSIONS: usize = 3;

/// Default z-score threshold
pub const DEFAULT_THRESHOLD: f64 = 2.5;

/// Default cap on the anomalies listed in an [`AnomalySummary`]
pub const DEFAULT_REPORT_LIMIT: usize = 50;

/// One metric stream of a trip observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Dimension {
    /// Average trip speed (km/h)
    Speed,
    /// Fare per unit of distance
    FarePerDistance,
    /// Trip distance (km)
    Distance,
}

impl Dimension {
    /// All dimensions, in column order
    pub const ALL: [Dimension; DIMENSIONS] = [
        Dimension::Speed,
        Dimension::FarePerDistance,
        Dimension::Distance,
    ];

    /// Column position of this dimension
    pub fn index(self) -> usize {
        match self {
            Dimension::Speed => 0,
            Dimension::FarePerDistance => 1,
            Dimension::Distance => 2,
        }
    }

    /// Stable name used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Speed => "speed",
            Dimension::FarePerDistance => "fare_per_distance",
            Dimension::Distance => "distance",
        }
    }
}

/// A trip reduced to its three scored metrics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    pub speed: f64,
    pub fare_per_distance: f64,
    pub distance: f64,
}

impl Observation {
    pub fn new(speed: f64, fare_per_distance: f64, distance: f64) -> Self {
        Self {
            speed,
            fare_per_distance,
            distance,
        }
    }

    /// Values in [`Dimension::ALL`] order
    pub fn values(&self) -> [f64; DIMENSIONS] {
        [self.speed, self.fare_per_distance, self.distance]
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        self.values()[dimension.index()]
    }
}

impl From<[f64; DIMENSIONS]> for Observation {
    fn from([speed, fare_per_distance, distance]: [f64; DIMENSIONS]) -> Self {
        Self::new(speed, fare_per_distance, distance)
    }
}

/// Scorer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScorerConfig {
    /// A row is anomalous when any |z| is strictly above this
    pub threshold: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScorerConfig {
    /// Reject negative or NaN thresholds
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        error::threshold("threshold", self.threshold).map(|_| ())
    }
}

/// Mean and spread of one dimension over the scored batch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionSummary {
    pub count: u64,
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
}

impl DimensionSummary {
    fn from_stats(stats: &RunningStats) -> Self {
        Self {
            count: stats.len(),
            mean: stats.mean(),
            stddev: stats.stddev(),
        }
    }

    /// Whether z-scores against this dimension carry any signal
    pub fn is_degenerate(&self) -> bool {
        self.count < 2 || self.stddev == 0.0
    }
}

/// One input row with its z-scores
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredObservation {
    /// 0-based position in the input batch
    pub index: usize,
    pub observation: Observation,
    /// Z-scores in [`Dimension::ALL`] order
    pub z_scores: [f64; DIMENSIONS],
    pub is_anomaly: bool,
}

impl ScoredObservation {
    pub fn z(&self, dimension: Dimension) -> f64 {
        self.z_scores[dimension.index()]
    }

    /// Dimensions whose |z| exceeds `threshold`
    pub fn flagged_dimensions(&self, threshold: f64) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL
            .into_iter()
            .filter(move |&d| math::abs(self.z(d)) > threshold)
    }
}

/// Flat anomaly row as served to the dashboard
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnomalyRecord {
    pub index: usize,
    pub speed: f64,
    pub fare_per_distance: f64,
    pub distance: f64,
    pub speed_z_score: f64,
    pub fare_per_distance_z_score: f64,
    pub distance_z_score: f64,
}

impl From<&ScoredObservation> for AnomalyRecord {
    fn from(scored: &ScoredObservation) -> Self {
        let [speed_z_score, fare_per_distance_z_score, distance_z_score] = scored.z_scores;
        Self {
            index: scored.index,
            speed: scored.observation.speed,
            fare_per_distance: scored.observation.fare_per_distance,
            distance: scored.observation.distance,
            speed_z_score,
            fare_per_distance_z_score,
            distance_z_score,
        }
    }
}

/// Result shape of an anomaly scan
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnomalySummary {
    pub total_checked: usize,
    pub threshold: f64,
    pub anomalies: Vec<AnomalyRecord>,
}

/// Everything a scan computed
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyReport {
    threshold: f64,
    dimensions: [DimensionSummary; DIMENSIONS],
    scored: Vec<ScoredObservation>,
}

impl AnomalyReport {
    /// Number of observations scored
    pub fn total_checked(&self) -> usize {
        self.scored.len()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Batch statistics of one dimension
    pub fn dimension(&self, dimension: Dimension) -> &DimensionSummary {
        &self.dimensions[dimension.index()]
    }

    /// Every observation in input order
    pub fn scored(&self) -> &[ScoredObservation] {
        &self.scored
    }

    /// Flagged observations in input order
    pub fn anomalies(&self) -> impl Iterator<Item = &ScoredObservation> + '_ {
        self.scored.iter().filter(|s| s.is_anomaly)
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }

    /// Flatten into the served shape, listing at most `limit` anomalies
    pub fn summary(&self, limit: usize) -> AnomalySummary {
        AnomalySummary {
            total_checked: self.total_checked(),
            threshold: self.threshold,
            anomalies: self.anomalies().take(limit).map(AnomalyRecord::from).collect(),
        }
    }
}

/// Batch z-score anomaly scorer
///
/// Holds only its configuration; each [`score`](Self::score) call is
/// independent. To score a sliding window, submit one batch per window.
///
/// # Example
///
/// ```
/// use tripstats::anomaly::{AnomalyScorer, Dimension, Observation};
///
/// let batch: Vec<Observation> = [10.0, 10.0, 10.0, 100.0]
///     .iter()
///     .map(|&speed| Observation::new(speed, 2.0, 5.0))
///     .collect();
///
/// let scorer = AnomalyScorer::with_threshold(1.5).unwrap();
/// let report = scorer.score(&batch).unwrap();
///
/// let flagged: Vec<usize> = report.anomalies().map(|s| s.index).collect();
/// assert_eq!(flagged, vec![3]);
/// assert_eq!(report.scored()[0].z(Dimension::FarePerDistance), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnomalyScorer {
    config: ScorerConfig,
}

impl AnomalyScorer {
    /// Create a scorer, rejecting an invalid configuration
    pub fn new(config: ScorerConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_threshold(threshold: f64) -> Result<Self, AnalyticsError> {
        Self::new(ScorerConfig { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    /// Score a batch
    ///
    /// A dimension with fewer than two observations or zero spread reports
    /// z = 0 for every row and cannot flag anything. Non-finite values
    /// reject the whole batch.
    pub fn score(&self, batch: &[Observation]) -> Result<AnomalyReport, AnalyticsError> {
        let mut stats: [RunningStats; DIMENSIONS] = Default::default();

        for (index, observation) in batch.iter().enumerate() {
            for (dimension, value) in Dimension::ALL.into_iter().zip(observation.values()) {
                let value = error::finite(dimension.name(), value, index)?;
                stats[dimension.index()].add(value);
            }
        }

        let threshold = self.config.threshold;
        let scored: Vec<ScoredObservation> = batch
            .iter()
            .enumerate()
            .map(|(index, observation)| {
                let values = observation.values();
                let z_scores: [f64; DIMENSIONS] =
                    core::array::from_fn(|d| stats[d].z_score(values[d]));
                let is_anomaly = z_scores.iter().any(|z| math::abs(*z) > threshold);
                ScoredObservation {
                    index,
                    observation: *observation,
                    z_scores,
                    is_anomaly,
                }
            })
            .collect();

        let report = AnomalyReport {
            threshold,
            dimensions: core::array::from_fn(|d| DimensionSummary::from_stats(&stats[d])),
            scored,
        };

        tracing::debug!(
            total_checked = report.total_checked(),
            anomalies = report.anomaly_count(),
            threshold,
            "anomaly scan finished"
        );
        Ok(report)
    }

    /// Score a batch and flatten it into the served shape
    pub fn scan(&self, batch: &[Observation], limit: usize) -> Result<AnomalySummary, AnalyticsError> {
        Ok(self.score(batch)?.summary(limit))
    }
}

/// Population z-scores of one column
///
/// Fewer than two values or zero spread yield all zeros.
///
/// ```
/// use tripstats::anomaly::z_scores;
///
/// let z = z_scores(&[1.0, 2.0, 3.0]).unwrap();
/// assert!((z[0] + 1.224_744_87).abs() < 1e-6);
/// assert_eq!(z[1], 0.0);
/// assert_eq!(z_scores(&[4.0, 4.0]).unwrap(), vec![0.0, 0.0]);
/// ```
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>, AnalyticsError> {
    let mut stats = RunningStats::new();
    for (index, &value) in values.iter().enumerate() {
        stats.add(error::finite("value", value, index)?);
    }
    Ok(values.iter().map(|&v| stats.z_score(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speeds(values: &[f64]) -> Vec<Observation> {
        values.iter().map(|&s| Observation::new(s, 3.0, 4.0)).collect()
    }

    #[test]
    fn test_speed_outlier() {
        let scorer = AnomalyScorer::with_threshold(1.5).unwrap();
        let report = scorer.score(&speeds(&[10.0, 10.0, 10.0, 100.0])).unwrap();

        assert_eq!(report.total_checked(), 4);
        let flagged: Vec<usize> = report.anomalies().map(|s| s.index).collect();
        assert_eq!(flagged, vec![3]);

        let speed = report.dimension(Dimension::Speed);
        assert!((speed.mean - 32.5).abs() < 1e-9);
        assert!((report.scored()[3].z(Dimension::Speed) - 67.5 / speed.stddev).abs() < 1e-9);

        let dims: Vec<Dimension> = report.scored()[3].flagged_dimensions(1.5).collect();
        assert_eq!(dims, vec![Dimension::Speed]);
    }

    #[test]
    fn test_constant_dimension_is_zero() {
        let batch: Vec<Observation> = (0..20)
            .map(|i| Observation::new(i as f64, 7.5, (i * i) as f64))
            .collect();

        for threshold in [0.0, 0.5, 2.5, 100.0] {
            let report = AnomalyScorer::with_threshold(threshold).unwrap().score(&batch).unwrap();
            assert!(report.dimension(Dimension::FarePerDistance).is_degenerate());
            assert!(report
                .scored()
                .iter()
                .all(|s| s.z(Dimension::FarePerDistance) == 0.0));
        }
    }

    #[test]
    fn test_empty_batch() {
        let report = AnomalyScorer::default().score(&[]).unwrap();
        assert_eq!(report.total_checked(), 0);
        assert_eq!(report.anomaly_count(), 0);

        let summary = report.summary(DEFAULT_REPORT_LIMIT);
        assert_eq!(summary.total_checked, 0);
        assert!(summary.anomalies.is_empty());
        assert_eq!(summary.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_single_observation() {
        let report = AnomalyScorer::with_threshold(0.0)
            .unwrap()
            .score(&[Observation::new(1e6, -3.0, 0.5)])
            .unwrap();
        assert_eq!(report.scored()[0].z_scores, [0.0; DIMENSIONS]);
        assert!(!report.scored()[0].is_anomaly);
    }

    #[test]
    fn test_order_and_index_follow_input() {
        let batch = speeds(&[5.0, 6.0, 7.0, 8.0]);
        let report = AnomalyScorer::default().score(&batch).unwrap();
        for (i, scored) in report.scored().iter().enumerate() {
            assert_eq!(scored.index, i);
            assert_eq!(scored.observation, batch[i]);
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        // z of +/-1 for every row
        let report = AnomalyScorer::with_threshold(1.0)
            .unwrap()
            .score(&speeds(&[0.0, 2.0]))
            .unwrap();
        assert!((report.scored()[0].z(Dimension::Speed) + 1.0).abs() < 1e-12);
        assert_eq!(report.anomaly_count(), 0);
    }

    #[test]
    fn test_idempotent() {
        let batch = speeds(&[1.0, 2.0, 50.0, 3.0, 2.0, 1.0, 2.0, 3.0]);
        let scorer = AnomalyScorer::with_threshold(2.0).unwrap();
        assert_eq!(scorer.score(&batch).unwrap(), scorer.score(&batch).unwrap());
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        assert!(AnomalyScorer::with_threshold(-1.0).unwrap_err().is_invalid_parameter());
        assert!(AnomalyScorer::with_threshold(f64::NAN).is_err());
        assert_eq!(AnomalyScorer::default().threshold(), 2.5);
    }

    #[test]
    fn test_rejects_non_finite_value() {
        let mut batch = speeds(&[1.0, 2.0, 3.0]);
        batch[1].distance = f64::NAN;

        let err = AnomalyScorer::default().score(&batch).unwrap_err();
        match err {
            AnalyticsError::InvalidParameter {
                name,
                reason: crate::error::InvalidReason::NotFinite { value, index },
            } => {
                assert_eq!(name, "distance");
                assert!(value.is_nan());
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_summary_limit() {
        let mut values = vec![10.0; 200];
        for i in (0..200).step_by(20) {
            values[i] = 1_000.0;
        }
        let summary = AnomalyScorer::default()
            .scan(&speeds(&values), 3)
            .unwrap();

        assert_eq!(summary.total_checked, 200);
        assert_eq!(summary.anomalies.len(), 3);
        assert_eq!(summary.anomalies[0].index, 0);
        assert_eq!(summary.anomalies[1].index, 20);
        assert!(summary.anomalies[0].speed_z_score > 2.5);
        assert_eq!(summary.anomalies[0].distance_z_score, 0.0);
    }

    #[test]
    fn test_column_z_scores() {
        assert!(z_scores(&[]).unwrap().is_empty());
        assert_eq!(z_scores(&[9.0]).unwrap(), vec![0.0]);
        assert!(z_scores(&[1.0, f64::INFINITY]).is_err());
    }
}
