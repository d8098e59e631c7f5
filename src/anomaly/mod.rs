//! Z-score anomaly detection
//!
//! - [`AnomalyScorer`]: stateless two-pass scoring of a batch of
//!   [`Observation`]s (speed, fare per distance, distance)
//! - [`RollingDetector`]: stateful scoring of one metric against a sliding
//!   window of its recent values
//!
//! Standard deviations are population deviations (divisor `n`). A dimension
//! with fewer than two values or no spread contributes z = 0.
//!
//! # Example
//!
//! ```
//! use tripstats::anomaly::{AnomalyScorer, Observation, DEFAULT_REPORT_LIMIT};
//!
//! let trips = vec![
//!     Observation::new(24.0, 2.1, 3.2),
//!     Observation::new(26.5, 2.3, 4.0),
//!     Observation::new(23.1, 2.2, 2.9),
//!     Observation::new(25.0, 2.0, 3.5),
//! ];
//!
//! let summary = AnomalyScorer::default()
//!     .scan(&trips, DEFAULT_REPORT_LIMIT)
//!     .unwrap();
//!
//! assert_eq!(summary.total_checked, 4);
//! assert_eq!(summary.threshold, 2.5);
//! assert!(summary.anomalies.is_empty());
//! ```

mod rolling;
mod scorer;

pub use rolling::{RollingConfig, RollingDetector};
pub use scorer::{
    z_scores, AnomalyRecord, AnomalyReport, AnomalyScorer, AnomalySummary, Dimension,
    DimensionSummary, Observation, ScoredObservation, ScorerConfig, DEFAULT_REPORT_LIMIT,
    DEFAULT_THRESHOLD, DIMENSIONS,
};
