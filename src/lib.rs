//! # Tripstats
//!
//! Small, exact streaming algorithms for trip metrics.
//!
//! A dashboard query layer extracts a column of values from its record
//! store, feeds it through one of these structures and serializes what
//! comes back. Nothing here knows about HTTP, storage or charts.
//!
//! ## Features
//!
//! - **Top-K**: most frequent categories (pickup zones, hour buckets) with
//!   [`TopKSelector`]
//! - **Median**: exact median after every insertion with [`StreamingMedian`]
//! - **Anomalies**: z-score scans over speed, fare per distance and
//!   distance with [`AnomalyScorer`], or a sliding window with
//!   [`RollingDetector`]
//! - **Running statistics**: Welford mean/variance with [`RunningStats`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tripstats::prelude::*;
//!
//! // Busiest pickup zones
//! let top = top_k_of(["A", "B", "A", "C", "A", "B"], 2).unwrap();
//! assert_eq!(top, vec![("A", 3), ("B", 2)]);
//!
//! // Median speed, updated as trips arrive
//! let mut median = StreamingMedian::new();
//! for speed in [5.0, 2.0, 8.0, 1.0] {
//!     median.insert(speed).unwrap();
//! }
//! assert_eq!(median.median(), Some(3.5));
//! ```
//!
//! ## Errors
//!
//! Illegal parameters (`k <= 0`, negative thresholds, NaN or infinite
//! samples) come back as [`AnalyticsError::InvalidParameter`]. Empty input
//! is not an error: it yields an empty list or `None`.
//!
//! ## Feature Flags
//!
//! Algorithm families:
//! - `frequency` (default): Top-K selection (requires `std`)
//! - `quantiles` (default): streaming median
//! - `statistics` (default): running moments
//! - `anomaly` (default): z-score scoring, implies `statistics`
//! - `full`: all of the above plus `serde`
//!
//! Platform features:
//! - `std` (default): Standard library support; without it the crate is
//!   `no_std` + `alloc`
//! - `serde`: Serialization of configs, reports and retained structures

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod error;
pub mod traits;

mod math;

#[cfg(feature = "frequency")]
#[cfg_attr(docsrs, doc(cfg(feature = "frequency")))]
pub mod frequency;

#[cfg(feature = "quantiles")]
#[cfg_attr(docsrs, doc(cfg(feature = "quantiles")))]
pub mod quantiles;

#[cfg(feature = "statistics")]
#[cfg_attr(docsrs, doc(cfg(feature = "statistics")))]
pub mod statistics;

#[cfg(feature = "anomaly")]
#[cfg_attr(docsrs, doc(cfg(feature = "anomaly")))]
pub mod anomaly;

pub use error::AnalyticsError;

pub mod prelude {
    pub use crate::error::{validate_k, AnalyticsError};
    pub use crate::traits::*;

    #[cfg(feature = "frequency")]
    pub use crate::frequency::{top_k_of, TopKSelector};

    #[cfg(feature = "quantiles")]
    pub use crate::quantiles::{median_of, StreamingMedian};

    #[cfg(feature = "statistics")]
    pub use crate::statistics::RunningStats;

    #[cfg(feature = "anomaly")]
    pub use crate::anomaly::{
        AnomalyReport, AnomalyScorer, AnomalySummary, Observation, RollingConfig,
        RollingDetector, ScorerConfig,
    };
}

#[cfg(feature = "frequency")]
pub use frequency::TopKSelector;

#[cfg(feature = "quantiles")]
pub use quantiles::StreamingMedian;

#[cfg(feature = "statistics")]
pub use statistics::RunningStats;

#[cfg(feature = "anomaly")]
pub use anomaly::{AnomalyScorer, RollingDetector};
