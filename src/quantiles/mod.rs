//! Order statistics over a stream
//!
//! - [`StreamingMedian`]: exact median, readable after every insertion
//!
//! # Example
//!
//! ```
//! use tripstats::quantiles::StreamingMedian;
//!
//! // Speeds (km/h) of trips picked up in one hour bucket
//! let mut median = StreamingMedian::new();
//! for speed in [18.5, 22.0, 31.2, 12.4, 25.9] {
//!     median.insert(speed).unwrap();
//! }
//!
//! assert_eq!(median.median(), Some(22.0));
//! ```

mod streaming_median;

pub use streaming_median::{median_of, StreamingMedian};
