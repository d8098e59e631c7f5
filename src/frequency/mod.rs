//! Frequency counting
//!
//! - [`TopKSelector`]: exact per-category counts with a bounded candidate
//!   heap for the k most frequent categories
//!
//! # Example
//!
//! ```
//! use tripstats::frequency::TopKSelector;
//!
//! let mut hours = TopKSelector::new(3);
//! for hour in [8u8, 17, 8, 18, 17, 8, 9] {
//!     hours.insert(hour);
//! }
//!
//! assert_eq!(hours.top_k(2), vec![(8, 3), (17, 2)]);
//! ```

mod top_k;

pub use top_k::{top_k_of, TopKSelector};
