//! Statistical summaries for streaming data
//!
//! Single pass, constant memory.
//!
//! # Example
//!
//! ```
//! use tripstats::statistics::RunningStats;
//!
//! let mut stats = RunningStats::new();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
//!     stats.add(value);
//! }
//!
//! println!("Mean: {}", stats.mean());
//! println!("Stddev: {}", stats.stddev());
//! println!("z(5.0): {}", stats.z_score(5.0));
//! ```

mod moments;

pub use moments::RunningStats;
