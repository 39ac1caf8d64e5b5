//! Moment statistics for streaming data
//!
//! Single-pass, constant-memory accumulators for one numeric column
//! ([`Moments`]) or a pair of numeric columns ([`CoMoments`]).
//!
//! # Example
//!
//! ```
//! use flowprint::statistics::Moments;
//!
//! let mut stats = Moments::new();
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
//!     stats.add(value);
//! }
//!
//! assert_eq!(stats.min(), Some(1.0));
//! assert_eq!(stats.max(), Some(5.0));
//! assert_eq!(stats.sum(), 15.0);
//! assert!(stats.skewness().unwrap().abs() < 1e-12);
//! ```

mod comoments;
mod moments;

pub use comoments::{CoMoments, Regression};
pub use moments::Moments;
