//! Cardinality (distinct count) estimation
//!
//! # Algorithms
//!
//! - [`HyperLogLog`]: HLL with an exact sparse phase and linear counting
//!
//! # Example
//!
//! ```
//! use flowprint::cardinality::HyperLogLog;
//! use flowprint::traits::CardinalitySketch;
//!
//! let mut hll = HyperLogLog::new(14); // ~0.8% error
//!
//! for i in 0..10000 {
//!     hll.insert(&i.to_string());
//! }
//!
//! let estimate = hll.estimate();
//! assert!((estimate - 10_000.0).abs() < 500.0);
//! ```

mod hyperloglog;

pub use hyperloglog::HyperLogLog;

/// Compute the precision keeping `z` standard errors under `target_error`
///
/// HLL error is approximately 1.04 / sqrt(2^p). With `z = 3.0` the
/// estimate stays inside the bound for all but a tiny fraction of streams;
/// that is what fingerprints use for `cardinality`.
pub fn precision_for_bound(target_error: f64, z: f64) -> u8 {
    if target_error.is_nan() || target_error <= 0.0 {
        return 18;
    }
    // m = (z * 1.04 / error)^2, p = log2(m)
    let m = (z * 1.04 / target_error).powi(2);
    let p = m.log2().ceil();
    p.clamp(4.0, 18.0) as u8
}
