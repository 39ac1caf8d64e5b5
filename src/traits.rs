//! Core traits for the sketches behind a fingerprint
//!
//! All sketches implement the base [`Sketch`] trait, with specialized traits
//! for the families the fingerprinters consume (cardinality, quantiles,
//! binned histograms).

use crate::error::MergeError;
use core::fmt::Debug;

/// Core trait for all streaming sketches
///
/// A sketch is a bounded-memory summary updated one item at a time. Every
/// sketch can also be used as a reducer through
/// [`Sketching`](crate::reducer::Sketching).
pub trait Sketch: Clone + Debug {
    /// The type of item this sketch processes
    type Item: ?Sized;

    /// Add an item to the sketch
    fn update(&mut self, item: &Self::Item);

    /// Merge another sketch into this one
    ///
    /// Returns an error if sketches are incompatible
    fn merge(&mut self, other: &Self) -> Result<(), MergeError>;

    /// Reset sketch to empty state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of items processed
    fn count(&self) -> u64;

    /// Check if sketch is empty
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Cardinality (distinct count) estimation sketches
pub trait CardinalitySketch: Sketch {
    /// Estimate number of distinct items seen
    fn estimate(&self) -> f64;
}

/// Quantile estimation sketches
pub trait QuantileSketch: Sketch {
    /// The value type being tracked
    type Value: PartialOrd + Clone;

    /// Add a value to the sketch
    fn add(&mut self, value: Self::Value);

    /// Get quantile value at given rank (0.0 to 1.0)
    ///
    /// rank=0.5 returns the median
    fn quantile(&self, rank: f64) -> Option<Self::Value>;

    /// Get rank of a value (0.0 to 1.0)
    fn rank(&self, value: &Self::Value) -> f64;

    /// Get CDF value at given point
    fn cdf(&self, value: &Self::Value) -> f64 {
        self.rank(value)
    }

    /// Get minimum value seen
    fn min(&self) -> Option<Self::Value>;

    /// Get maximum value seen
    fn max(&self) -> Option<Self::Value>;

    /// Get median (50th percentile)
    fn median(&self) -> Option<Self::Value> {
        self.quantile(0.5)
    }

    /// Get multiple quantiles at once
    fn quantiles(&self, ranks: &[f64]) -> Vec<Option<Self::Value>> {
        ranks.iter().map(|&r| self.quantile(r)).collect()
    }
}

/// Sketches that summarize a stream as weighted bins plus a missing bin
///
/// The invariant every implementation keeps is
/// `observed_count() + missing_count() == total_count()`, where the total
/// is the number of items pushed through the sketch, missing ones included.
pub trait Histogram: Sketch {
    /// Bin key (a centroid for numeric histograms, a category otherwise)
    type Key;

    /// Bins in key order, missing values excluded
    fn bins(&self) -> Vec<crate::histogram::Bin<Self::Key>>;

    /// Number of missing values seen
    fn missing_count(&self) -> u64;

    /// Number of non-missing values seen
    fn observed_count(&self) -> u64;

    /// Number of values seen, missing ones included
    fn total_count(&self) -> u64 {
        self.observed_count() + self.missing_count()
    }

    /// Shannon entropy (natural log) of the bin weights
    fn entropy(&self) -> f64 {
        crate::histogram::binned_entropy(self.bins().iter().map(|b| b.weight))
    }
}
