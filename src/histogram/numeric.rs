//! Centroid digest over numeric values
//!
//! A t-digest variant: values are buffered, sorted and merged into
//! centroids under the arcsine scale function, which keeps bins small at
//! the tails and lets them grow in the middle of the distribution.
//! Adjacent centroids with the same mean are always merged, so a constant
//! column collapses into a single bin.

use super::Bin;
use crate::error::MergeError;
use crate::traits::{Histogram, QuantileSketch, Sketch};
use std::borrow::Cow;

/// A centroid in the digest
///
/// Centroids represent clusters of values with a mean and count.
#[derive(Clone, Debug, PartialEq)]
pub struct Centroid {
    /// Mean value of the centroid
    pub mean: f64,
    /// Number of values in the centroid
    pub weight: u64,
}

impl Centroid {
    /// Create a new centroid
    pub fn new(mean: f64, weight: u64) -> Self {
        Self { mean, weight }
    }

    /// Add a value to the centroid, updating the weighted mean
    pub fn add(&mut self, value: f64, count: u64) {
        let new_weight = self.weight + count;
        self.mean = (self.mean * self.weight as f64 + value * count as f64) / new_weight as f64;
        self.weight = new_weight;
    }
}

/// Approximate histogram of a numeric column
///
/// Missing values (`None`, NaN and infinities) go to a separate missing
/// bin and never touch the centroids. Min and max are exact; quantiles,
/// the CDF and the variance are approximate with bounded error.
///
/// # Compression Parameter
///
/// The compression parameter bounds the number of centroids:
/// - Higher compression = more centroids = better accuracy = more memory
/// - Typical values: 100-500
/// - Default: 100
///
/// # Example
///
/// ```
/// use flowprint::histogram::NumericHistogram;
/// use flowprint::traits::QuantileSketch;
///
/// let mut hist = NumericHistogram::new(100.0);
///
/// for i in 1..=1000 {
///     hist.add(i as f64);
/// }
///
/// let p50 = hist.quantile(0.5).unwrap();
/// assert!((p50 - 500.0).abs() < 10.0);
/// ```
#[derive(Clone, Debug)]
pub struct NumericHistogram {
    /// Compression parameter (higher = more accuracy, more memory)
    compression: f64,
    /// Centroids sorted by mean
    centroids: Vec<Centroid>,
    /// Values not merged into centroids yet
    buffer: Vec<f64>,
    /// Buffer capacity before forcing compression
    buffer_capacity: usize,
    /// Number of non-missing values
    count: u64,
    /// Number of missing values
    missing: u64,
    /// Minimum value seen
    min: f64,
    /// Maximum value seen
    max: f64,
}

impl NumericHistogram {
    /// Create a new histogram with the given compression parameter
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite or not positive.
    pub fn new(compression: f64) -> Self {
        assert!(
            compression.is_finite() && compression > 0.0,
            "compression must be finite and positive, got {}",
            compression
        );

        let buffer_capacity = ((compression * 2.0) as usize).max(1);
        Self {
            compression,
            centroids: Vec::with_capacity(compression as usize),
            buffer: Vec::with_capacity(buffer_capacity),
            buffer_capacity,
            count: 0,
            missing: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Get the compression parameter
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Insert one value, `None` (or a non-finite value) counting as missing
    pub fn insert(&mut self, value: Option<f64>) {
        match value {
            Some(v) if v.is_finite() => self.push(v),
            _ => self.missing += 1,
        }
    }

    fn push(&mut self, value: f64) {
        self.buffer.push(value);
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        if self.buffer.len() >= self.buffer_capacity {
            self.compress();
        }
    }

    /// Merge the buffer into the centroids
    pub fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let merged = Self::merged(&self.centroids, &self.buffer, self.compression);
        self.centroids = merged;
        self.buffer.clear();
    }

    /// Current centroids including buffered values, without mutating
    pub fn centroids(&self) -> Cow<'_, [Centroid]> {
        if self.buffer.is_empty() {
            Cow::Borrowed(&self.centroids)
        } else {
            Cow::Owned(Self::merged(&self.centroids, &self.buffer, self.compression))
        }
    }

    fn merged(centroids: &[Centroid], buffer: &[f64], compression: f64) -> Vec<Centroid> {
        let mut all: Vec<Centroid> = centroids
            .iter()
            .cloned()
            .chain(buffer.iter().map(|&v| Centroid::new(v, 1)))
            .collect();
        all.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        Self::compress_centroids(all, compression)
    }

    /// Merge sorted centroids under the scale function
    fn compress_centroids(sorted: Vec<Centroid>, compression: f64) -> Vec<Centroid> {
        let mut iter = sorted.into_iter();
        let Some(mut current) = iter.next() else {
            return Vec::new();
        };

        let rest: Vec<Centroid> = iter.collect();
        let total_weight: u64 = current.weight + rest.iter().map(|c| c.weight).sum::<u64>();
        let mut result = Vec::with_capacity((compression * 2.0) as usize);
        let mut weight_so_far = 0u64;

        for centroid in rest {
            let proposed_weight = current.weight + centroid.weight;
            let q0 = weight_so_far as f64 / total_weight as f64;
            let q1 = (weight_so_far + proposed_weight) as f64 / total_weight as f64;

            let k0 = Self::scale(q0, compression);
            let k1 = Self::scale(q1, compression);

            if centroid.mean == current.mean || k1 - k0 <= 1.0 {
                current.add(centroid.mean, centroid.weight);
            } else {
                weight_so_far += current.weight;
                result.push(current);
                current = centroid;
            }
        }

        result.push(current);
        result
    }

    /// Scale function (arcsine family)
    ///
    /// The argument is clamped to [-1, 1] against floating-point drift.
    #[inline]
    fn scale(q: f64, compression: f64) -> f64 {
        let x = (2.0 * q - 1.0).clamp(-1.0, 1.0);
        compression * (x.asin() / core::f64::consts::PI + 0.5)
    }

    /// Mean of the observed values
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let total: f64 = self
            .centroids()
            .iter()
            .map(|c| c.mean * c.weight as f64)
            .sum();
        Some(total / self.count as f64)
    }

    /// Population variance estimated from the centroids
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let total: f64 = self
            .centroids()
            .iter()
            .map(|c| c.weight as f64 * (c.mean - mean).powi(2))
            .sum();
        Some(total / self.count as f64)
    }

    /// Quantile by midpoint interpolation
    ///
    /// Each centroid is a point mass at its mean. The CDF is modeled as a
    /// piecewise linear function through each centroid's midpoint
    /// `(weight_before + weight / 2, mean)`, anchored at `(0, min)` and
    /// `(count, max)`.
    fn quantile_impl(centroids: &[Centroid], count: u64, min: f64, max: f64, q: f64) -> Option<f64> {
        if count == 0 {
            return None;
        }

        let q = q.clamp(0.0, 1.0);
        if q <= 0.0 {
            return Some(min);
        }
        if q >= 1.0 {
            return Some(max);
        }

        let target_rank = q * count as f64;
        let mut prev_rank = 0.0_f64;
        let mut prev_mean = min;
        let mut cumulative = 0.0_f64;

        for centroid in centroids {
            let mid_rank = cumulative + centroid.weight as f64 / 2.0;

            if target_rank < mid_rank {
                let denom = mid_rank - prev_rank;
                if denom <= 0.0 {
                    return Some(prev_mean);
                }
                let t = (target_rank - prev_rank) / denom;
                return Some(prev_mean + t * (centroid.mean - prev_mean));
            }

            cumulative += centroid.weight as f64;
            prev_rank = mid_rank;
            prev_mean = centroid.mean;
        }

        // past the last midpoint
        let denom = count as f64 - prev_rank;
        if denom <= 0.0 {
            return Some(max);
        }
        let t = (target_rank - prev_rank) / denom;
        Some(prev_mean + t * (max - prev_mean))
    }

    /// Rank under the same piecewise linear model as [`Self::quantile_impl`]
    fn rank_impl(centroids: &[Centroid], count: u64, min: f64, max: f64, value: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }

        // >= max first: P(X <= x) is 1 when min == max == x
        if value >= max {
            return 1.0;
        }
        if value <= min {
            return 0.0;
        }

        let mut prev_rank = 0.0_f64;
        let mut prev_mean = min;
        let mut cumulative = 0.0_f64;

        for centroid in centroids {
            let mid_rank = cumulative + centroid.weight as f64 / 2.0;

            if value < centroid.mean {
                let denom = centroid.mean - prev_mean;
                if denom <= 0.0 {
                    return prev_rank / count as f64;
                }
                let t = (value - prev_mean) / denom;
                return (prev_rank + t * (mid_rank - prev_rank)) / count as f64;
            }

            cumulative += centroid.weight as f64;
            prev_rank = mid_rank;
            prev_mean = centroid.mean;
        }

        let denom = max - prev_mean;
        if denom <= 0.0 {
            return 1.0;
        }
        let t = (value - prev_mean) / denom;
        (prev_rank + t * (count as f64 - prev_rank)) / count as f64
    }
}

impl Default for NumericHistogram {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Sketch for NumericHistogram {
    type Item = Option<f64>;

    fn update(&mut self, item: &Option<f64>) {
        self.insert(*item);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if (self.compression - other.compression).abs() > 1e-6 * self.compression {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("compression={}", self.compression),
                found: format!("compression={}", other.compression),
            });
        }

        let mut all = core::mem::take(&mut self.centroids);
        all.extend(other.centroids.iter().cloned());
        all.extend(
            self.buffer
                .drain(..)
                .chain(other.buffer.iter().copied())
                .map(|v| Centroid::new(v, 1)),
        );
        all.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        self.count += other.count;
        self.missing += other.missing;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.centroids = Self::compress_centroids(all, self.compression);

        Ok(())
    }

    fn clear(&mut self) {
        self.centroids.clear();
        self.buffer.clear();
        self.count = 0;
        self.missing = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.centroids.capacity() * core::mem::size_of::<Centroid>()
            + self.buffer.capacity() * core::mem::size_of::<f64>()
    }

    /// Every inserted value, missing ones included
    fn count(&self) -> u64 {
        self.count + self.missing
    }
}

impl QuantileSketch for NumericHistogram {
    type Value = f64;

    fn add(&mut self, value: f64) {
        self.insert(Some(value));
    }

    fn quantile(&self, rank: f64) -> Option<f64> {
        Self::quantile_impl(&self.centroids(), self.count, self.min, self.max, rank)
    }

    fn rank(&self, value: &f64) -> f64 {
        Self::rank_impl(&self.centroids(), self.count, self.min, self.max, *value)
    }

    fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    fn quantiles(&self, ranks: &[f64]) -> Vec<Option<f64>> {
        let centroids = self.centroids();
        ranks
            .iter()
            .map(|&r| Self::quantile_impl(&centroids, self.count, self.min, self.max, r))
            .collect()
    }
}

impl Histogram for NumericHistogram {
    type Key = f64;

    fn bins(&self) -> Vec<Bin<f64>> {
        self.centroids()
            .iter()
            .map(|c| Bin::new(c.mean, c.weight))
            .collect()
    }

    fn missing_count(&self) -> u64 {
        self.missing
    }

    fn observed_count(&self) -> u64 {
        self.count
    }
}
