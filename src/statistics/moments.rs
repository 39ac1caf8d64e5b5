//! Running moments (mean, variance, skewness, kurtosis, min, max)
//!
//! Computes streaming statistics with Welford's numerically stable online
//! algorithm, extended to the third and fourth central moments.
//! Supports merging for distributed computation.

use crate::error::MergeError;
use crate::traits::Sketch;

/// Running moments of a numeric stream
///
/// Computes mean, variance, skewness, excess kurtosis, sum, sum of squares,
/// min and max in a single pass with O(1) memory. Statistics that divide by
/// a zero count or a zero variance are `None`.
///
/// # Example
///
/// ```
/// use flowprint::statistics::Moments;
///
/// let mut stats = Moments::new();
///
/// for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     stats.add(value);
/// }
///
/// assert!((stats.mean().unwrap() - 5.0).abs() < 1e-9);
/// assert!((stats.variance().unwrap() - 4.0).abs() < 1e-9);
/// assert!((stats.stddev().unwrap() - 2.0).abs() < 1e-9);
/// assert_eq!(stats.min(), Some(2.0));
/// assert_eq!(stats.max(), Some(9.0));
/// ```
///
/// # Distributed Usage
///
/// ```
/// use flowprint::statistics::Moments;
/// use flowprint::traits::Sketch;
///
/// let mut stats1 = Moments::new();
/// let mut stats2 = Moments::new();
///
/// for v in [1.0, 2.0, 3.0] {
///     stats1.add(v);
/// }
/// for v in [4.0, 5.0, 6.0] {
///     stats2.add(v);
/// }
///
/// stats1.merge(&stats2).unwrap();
/// assert!((stats1.mean().unwrap() - 3.5).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct Moments {
    /// Number of values seen
    count: u64,
    /// Running mean
    mean: f64,
    /// Sum of squared differences from mean
    m2: f64,
    /// Sum of cubed differences from mean
    m3: f64,
    /// Sum of fourth powers of differences from mean
    m4: f64,
    min: f64,
    max: f64,
    sum: f64,
    sum_of_squares: f64,
}

impl Default for Moments {
    fn default() -> Self {
        Self::new()
    }
}

impl Moments {
    /// Create a new empty accumulator
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            sum_of_squares: 0.0,
        }
    }

    /// Add a value
    ///
    /// NaN and infinite values are ignored so they cannot poison the
    /// moments.
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        let n1 = self.count as f64;
        self.count += 1;
        let n = self.count as f64;

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.sum_of_squares += value * value;

        let delta = value - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    /// Get the number of values
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Unbiased variance (Bessel's correction)
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    /// Population standard deviation
    pub fn stddev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn sample_stddev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Population skewness, `None` for a constant stream
    pub fn skewness(&self) -> Option<f64> {
        if self.count == 0 || self.m2 <= 0.0 {
            return None;
        }
        Some((self.count as f64).sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Population excess kurtosis, `None` for a constant stream
    pub fn kurtosis(&self) -> Option<f64> {
        if self.count == 0 || self.m2 <= 0.0 {
            return None;
        }
        Some(self.count as f64 * self.m4 / (self.m2 * self.m2) - 3.0)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Get the range (max - min)
    pub fn range(&self) -> Option<f64> {
        (self.count > 0).then(|| self.max - self.min)
    }

    /// Sum of all values (0 when empty)
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sum of squared values (0 when empty)
    pub fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares
    }

    /// Merge with another accumulator
    ///
    /// Uses the pairwise update of Chan et al. extended to the higher
    /// moments (Pébay, 2008).
    pub fn merge_moments(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta2 * delta2;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.count += other.count;
        self.mean += delta * nb / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.sum_of_squares += other.sum_of_squares;
    }
}

impl Sketch for Moments {
    type Item = f64;

    fn update(&mut self, item: &Self::Item) {
        self.add(*item);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        self.merge_moments(other);
        Ok(())
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_basic() {
        let mut stats = Moments::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(v);
        }

        assert_eq!(stats.len(), 8);
        assert!(close(stats.mean(), 5.0));
        assert!(close(stats.variance(), 4.0));
        assert!(close(stats.stddev(), 2.0));
        assert!(close(stats.sample_variance(), 32.0 / 7.0));
        assert_eq!(stats.sum(), 40.0);
        assert_eq!(stats.sum_of_squares(), 232.0);
        assert_eq!(stats.range(), Some(7.0));
    }

    #[test]
    fn test_higher_moments() {
        let mut stats = Moments::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(v);
        }

        // central moments: m2 = 32, m3 = 42, m4 = 356
        assert!(close(stats.skewness(), 0.65625));
        assert!(close(stats.kurtosis(), 8.0 * 356.0 / 1024.0 - 3.0));
    }

    #[test]
    fn test_symmetric_data_has_no_skew() {
        let mut stats = Moments::new();
        for v in [-2.0, -1.0, 0.0, 1.0, 2.0] {
            stats.add(v);
        }
        assert!(stats.skewness().unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_single_value() {
        let mut stats = Moments::new();
        stats.add(42.0);

        assert_eq!(stats.mean(), Some(42.0));
        assert_eq!(stats.variance(), Some(0.0));
        assert_eq!(stats.sample_variance(), None);
        assert_eq!(stats.skewness(), None);
        assert_eq!(stats.kurtosis(), None);
    }

    #[test]
    fn test_empty() {
        let stats = Moments::new();

        assert!(stats.is_empty());
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.variance(), None);
        assert_eq!(stats.min(), None);
        assert_eq!(stats.max(), None);
        assert_eq!(stats.range(), None);
        assert_eq!(stats.sum(), 0.0);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 * 0.5 - 7.0).collect();

        let mut whole = Moments::new();
        values.iter().for_each(|&v| whole.add(v));

        let (left, right) = values.split_at(73);
        let mut a = Moments::new();
        let mut b = Moments::new();
        left.iter().for_each(|&v| a.add(v));
        right.iter().for_each(|&v| b.add(v));
        a.merge(&b).unwrap();

        assert_eq!(a.len(), whole.len());
        for (merged, single) in [
            (a.mean(), whole.mean()),
            (a.variance(), whole.variance()),
            (a.skewness(), whole.skewness()),
            (a.kurtosis(), whole.kurtosis()),
        ] {
            let (merged, single) = (merged.unwrap(), single.unwrap());
            assert!((merged - single).abs() < 1e-9, "{} vs {}", merged, single);
        }
        assert_eq!(a.min(), whole.min());
        assert_eq!(a.max(), whole.max());
        assert!((a.sum() - whole.sum()).abs() < 1e-9);
    }

    #[test]
    fn test_merge_empty() {
        let mut stats1 = Moments::new();
        stats1.add(1.0);
        stats1.add(2.0);
        stats1.merge(&Moments::new()).unwrap();
        assert_eq!(stats1.mean(), Some(1.5));

        let mut empty = Moments::new();
        empty.merge(&stats1).unwrap();
        assert_eq!(empty.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut stats = Moments::new();
        stats.add(1.0);
        stats.clear();
        assert!(stats.is_empty());
        assert_eq!(stats.min(), None);
    }

    #[test]
    fn test_numerical_stability() {
        let mut stats = Moments::new();
        let base = 1e12;
        for i in 0..1000 {
            stats.add(base + i as f64);
        }

        let expected_mean = base + 499.5;
        assert!((stats.mean().unwrap() - expected_mean).abs() < 1.0);
        let var = stats.variance().unwrap();
        assert!((var - 83_333.25).abs() < 1.0, "var={}", var);
    }

    #[test]
    fn test_non_finite_ignored() {
        let mut stats = Moments::new();
        for v in [1.0, f64::NAN, 2.0, f64::INFINITY, 3.0, f64::NEG_INFINITY] {
            stats.add(v);
        }

        assert_eq!(stats.len(), 3);
        assert!(close(stats.mean(), 2.0));
        assert_eq!(stats.max(), Some(3.0));
    }
}
