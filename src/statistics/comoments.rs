//! Running co-moments of paired values

use crate::error::MergeError;
use crate::traits::Sketch;

/// Slope and intercept of a least-squares line `y = slope * x + intercept`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    /// Value of the line at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Covariance, correlation and simple linear regression of `(x, y)` pairs
/// in one pass
///
/// Pairs where either side is not finite are skipped.
///
/// ```
/// use flowprint::statistics::CoMoments;
///
/// let mut co = CoMoments::new();
/// for (x, y) in [(1.0, 3.0), (2.0, 5.0), (3.0, 7.0)] {
///     co.add(x, y);
/// }
///
/// let line = co.regression().unwrap();
/// assert!((line.slope - 2.0).abs() < 1e-12);
/// assert!((line.intercept - 1.0).abs() < 1e-12);
/// assert!((co.correlation().unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CoMoments {
    count: u64,
    mean_x: f64,
    mean_y: f64,
    /// Sum of squared deviations of x
    m2_x: f64,
    /// Sum of squared deviations of y
    m2_y: f64,
    /// Sum of products of deviations
    c_xy: f64,
}

impl CoMoments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pair
    pub fn add(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }

        self.count += 1;
        let n = self.count as f64;

        let dx = x - self.mean_x;
        let dy = y - self.mean_y;
        self.mean_x += dx / n;
        self.mean_y += dy / n;

        self.m2_x += dx * (x - self.mean_x);
        self.m2_y += dy * (y - self.mean_y);
        self.c_xy += dx * (y - self.mean_y);
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Population covariance
    pub fn covariance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.c_xy / self.count as f64)
    }

    /// Pearson correlation, `None` if either side is constant
    pub fn correlation(&self) -> Option<f64> {
        let denom = (self.m2_x * self.m2_y).sqrt();
        (self.count > 0 && denom > 0.0).then(|| (self.c_xy / denom).clamp(-1.0, 1.0))
    }

    /// Least-squares line of y on x, `None` if x is constant
    pub fn regression(&self) -> Option<Regression> {
        if self.count == 0 || self.m2_x <= 0.0 {
            return None;
        }
        let slope = self.c_xy / self.m2_x;
        Some(Regression {
            slope,
            intercept: self.mean_y - slope * self.mean_x,
        })
    }

    pub fn merge_comoments(&mut self, other: &Self) {
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
        let dx = other.mean_x - self.mean_x;
        let dy = other.mean_y - self.mean_y;
        let weight = na * nb / n;

        self.m2_x += other.m2_x + dx * dx * weight;
        self.m2_y += other.m2_y + dy * dy * weight;
        self.c_xy += other.c_xy + dx * dy * weight;
        self.mean_x += dx * nb / n;
        self.mean_y += dy * nb / n;
        self.count += other.count;
    }
}

impl Sketch for CoMoments {
    type Item = (f64, f64);

    fn update(&mut self, item: &(f64, f64)) {
        self.add(item.0, item.1);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        self.merge_comoments(other);
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
