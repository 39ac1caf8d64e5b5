//! Binned histogram sketches
//!
//! Both histograms keep a separate missing bin next to their weighted bins,
//! so `observed + missing` always equals the number of inserted values.
//!
//! - [`NumericHistogram`]: centroid digest over `f64` values
//! - [`CategoricalHistogram`]: capped category counts with Space-Saving
//!   replacement once the cap is reached
//!
//! # Example
//!
//! ```
//! use flowprint::histogram::{CategoricalHistogram, NumericHistogram};
//! use flowprint::traits::{Histogram, QuantileSketch};
//!
//! let mut numbers = NumericHistogram::new(100.0);
//! for v in [Some(1.0), Some(2.0), None, Some(3.0)] {
//!     numbers.insert(v);
//! }
//! assert_eq!(numbers.total_count(), 4);
//! assert_eq!(numbers.median(), Some(2.0));
//!
//! let mut colors = CategoricalHistogram::new(16);
//! for c in ["red", "blue", "red"] {
//!     colors.insert(Some(c));
//! }
//! assert_eq!(colors.bins()[1].key, "red");
//! assert_eq!(colors.bins()[1].weight, 2);
//! ```

mod categorical;
mod numeric;

pub use categorical::CategoricalHistogram;
pub use numeric::{Centroid, NumericHistogram};

/// One bin of a histogram: a key and how many values fell into it
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bin<K> {
    pub key: K,
    pub weight: u64,
}

impl<K> Bin<K> {
    pub fn new(key: K, weight: u64) -> Self {
        Self { key, weight }
    }

    /// Apply `f` to the key, keeping the weight
    pub fn map_key<J>(self, f: impl FnOnce(K) -> J) -> Bin<J> {
        Bin {
            key: f(self.key),
            weight: self.weight,
        }
    }
}

/// Shannon entropy (natural log) of a set of bin weights
///
/// Zero weights are skipped. Returns 0 when fewer than two bins carry
/// weight.
pub fn binned_entropy<I>(weights: I) -> f64
where
    I: IntoIterator<Item = u64>,
{
    let weights: Vec<u64> = weights.into_iter().filter(|&w| w > 0).collect();
    if weights.len() < 2 {
        return 0.0;
    }

    let total: u64 = weights.iter().sum();
    let total = total as f64;
    -weights
        .iter()
        .map(|&w| {
            let p = w as f64 / total;
            p * p.ln()
        })
        .sum::<f64>()
}
