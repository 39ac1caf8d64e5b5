//! Text column fingerprint
//!
//! Free text is summarized by the distribution of its lengths in
//! characters, so `histogram` here holds lengths rather than values.

use super::{stat, ColumnFingerprinter, Fingerprint, FingerprintBuilder, Stat};
use crate::histogram::NumericHistogram;
use crate::reducer::{ReducerExt, Sketching};
use crate::traits::{Histogram, QuantileSketch};
use crate::types::TypeSignature;
use crate::value::Value;

pub(super) fn fingerprinter(builder: &FingerprintBuilder, _sig: &TypeSignature) -> ColumnFingerprinter {
    Sketching::new(NumericHistogram::new(builder.config().histogram_compression))
        .pre_step(|v: &Value| v.as_str().map(|s| s.chars().count() as f64))
        .post_complete(|lengths: NumericHistogram| {
            Fingerprint::new()
                .with(stat::HISTOGRAM, Stat::Bins(lengths.bins()))
                .with(stat::MIN, lengths.min())
                .with(stat::MAX, lengths.max())
                .with(stat::MEAN, lengths.mean())
        })
        .boxed()
}
