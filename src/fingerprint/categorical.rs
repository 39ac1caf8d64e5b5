//! Categorical column fingerprint

use super::numeric::cardinality_stats;
use super::{stat, ColumnFingerprinter, Fingerprint, FingerprintBuilder, Stat};
use crate::cardinality::HyperLogLog;
use crate::histogram::CategoricalHistogram;
use crate::reducer::{ReducerExt, Sketching};
use crate::traits::Histogram;
use crate::types::TypeSignature;
use crate::value::{Category, Value};

pub(super) fn fingerprinter(builder: &FingerprintBuilder, _sig: &TypeSignature) -> ColumnFingerprinter {
    let config = builder.config().clone();

    let histogram = Sketching::new(CategoricalHistogram::<Category>::new(config.max_categories))
        .pre_step(|v: &Value| v.as_category());
    let distinct = Sketching::new(HyperLogLog::with_error_bound(config.cardinality_error))
        .skip_missing()
        .pre_step(|v: &Value| v.distinct_hash());

    (histogram, distinct)
        .post_complete(move |(histogram, distinct)| {
            let mut fp = Fingerprint::new();
            fp.insert(stat::HISTOGRAM, Stat::Categories(histogram.bins()));
            fp.insert(stat::ENTROPY, histogram.entropy());
            cardinality_stats(&mut fp, &distinct, histogram.total_count(), &config);
            fp
        })
        .boxed()
}
