//! Numeric column fingerprint

use super::{ratio, stat, ColumnFingerprinter, Fingerprint, FingerprintBuilder, Stat};
use crate::cardinality::HyperLogLog;
use crate::config::Config;
use crate::histogram::NumericHistogram;
use crate::reducer::{ReducerExt, Sketching};
use crate::statistics::Moments;
use crate::traits::{CardinalitySketch, Histogram, QuantileSketch};
use crate::types::TypeSignature;
use crate::value::Value;

pub(super) fn fingerprinter(builder: &FingerprintBuilder, _sig: &TypeSignature) -> ColumnFingerprinter {
    let config = builder.config().clone();

    let histogram = Sketching::new(NumericHistogram::new(config.histogram_compression))
        .pre_step(|v: &Value| v.as_f64());
    let distinct = Sketching::new(HyperLogLog::with_error_bound(config.cardinality_error))
        .skip_missing()
        .pre_step(|v: &Value| v.distinct_hash());
    let moments = Sketching::new(Moments::new())
        .skip_missing()
        .pre_step(|v: &Value| v.as_f64());

    (histogram, distinct, moments)
        .post_complete(move |(histogram, distinct, moments)| {
            summarize(&histogram, &distinct, &moments, &config)
        })
        .boxed()
}

/// Distinct-count statistics shared with categorical columns
pub(super) fn cardinality_stats(fp: &mut Fingerprint, distinct: &HyperLogLog, total: u64, config: &Config) {
    let cardinality = distinct.estimate().round();
    let vs_count = ratio(cardinality, total as f64);

    fp.insert(stat::CARDINALITY, cardinality);
    fp.insert(stat::CARDINALITY_VS_COUNT, vs_count);
    fp.insert(
        stat::ALL_DISTINCT,
        vs_count.map(|r| r >= config.all_distinct_threshold),
    );
}

fn summarize(histogram: &NumericHistogram, distinct: &HyperLogLog, moments: &Moments, config: &Config) -> Fingerprint {
    let mut fp = Fingerprint::new();

    fp.insert(stat::HISTOGRAM, Stat::Bins(histogram.bins()));
    fp.insert(stat::ENTROPY, histogram.entropy());
    fp.insert(
        stat::PERCENTILES,
        if histogram.observed_count() == 0 {
            Stat::Absent
        } else {
            Stat::Numbers(
                histogram
                    .quantiles(&config.percentiles)
                    .into_iter()
                    .flatten()
                    .collect(),
            )
        },
    );
    cardinality_stats(&mut fp, distinct, histogram.total_count(), config);

    let min = moments.min();
    let max = moments.max();
    let mean = moments.mean();
    let median = histogram.median();
    let sd = moments.stddev();
    let range = moments.range();

    fp.insert(stat::MIN, min);
    fp.insert(stat::MAX, max);
    fp.insert(stat::MEAN, mean);
    fp.insert(stat::MEDIAN, median);
    fp.insert(stat::VAR, moments.variance());
    fp.insert(stat::SD, sd);
    fp.insert(stat::RANGE, range);
    fp.insert(stat::SUM, moments.sum());
    fp.insert(stat::SUM_OF_SQUARES, moments.sum_of_squares());
    fp.insert(stat::SKEWNESS, moments.skewness());
    fp.insert(stat::KURTOSIS, moments.kurtosis());

    let div = |a: Option<f64>, b: Option<f64>| ratio(a?, b?);
    fp.insert(stat::RANGE_VS_SD, div(range, sd));
    fp.insert(
        stat::RANGE_VS_SPREAD,
        div(range, mean.zip(median).map(|(mean, median)| mean - median)),
    );
    fp.insert(stat::CV, div(sd, mean));
    fp.insert(stat::MIN_VS_MAX, div(min, max));

    let bounds = min.zip(max);
    fp.insert(stat::POSITIVE_DEFINITE, min.map(|min| min >= 0.0));
    fp.insert(
        stat::BOUNDED_UNIT,
        bounds.map(|(min, max)| min >= 0.0 && max <= 1.0),
    );
    fp.insert(
        stat::BOUNDED_SYMMETRIC_UNIT,
        bounds.map(|(min, max)| min >= -1.0 && max <= 1.0),
    );
    fp.insert(
        stat::PCT_ABOVE_MEAN,
        mean.map(|mean| 1.0 - histogram.cdf(&mean)),
    );

    fp
}
