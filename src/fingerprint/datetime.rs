//! DateTime column fingerprint
//!
//! Instants are summarized twice: as a distribution over the time axis
//! (milliseconds since the epoch) and as calendar histograms of hour,
//! weekday, month and quarter.

use super::{stat, ColumnFingerprinter, Fingerprint, FingerprintBuilder, Stat};
use crate::histogram::{Bin, CategoricalHistogram, NumericHistogram};
use crate::reducer::{ReducerExt, Sketching};
use crate::traits::{Histogram, QuantileSketch};
use crate::types::TypeSignature;
use crate::value::{Category, Value, MS_PER_DAY};
use chrono::{DateTime, Datelike, Timelike, Utc};

type Instant = Option<DateTime<Utc>>;

/// Calendar component of an instant, as a categorical key
fn calendar(part: fn(&DateTime<Utc>) -> u32) -> impl Fn(&Instant) -> Option<i64> {
    move |dt: &Instant| dt.as_ref().map(|dt| part(dt) as i64)
}

fn quarter(dt: &DateTime<Utc>) -> u32 {
    (dt.month() - 1) / 3 + 1
}

pub(super) fn fingerprinter(builder: &FingerprintBuilder, sig: &TypeSignature) -> ColumnFingerprinter {
    let config = builder.config().clone();
    let semantic = sig.semantic;

    let instants = Sketching::new(NumericHistogram::new(config.histogram_compression))
        .pre_step(|dt: &Instant| dt.map(|dt| dt.timestamp_millis() as f64));
    let hours = Sketching::new(CategoricalHistogram::new(24))
        .pre_step(calendar(|dt| dt.hour()));
    let weekdays = Sketching::new(CategoricalHistogram::new(7))
        .pre_step(calendar(|dt| dt.weekday().number_from_monday()));
    let months = Sketching::new(CategoricalHistogram::new(12))
        .pre_step(calendar(|dt| dt.month()));
    let quarters = Sketching::new(CategoricalHistogram::new(4))
        .pre_step(calendar(quarter));

    (instants, hours, weekdays, months, quarters)
        .pre_step(move |v: &Value| v.as_datetime(semantic))
        .post_complete(move |(instants, hours, weekdays, months, quarters)| {
            let mut fp = Fingerprint::new();

            fp.insert(stat::HISTOGRAM, Stat::Bins(instants.bins()));
            fp.insert(stat::HISTOGRAM_HOUR, calendar_bins(&hours));
            fp.insert(stat::HISTOGRAM_DAY, calendar_bins(&weekdays));
            fp.insert(stat::HISTOGRAM_MONTH, calendar_bins(&months));
            fp.insert(stat::HISTOGRAM_QUARTER, calendar_bins(&quarters));
            fp.insert(stat::ENTROPY, instants.entropy());

            let min = instants.min();
            let max = instants.max();
            fp.insert(stat::MIN, min.and_then(to_instant));
            fp.insert(stat::MAX, max.and_then(to_instant));
            fp.insert(
                stat::RANGE_DAYS,
                min.zip(max).map(|(min, max)| (max - min) / MS_PER_DAY as f64),
            );
            fp.insert(
                stat::PERCENTILES,
                if instants.observed_count() == 0 {
                    Stat::Absent
                } else {
                    Stat::Instants(
                        instants
                            .quantiles(&config.percentiles)
                            .into_iter()
                            .flatten()
                            .filter_map(to_instant)
                            .collect(),
                    )
                },
            );
            fp
        })
        .boxed()
}

fn calendar_bins(histogram: &CategoricalHistogram<i64>) -> Stat {
    Stat::Categories(
        histogram
            .bins()
            .into_iter()
            .map(|bin: Bin<i64>| bin.map_key(Category::Integer))
            .collect(),
    )
}

fn to_instant(millis: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis.round() as i64)
}
