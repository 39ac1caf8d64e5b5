//! Fingerprints of column pairs

use super::{stat, Fingerprint, FingerprintBuilder, PairFingerprinter, Stat};
use crate::reducer::{ReducerExt, Rollup, Sketching};
use crate::statistics::CoMoments;
use crate::timeseries::{Timeseries, TimeseriesAnalysis};
use crate::types::TypeSignature;
use crate::value::Value;

type Pair = (Value, Value);

/// Numeric x Numeric: how the second column moves with the first
pub(super) fn numeric_fingerprinter(
    _builder: &FingerprintBuilder,
    _a: &TypeSignature,
    _b: &TypeSignature,
) -> PairFingerprinter {
    Sketching::new(CoMoments::new())
        .skip_missing()
        .pre_step(|p: &Pair| p.0.as_f64().zip(p.1.as_f64()))
        .post_complete(|co: CoMoments| {
            Fingerprint::new()
                .with(stat::CORRELATION, co.correlation())
                .with(stat::COVARIANCE, co.covariance())
                .with(stat::LINEAR_REGRESSION, co.regression())
        })
        .boxed()
}

/// DateTime x Numeric: the second column as a series over the first
pub(super) fn timeseries_fingerprinter(
    builder: &FingerprintBuilder,
    a: &TypeSignature,
    _b: &TypeSignature,
) -> PairFingerprinter {
    let semantic = a.semantic;
    Timeseries::new(builder.resolution(), builder.policy(), builder.config())
        .pre_step(move |p: &Pair| (p.0.as_epoch_millis(semantic), p.1.as_f64()))
        .post_complete(summarize_series)
        .boxed()
}

fn summarize_series(analysis: TimeseriesAnalysis) -> Fingerprint {
    let mut fp = Fingerprint::new()
        .with(stat::SERIES, analysis.series.map_or(Stat::Absent, Stat::Series))
        .with(stat::RESOLUTION, Stat::Text(analysis.resolution.to_string()))
        .with(stat::LINEAR_REGRESSION, analysis.regression);

    if let Some(growth) = analysis.growth {
        for (name, value) in growth.entries() {
            fp.insert(name, value);
        }
    }
    if let Some(parts) = analysis.decomposition {
        fp.insert(stat::TREND, Stat::Numbers(parts.trend));
        fp.insert(stat::SEASONAL, Stat::Numbers(parts.seasonal));
        fp.insert(stat::RESIDUAL, Stat::Numbers(parts.residual));
    }
    fp
}

/// Categorical x Any: the second column fingerprinted once per category
///
/// Each group runs the full column dispatch for the second column's
/// signature, so the nested fingerprints match what a standalone
/// fingerprint of that column would report.
pub(super) fn rollup_fingerprinter(
    builder: &FingerprintBuilder,
    _a: &TypeSignature,
    b: &TypeSignature,
) -> PairFingerprinter {
    let builder = builder.clone();
    let b = *b;
    Rollup::new(
        |p: &Pair| p.0.as_category(),
        move || builder.column(&b).pre_step(|p: &Pair| p.1.clone()),
    )
    .post_complete(|groups| {
        Fingerprint::new().with(stat::GROUPS, Stat::Groups(groups.into_iter().collect()))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{Computation, CostPolicy, QueryLevel};
    use crate::reducer::transduce;
    use crate::timeseries::Resolution;
    use crate::types::{BaseType, SemanticType, Signature};
    use crate::value::{Category, MS_PER_DAY};
    use crate::Config;
    use chrono::{Months, TimeZone, Utc};

    fn int() -> TypeSignature {
        TypeSignature::of(BaseType::Integer)
    }

    fn date() -> TypeSignature {
        TypeSignature::of(BaseType::DateTime)
    }

    fn builder(computation: Computation, resolution: Resolution) -> FingerprintBuilder {
        FingerprintBuilder::new(
            Config::default(),
            CostPolicy::new(computation, QueryLevel::FullScan),
        )
        .with_resolution(resolution)
    }

    fn monthly(months: u32) -> Vec<Pair> {
        let start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        (0..months)
            .map(|i| {
                let at = start + Months::new(i);
                let value = 100.0 + i as f64 + [5.0, 0.0, -5.0][i as usize % 3];
                (Value::from(at), Value::from(value))
            })
            .collect()
    }

    #[test]
    fn test_numeric_pair() {
        let pairs: Vec<Pair> = (1..=5i64)
            .map(|x| (Value::from(x), Value::from(2 * x + 1)))
            .chain([(Value::from(9i64), Value::Null)])
            .collect();
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Day).pair(&int(), &int()),
            &pairs,
        );

        assert_eq!(fp.count(stat::COUNT), Some(6));
        assert_eq!(fp.count(stat::NIL_COUNT), Some(1));
        assert!((fp.number(stat::CORRELATION).unwrap() - 1.0).abs() < 1e-12);
        assert!((fp.number(stat::COVARIANCE).unwrap() - 4.0).abs() < 1e-12);
        let line = fp.regression(stat::LINEAR_REGRESSION).unwrap();
        assert!((line.slope - 2.0).abs() < 1e-12);
        assert!((line.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_pair_has_no_correlation() {
        let pairs = vec![(Value::from(1i64), Value::from(3i64)); 4];
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Day).pair(&int(), &int()),
            &pairs,
        );
        assert!(fp.is_absent(stat::CORRELATION));
        assert!(fp.is_absent(stat::LINEAR_REGRESSION));
        assert_eq!(fp.number(stat::COVARIANCE), Some(0.0));
    }

    #[test]
    fn test_daily_series_is_zero_filled() {
        let day0 = Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap();
        let pairs = vec![
            (Value::from(day0), Value::from(5i64)),
            (Value::from(day2), Value::from(7i64)),
        ];
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Day).pair(&date(), &int()),
            &pairs,
        );

        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp_millis();
        let series = fp.series(stat::SERIES).unwrap();
        let values: Vec<(i64, f64)> = series.iter().map(|p| (p.at, p.value)).collect();
        assert_eq!(
            values,
            vec![
                (midnight, 5.0),
                (midnight + MS_PER_DAY, 0.0),
                (midnight + 2 * MS_PER_DAY, 7.0),
            ]
        );
        assert_eq!(fp.get(stat::RESOLUTION), Some(&Stat::Text("day".into())));
        // latest over a zero day is undefined
        assert!(fp.is_absent(stat::DOD));
        assert_eq!(fp.number(stat::DOD_PREVIOUS), Some(-1.0));
        assert!(!fp.contains(stat::YOY));
        assert!(!fp.contains(stat::TREND));
    }

    #[test]
    fn test_monthly_growth() {
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Month).pair(&date(), &int()),
            &monthly(14),
        );

        // values 100 + i + [5, 0, -5][i % 3] for i in 0..14
        let value = |i: usize| 100.0 + i as f64 + [5.0, 0.0, -5.0][i % 3];
        let g = |x2: f64, x1: f64| (x2 - x1) / x1;
        assert_eq!(fp.series(stat::SERIES).unwrap().len(), 14);
        assert_eq!(fp.number(stat::YOY), Some(g(value(13), value(1))));
        assert_eq!(fp.number(stat::YOY_PREVIOUS), Some(g(value(12), value(0))));
        assert_eq!(fp.number(stat::MOM), Some(g(value(13), value(12))));
        assert_eq!(fp.number(stat::MOM_PREVIOUS), Some(g(value(12), value(11))));
        assert!(!fp.contains(stat::DOD));

        let line = fp.regression(stat::LINEAR_REGRESSION).unwrap();
        assert!(line.slope > 0.0);
    }

    #[test]
    fn test_decomposition_gating() {
        let long = monthly(30);

        let linear = transduce(
            &builder(Computation::Linear, Resolution::Month).pair(&date(), &int()),
            &long,
        );
        assert!(!linear.contains(stat::TREND));
        assert!(!linear.contains(stat::SEASONAL));
        assert!(!linear.contains(stat::RESIDUAL));

        let unbounded = transduce(
            &builder(Computation::Unbounded, Resolution::Month).pair(&date(), &int()),
            &long,
        );
        assert_eq!(unbounded.numbers(stat::TREND).map(<[f64]>::len), Some(30));
        assert_eq!(unbounded.numbers(stat::SEASONAL).map(<[f64]>::len), Some(30));
        assert_eq!(unbounded.numbers(stat::RESIDUAL).map(<[f64]>::len), Some(30));

        let short = transduce(
            &builder(Computation::Unbounded, Resolution::Month).pair(&date(), &int()),
            &monthly(10),
        );
        assert!(!short.contains(stat::TREND));
    }

    #[test]
    fn test_raw_series_has_no_growth() {
        let fp = transduce(
            &builder(Computation::Yolo, Resolution::Raw).pair(&date(), &int()),
            &monthly(30),
        );
        assert_eq!(fp.series(stat::SERIES).unwrap().len(), 30);
        assert_eq!(fp.get(stat::RESOLUTION), Some(&Stat::Text("raw".into())));
        for name in [stat::YOY, stat::MOM, stat::DOD, stat::TREND] {
            assert!(!fp.contains(name), "{}", name);
        }
    }

    #[test]
    fn test_far_future_instant_does_not_fill() {
        let epoch_ms = TypeSignature::new(BaseType::Integer, Some(SemanticType::UnixTimestampMilliseconds));
        let builder = builder(Computation::Yolo, Resolution::Day);
        let pairs = |last: i64| vec![(Value::from(0i64), Value::from(1i64)), (Value::from(last), Value::from(2i64))];

        // about 3000 years of days, past the default grid cap
        let far = 3_000 * 365 * MS_PER_DAY;
        let fp = transduce(&builder.pair(&epoch_ms, &int()), &pairs(far));
        assert!(fp.is_absent(stat::SERIES));
        assert!(fp.is_absent(stat::DOD));
        assert!(fp.is_absent(stat::DOD_PREVIOUS));
        assert!(!fp.contains(stat::TREND));
        assert_eq!(fp.count(stat::COUNT), Some(2));

        // outside the calendar the instant is dropped, leaving one point
        let fp = transduce(&builder.pair(&epoch_ms, &int()), &pairs(i64::MAX));
        let series = fp.series(stat::SERIES).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 1.0);
    }

    #[test]
    fn test_rollup_recurses_into_column_dispatch() {
        let city = TypeSignature::new(BaseType::Text, Some(SemanticType::City));
        let pairs: Vec<Pair> = vec![
            (Value::from("Oslo"), Value::from(1i64)),
            (Value::from("Oslo"), Value::from(3i64)),
            (Value::from("Lima"), Value::from(10i64)),
            (Value::Null, Value::from(4i64)),
        ];
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Day).pair(&city, &int()),
            &pairs,
        );

        assert_eq!(fp.count(stat::COUNT), Some(4));
        assert_eq!(fp.count(stat::NIL_COUNT), Some(1));

        let oslo = fp.group(stat::GROUPS, Some(&Category::from("Oslo"))).unwrap();
        assert_eq!(oslo.count(stat::COUNT), Some(2));
        assert_eq!(oslo.number(stat::MEAN), Some(2.0));
        assert_eq!(oslo.signature(stat::TYPE), Some(Signature::Single(int())));

        let lima = fp.group(stat::GROUPS, Some(&Category::from("Lima"))).unwrap();
        assert_eq!(lima.number(stat::MAX), Some(10.0));

        let unknown = fp.group(stat::GROUPS, None).unwrap();
        assert_eq!(unknown.count(stat::COUNT), Some(1));
    }

    #[test]
    fn test_unmatched_pair_uses_default_bundle() {
        let text = TypeSignature::of(BaseType::Text);
        let fp = transduce(
            &builder(Computation::Linear, Resolution::Day).pair(&text, &int()),
            [(Value::from("x"), Value::Null)],
        );
        assert_eq!(fp.count(stat::COUNT), Some(1));
        assert_eq!(fp.count(stat::NIL_COUNT), Some(1));
        assert_eq!(fp.get(stat::TYPE), Some(&Stat::Absent));
        assert!(fp.contains(stat::ACTUAL_TYPE));
    }
}
