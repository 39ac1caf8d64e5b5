//! Correctness and invariant tests for flowprint
//!
//! These tests exercise the invariants every fingerprint must keep, end to
//! end through the public API. They complement the unit tests in each
//! module by focusing on properties that must always hold.

use flowprint::cardinality::HyperLogLog;
use flowprint::engine::fingerprint_values;
use flowprint::fingerprint::{stat, FingerprintBuilder, Stat};
use flowprint::histogram::{CategoricalHistogram, NumericHistogram};
use flowprint::reducer::{transduce, Count, Fuse, ReducerExt, Rollup, Sketching};
use flowprint::source::{MemorySource, QueryOptions};
use flowprint::statistics::Moments;
use flowprint::timeseries::{fill_timeseries, growth, Resolution};
use flowprint::traits::{CardinalitySketch, Histogram};
use flowprint::types::{BaseType, Field, SemanticType, TableId, TypeSignature};
use flowprint::{Computation, Config, CostPolicy, Engine, QueryLevel, Value};

fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Value> {
    values.into_iter().map(Value::from).collect()
}

fn numeric_field() -> Field {
    Field::new(1, "n", BaseType::Integer, TableId(1))
}

// ============================================================================
// End to end
// ============================================================================

mod end_to_end {
    use super::*;

    #[test]
    fn numeric_column_with_nil() {
        let mut values = ints(1..=5);
        values.push(Value::Null);

        let policy = CostPolicy::new(Computation::Linear, QueryLevel::FullScan);
        let fp = fingerprint_values(policy, &numeric_field(), values).fingerprint;

        assert_eq!(fp.count(stat::COUNT), Some(6));
        assert_eq!(fp.count(stat::NIL_COUNT), Some(1));
        assert_eq!(fp.number(stat::MIN), Some(1.0));
        assert_eq!(fp.number(stat::MAX), Some(5.0));
        assert_eq!(fp.number(stat::MEAN), Some(3.0));
        assert_eq!(fp.flag(stat::POSITIVE_DEFINITE), Some(true));
        assert_eq!(fp.flag(stat::BOUNDED_UNIT), Some(false));
    }

    #[test]
    fn multifield_mismatch_fails_before_any_query() {
        let a = Field::new(1, "created_at", BaseType::DateTime, TableId(1));
        let b = Field::new(2, "total", BaseType::Float, TableId(2));
        let source = MemorySource::new()
            .with_table(TableId(1), vec![a.clone()], vec![])
            .with_table(TableId(2), vec![b.clone()], vec![]);
        let engine = Engine::new(source);

        for resolution in [Resolution::Raw, Resolution::Day, Resolution::Month] {
            let err = engine
                .multifield_fingerprint(CostPolicy::yolo(), resolution, &a, &b)
                .unwrap_err();
            assert!(err.is_precondition(), "{}", err);
        }
        assert_eq!(
            engine.source().query_count(),
            0,
            "a table mismatch must not reach the data source"
        );
    }

    #[test]
    fn every_signature_yields_a_result() {
        let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
        let values = [Value::from(1i64), Value::from("x"), Value::Null, Value::from(true)];

        for base in [
            BaseType::Integer,
            BaseType::BigInteger,
            BaseType::Float,
            BaseType::Decimal,
            BaseType::Boolean,
            BaseType::Text,
            BaseType::Date,
            BaseType::DateTime,
            BaseType::Time,
            BaseType::Unknown,
        ] {
            for semantic in [None, Some(SemanticType::Category), Some(SemanticType::Email)] {
                let sig = TypeSignature::new(base, semantic);
                let fp = transduce(&builder.column(&sig), &values);
                assert_eq!(fp.count(stat::COUNT), Some(4), "{}", sig);
                assert_eq!(fp.count(stat::NIL_COUNT), Some(1), "{}", sig);
            }
        }
    }

    #[test]
    fn degenerate_statistics_do_not_spoil_the_bundle() {
        let fp = fingerprint_values(CostPolicy::linear(), &numeric_field(), ints([0, 0, 0])).fingerprint;

        // mean 0: cv divides by zero
        assert!(fp.is_absent(stat::CV));
        // max 0: min_vs_max divides by zero
        assert!(fp.is_absent(stat::MIN_VS_MAX));
        assert_eq!(fp.number(stat::MEAN), Some(0.0));
        assert_eq!(fp.number(stat::SD), Some(0.0));
        assert_eq!(fp.count(stat::COUNT), Some(3));
    }

    #[test]
    fn sample_policy_limits_rows() {
        let field = numeric_field();
        let rows = (0..50i64).map(|i| vec![Value::from(i)]).collect();
        let engine = Engine::with_config(
            MemorySource::new().with_table(TableId(1), vec![field.clone()], rows),
            Config::default().with_max_sample_rows(20),
        );

        let sampled = engine
            .fingerprint(CostPolicy::new(Computation::Linear, QueryLevel::Sample), &field)
            .unwrap();
        assert_eq!(sampled.fingerprint.count(stat::COUNT), Some(20));

        let full = engine.fingerprint(CostPolicy::linear(), &field).unwrap();
        assert_eq!(full.fingerprint.count(stat::COUNT), Some(50));

        let options = CostPolicy::default().query_options(engine.config());
        assert_eq!(
            options,
            QueryOptions {
                limit: Some(20),
                level: QueryLevel::Sample
            }
        );
    }
}

// ============================================================================
// Histograms
// ============================================================================

mod histograms {
    use super::*;
    use flowprint::traits::QuantileSketch;

    #[test]
    fn numeric_total_count_includes_nils() {
        let mut h = NumericHistogram::new(50.0);
        let mut pushed = 0u64;
        for i in 0..5_000 {
            let v = match i % 7 {
                0 => None,
                1 => Some(f64::NAN),
                _ => Some((i as f64).sin() * 1_000.0),
            };
            h.insert(v);
            pushed += 1;
        }

        assert_eq!(h.total_count(), pushed);
        assert_eq!(h.observed_count() + h.missing_count(), pushed);
        assert_eq!(
            h.bins().iter().map(|b| b.weight).sum::<u64>(),
            h.observed_count()
        );
    }

    #[test]
    fn categorical_total_count_survives_overflow() {
        let mut h = CategoricalHistogram::new(10);
        for i in 0..1_000u64 {
            h.insert((i % 13 != 0).then_some(i % 37));
        }

        assert_eq!(h.total_count(), 1_000);
        assert_eq!(
            h.bins().iter().map(|b| b.weight).sum::<u64>(),
            h.observed_count()
        );
        assert!(h.bins().len() <= 10);
    }

    #[test]
    fn single_bin_entropy_is_zero() {
        let mut numbers = NumericHistogram::new(100.0);
        let mut categories = CategoricalHistogram::new(8);
        for _ in 0..1_000 {
            numbers.insert(Some(42.0));
            categories.insert(Some("only"));
        }
        assert_eq!(numbers.entropy(), 0.0);
        assert_eq!(categories.entropy(), 0.0);
    }

    #[test]
    fn uniform_entropy_is_ln_n() {
        for n in [2u64, 5, 26, 100] {
            let mut h = CategoricalHistogram::new(1_000);
            for i in 0..n * 40 {
                h.insert(Some(i % n));
            }
            let expected = (n as f64).ln();
            assert!(
                (h.entropy() - expected).abs() < 1e-9,
                "n={} entropy={} expected={}",
                n,
                h.entropy(),
                expected
            );
        }
    }

    #[test]
    fn median_and_mean_within_bounds() {
        let mut h = NumericHistogram::new(100.0);
        let mut m = Moments::new();
        for i in 0..10_000 {
            let v = ((i * 7_919) % 10_007) as f64 - 5_000.0;
            h.insert(Some(v));
            m.add(v);
        }
        let (min, max) = (h.min().unwrap(), h.max().unwrap());
        let median = h.median().unwrap();
        let mean = m.mean().unwrap();

        assert!(min <= median && median <= max);
        assert!(min <= mean && mean <= max);
        assert_eq!(min, m.min().unwrap());
        assert_eq!(max, m.max().unwrap());
    }
}

// ============================================================================
// Cardinality
// ============================================================================

mod cardinality {
    use super::*;

    fn distinct_column(k: i64) -> Vec<Value> {
        ints(0..k)
    }

    #[test]
    fn estimate_within_one_percent() {
        for k in [100i64, 10_000] {
            let fp = fingerprint_values(CostPolicy::linear(), &numeric_field(), distinct_column(k)).fingerprint;
            let estimate = fp.number(stat::CARDINALITY).unwrap();
            let error = (estimate - k as f64).abs() / k as f64;
            assert!(error < 0.01, "k={} estimate={}", k, estimate);
        }
    }

    #[test]
    fn estimate_within_one_percent_at_one_million() {
        let mut hll = HyperLogLog::with_error_bound(Config::default().cardinality_error);
        let k = 1_000_000u64;
        for i in 0..k {
            hll.insert_bytes(&i.to_le_bytes());
        }
        let error = (hll.estimate() - k as f64).abs() / k as f64;
        assert!(error < 0.01, "estimate={}", hll.estimate());
    }

    #[test]
    fn all_distinct_threshold() {
        let check = |values: Vec<Value>, expected: bool| {
            let fp = fingerprint_values(CostPolicy::linear(), &numeric_field(), values).fingerprint;
            assert_eq!(
                fp.flag(stat::ALL_DISTINCT),
                Some(expected),
                "ratio={:?}",
                fp.number(stat::CARDINALITY_VS_COUNT)
            );
        };

        check(distinct_column(10_000), true);

        // one repeated value among 10,000 rows
        let mut repeated = distinct_column(9_999);
        repeated.push(Value::from(0i64));
        check(repeated, true);

        let mut boundary = distinct_column(99);
        boundary.push(Value::from(7i64));
        check(boundary, true);

        let mut below = distinct_column(98);
        below.extend(ints([3, 4]));
        check(below, false);
    }

    #[test]
    fn nils_count_against_distinctness() {
        let mut values = distinct_column(98);
        values.extend([Value::Null, Value::Null]);
        let fp = fingerprint_values(CostPolicy::linear(), &numeric_field(), values).fingerprint;
        assert_eq!(fp.number(stat::CARDINALITY), Some(98.0));
        assert_eq!(fp.flag(stat::ALL_DISTINCT), Some(false));
    }
}

// ============================================================================
// Time series
// ============================================================================

mod timeseries {
    use super::*;
    use chrono::{Duration, Months, TimeZone, Utc};

    fn pair_builder(computation: Computation, resolution: Resolution) -> FingerprintBuilder {
        FingerprintBuilder::new(
            Config::default(),
            CostPolicy::new(computation, QueryLevel::FullScan),
        )
        .with_resolution(resolution)
    }

    fn monthly(n: u32) -> Vec<(Value, Value)> {
        let start = Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| (Value::from(start + Months::new(i)), Value::from(i as i64 % 12)))
            .collect()
    }

    fn sigs() -> (TypeSignature, TypeSignature) {
        (
            TypeSignature::of(BaseType::Date),
            TypeSignature::of(BaseType::Integer),
        )
    }

    #[test]
    fn daily_fill_zero_fills_gaps() {
        assert_eq!(
            fill_timeseries(&[(0, 5.0), (2, 7.0)], Resolution::Day, 3),
            Some(vec![(0, 5.0), (1, 0.0), (2, 7.0)])
        );
    }

    #[test]
    fn wide_span_is_not_filled() {
        let cap = Config::default().max_series_points;
        let span = cap as i64;
        assert_eq!(fill_timeseries(&[(0, 1.0), (span, 2.0)], Resolution::Day, cap), None);
        assert_eq!(
            fill_timeseries(&[(0, 1.0), (span - 1, 2.0)], Resolution::Day, cap).map(|s| s.len()),
            Some(cap)
        );
    }

    #[test]
    fn growth_sign_law() {
        let cases = [(5.0, 2.0), (2.0, 5.0), (-1.0, -4.0), (-4.0, -1.0), (3.0, -2.0), (-3.0, 2.0)];
        for (x2, x1) in cases {
            // dividing by x1 and multiplying by sign(x1) cancel out, so the
            // sign follows the direction of change even for a negative base
            let g = growth(Some(x2), Some(x1)).unwrap();
            assert_eq!(g.signum(), (x2 - x1).signum(), "growth({}, {})", x2, x1);
            assert_eq!(g.abs(), ((x2 - x1) / x1).abs());
        }
        assert_eq!(growth(Some(1.0), Some(0.0)), None);
        assert_eq!(growth(None, Some(1.0)), None);
        assert_eq!(growth(Some(1.0), None), None);
    }

    #[test]
    fn decomposition_gated_by_computation() {
        let (a, b) = sigs();
        for (computation, expected) in [
            (Computation::Linear, false),
            (Computation::Unbounded, true),
            (Computation::Yolo, true),
        ] {
            let fp = transduce(
                &pair_builder(computation, Resolution::Month).pair(&a, &b),
                &monthly(36),
            );
            for name in [stat::TREND, stat::SEASONAL, stat::RESIDUAL] {
                assert_eq!(fp.contains(name), expected, "{:?} {}", computation, name);
            }
        }
    }

    #[test]
    fn decomposition_gated_by_length() {
        let (a, b) = sigs();
        let builder = pair_builder(Computation::Unbounded, Resolution::Month);

        let short = transduce(&builder.pair(&a, &b), &monthly(10));
        assert!(!short.contains(stat::TREND));

        let just_short = transduce(&builder.pair(&a, &b), &monthly(23));
        assert!(!just_short.contains(stat::TREND));

        let enough = transduce(&builder.pair(&a, &b), &monthly(24));
        assert!(enough.contains(stat::TREND));
    }

    #[test]
    fn decomposition_adds_back_up() {
        let (a, b) = sigs();
        let fp = transduce(
            &pair_builder(Computation::Unbounded, Resolution::Month).pair(&a, &b),
            &monthly(48),
        );
        let series = fp.series(stat::SERIES).unwrap();
        let trend = fp.numbers(stat::TREND).unwrap();
        let seasonal = fp.numbers(stat::SEASONAL).unwrap();
        let residual = fp.numbers(stat::RESIDUAL).unwrap();

        for (i, point) in series.iter().enumerate() {
            let rebuilt = trend[i] + seasonal[i] + residual[i];
            assert!((rebuilt - point.value).abs() < 1e-9, "i={}", i);
        }
    }

    #[test]
    fn daily_growth_over_a_gap() {
        let (a, b) = sigs();
        let start = Utc.with_ymd_and_hms(2022, 2, 27, 6, 0, 0).unwrap();
        let pairs = vec![
            (Value::from(start), Value::from(4i64)),
            (Value::from(start + Duration::days(1)), Value::from(2i64)),
            (Value::from(start + Duration::days(2)), Value::from(3i64)),
        ];
        let fp = transduce(
            &pair_builder(Computation::Linear, Resolution::Day).pair(&a, &b),
            &pairs,
        );

        assert_eq!(fp.number(stat::DOD), Some(0.5));
        assert_eq!(fp.number(stat::DOD_PREVIOUS), Some(-0.5));
        assert_eq!(fp.get(stat::RESOLUTION), Some(&Stat::Text("day".into())));
    }
}

// ============================================================================
// Reducer algebra
// ============================================================================

mod reducers {
    use super::*;

    #[test]
    fn fuse_contains_rollup_contains_fuse() {
        let inner = || {
            Fuse::new()
                .with("n", Count::<(u8, f64)>::new().boxed())
                .with(
                    "big",
                    Count::new()
                        .skip_missing()
                        .pre_step(|x: &(u8, f64)| (x.1 > 10.0).then_some(x.1))
                        .boxed(),
                )
        };
        let outer = Fuse::new()
            .with(
                "by_key",
                Rollup::new(|x: &(u8, f64)| x.0, inner)
                    .post_complete(|groups| groups.into_iter().map(|(k, v)| (k, v["big"])).collect::<Vec<_>>())
                    .boxed(),
            )
            .with(
                "total",
                Count::new().post_complete(|n| vec![(0u8, n)]).boxed(),
            );

        let out = transduce(&outer, [(1u8, 5.0), (2, 20.0), (1, 30.0), (2, 40.0), (3, 1.0)]);
        assert_eq!(out["by_key"], vec![(1, 1), (2, 2), (3, 0)]);
        assert_eq!(out["total"], vec![(0, 5)]);
    }

    #[test]
    fn rollup_groups_are_independent() {
        let by_parity = Rollup::new(
            |x: &f64| (*x as i64) % 2 == 0,
            || Sketching::new(Moments::new()),
        );
        let groups = transduce(&by_parity, [1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(groups[&false].len(), 3);
        assert_eq!(groups[&false].mean(), Some(3.0));
        assert_eq!(groups[&true].len(), 2);
        assert_eq!(groups[&true].mean(), Some(3.0));
    }

    #[test]
    fn fingerprinters_are_reusable() {
        let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
        let column = builder.column(&TypeSignature::of(BaseType::Float));

        let a = transduce(&column, [Value::from(1.0)]);
        let b = transduce(&column, [Value::from(2.0), Value::from(3.0)]);
        assert_eq!(a.count(stat::COUNT), Some(1));
        assert_eq!(b.count(stat::COUNT), Some(2));
        assert_eq!(b.number(stat::MIN), Some(2.0));
    }
}
