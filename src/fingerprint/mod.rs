//! Type-aware fingerprints
//!
//! A [`Fingerprint`] maps statistic names (see [`stat`]) to [`Stat`]
//! values. Which statistics a column gets depends on its type signature:
//! the dispatch tables in [`FingerprintBuilder`] pick one fingerprinter per
//! column (or column pair), most specific pattern first, and every
//! fingerprinter is a single reducer, so a column is read exactly once.
//!
//! Statistics that cannot be computed (division by zero, empty input, too
//! little data) are [`Stat::Absent`] or left out; they never fail the
//! fingerprint.
//!
//! # Example
//!
//! ```
//! use flowprint::fingerprint::{stat, FingerprintBuilder};
//! use flowprint::reducer::transduce;
//! use flowprint::types::{BaseType, TypeSignature};
//! use flowprint::{Config, CostPolicy, Value};
//!
//! let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
//! let fingerprinter = builder.column(&TypeSignature::of(BaseType::Float));
//!
//! let values = [Value::from(1.5), Value::Null, Value::from(2.5)];
//! let fp = transduce(&fingerprinter, &values);
//!
//! assert_eq!(fp.count(stat::COUNT), Some(3));
//! assert_eq!(fp.count(stat::NIL_COUNT), Some(1));
//! assert_eq!(fp.number(stat::MEAN), Some(2.0));
//! ```

mod categorical;
mod datetime;
mod dispatch;
mod numeric;
mod pair;
mod text;

pub use dispatch::{
    ColumnFingerprinter, DatasetFingerprinter, FingerprintBuilder, PairFingerprinter,
};
pub(crate) use dispatch::{column_pattern, pair_pattern};

use crate::histogram::Bin;
use crate::statistics::Regression;
use crate::timeseries::Point;
use crate::types::Signature;
use crate::value::Category;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Statistic names
pub mod stat {
    pub const COUNT: &str = "count";
    pub const NIL_COUNT: &str = "nil_count";
    pub const HAS_NILS: &str = "has_nils";
    pub const NIL_PCT: &str = "nil_pct";
    pub const TYPE: &str = "type";
    pub const ACTUAL_TYPE: &str = "actual_type";

    pub const HISTOGRAM: &str = "histogram";
    pub const PERCENTILES: &str = "percentiles";
    pub const CARDINALITY: &str = "cardinality";
    pub const CARDINALITY_VS_COUNT: &str = "cardinality_vs_count";
    pub const ALL_DISTINCT: &str = "all_distinct";
    pub const ENTROPY: &str = "entropy";

    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const MEAN: &str = "mean";
    pub const MEDIAN: &str = "median";
    pub const VAR: &str = "var";
    pub const SD: &str = "sd";
    pub const RANGE: &str = "range";
    pub const RANGE_VS_SD: &str = "range_vs_sd";
    pub const RANGE_VS_SPREAD: &str = "range_vs_spread";
    pub const CV: &str = "cv";
    pub const MIN_VS_MAX: &str = "min_vs_max";
    pub const SUM: &str = "sum";
    pub const SUM_OF_SQUARES: &str = "sum_of_squares";
    pub const KURTOSIS: &str = "kurtosis";
    pub const SKEWNESS: &str = "skewness";
    pub const POSITIVE_DEFINITE: &str = "positive_definite";
    pub const BOUNDED_UNIT: &str = "bounded_unit";
    pub const BOUNDED_SYMMETRIC_UNIT: &str = "bounded_symmetric_unit";
    pub const PCT_ABOVE_MEAN: &str = "pct_above_mean";

    pub const HISTOGRAM_HOUR: &str = "histogram_hour";
    pub const HISTOGRAM_DAY: &str = "histogram_day";
    pub const HISTOGRAM_MONTH: &str = "histogram_month";
    pub const HISTOGRAM_QUARTER: &str = "histogram_quarter";
    pub const RANGE_DAYS: &str = "range_days";

    pub const CORRELATION: &str = "correlation";
    pub const COVARIANCE: &str = "covariance";
    pub const LINEAR_REGRESSION: &str = "linear_regression";

    pub const SERIES: &str = "series";
    pub const RESOLUTION: &str = "resolution";
    pub const YOY: &str = "yoy";
    pub const YOY_PREVIOUS: &str = "yoy_previous";
    pub const MOM: &str = "mom";
    pub const MOM_PREVIOUS: &str = "mom_previous";
    pub const DOD: &str = "dod";
    pub const DOD_PREVIOUS: &str = "dod_previous";
    pub const TREND: &str = "trend";
    pub const SEASONAL: &str = "seasonal";
    pub const RESIDUAL: &str = "residual";

    pub const GROUPS: &str = "groups";
}

/// Value of one statistic
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Stat {
    /// Undefined for this input (e.g. a ratio with a zero denominator)
    Absent,
    Bool(bool),
    Count(u64),
    Number(f64),
    Numbers(Vec<f64>),
    Instant(DateTime<Utc>),
    Instants(Vec<DateTime<Utc>>),
    Text(String),
    Bins(Vec<Bin<f64>>),
    Categories(Vec<Bin<Category>>),
    Series(Vec<Point>),
    Regression(Regression),
    Type(Signature),
    Groups(Vec<(Option<Category>, Fingerprint)>),
}

impl Stat {
    pub fn is_absent(&self) -> bool {
        matches!(self, Stat::Absent)
    }

    /// Numeric view; counts are widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Stat::Number(x) => Some(*x),
            Stat::Count(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl From<f64> for Stat {
    /// Non-finite numbers are absent
    fn from(x: f64) -> Self {
        if x.is_finite() {
            Stat::Number(x)
        } else {
            Stat::Absent
        }
    }
}

impl From<Option<f64>> for Stat {
    fn from(x: Option<f64>) -> Self {
        x.map_or(Stat::Absent, Stat::from)
    }
}

impl From<bool> for Stat {
    fn from(b: bool) -> Self {
        Stat::Bool(b)
    }
}

impl From<Option<bool>> for Stat {
    fn from(b: Option<bool>) -> Self {
        b.map_or(Stat::Absent, Stat::Bool)
    }
}

impl From<u64> for Stat {
    fn from(n: u64) -> Self {
        Stat::Count(n)
    }
}

impl From<Option<DateTime<Utc>>> for Stat {
    fn from(t: Option<DateTime<Utc>>) -> Self {
        t.map_or(Stat::Absent, Stat::Instant)
    }
}

impl From<Option<Regression>> for Stat {
    fn from(r: Option<Regression>) -> Self {
        r.map_or(Stat::Absent, Stat::Regression)
    }
}

impl From<Signature> for Stat {
    fn from(sig: Signature) -> Self {
        Stat::Type(sig)
    }
}

/// `a / b`, absent when `b` is zero or the quotient is not finite
pub(crate) fn ratio(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    let q = a / b;
    q.is_finite().then_some(q)
}

/// Statistic name to value
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Fingerprint {
    stats: BTreeMap<String, Stat>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a statistic, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Stat>) {
        self.stats.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Stat>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.stats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stats.contains_key(name)
    }

    /// Whether `name` is missing or explicitly absent
    pub fn is_absent(&self, name: &str) -> bool {
        self.get(name).map_or(true, Stat::is_absent)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Stat::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn count(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Stat::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Stat::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn numbers(&self, name: &str) -> Option<&[f64]> {
        match self.get(name)? {
            Stat::Numbers(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn instant(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name)? {
            Stat::Instant(t) => Some(*t),
            _ => None,
        }
    }

    pub fn signature(&self, name: &str) -> Option<Signature> {
        match self.get(name)? {
            Stat::Type(sig) => Some(*sig),
            _ => None,
        }
    }

    pub fn categories(&self, name: &str) -> Option<&[Bin<Category>]> {
        match self.get(name)? {
            Stat::Categories(bins) => Some(bins),
            _ => None,
        }
    }

    pub fn series(&self, name: &str) -> Option<&[Point]> {
        match self.get(name)? {
            Stat::Series(points) => Some(points),
            _ => None,
        }
    }

    pub fn regression(&self, name: &str) -> Option<Regression> {
        match self.get(name)? {
            Stat::Regression(r) => Some(*r),
            _ => None,
        }
    }

    /// Fingerprint of the group keyed `key` under `name`
    pub fn group(&self, name: &str, key: Option<&Category>) -> Option<&Fingerprint> {
        match self.get(name)? {
            Stat::Groups(groups) => groups
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, fp)| fp),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stats.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stat)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every statistic of `other` into `self`
    pub fn extend(&mut self, other: Fingerprint) {
        self.stats.extend(other.stats);
    }
}

impl<N: Into<String>> FromIterator<(N, Stat)> for Fingerprint {
    fn from_iter<T: IntoIterator<Item = (N, Stat)>>(iter: T) -> Self {
        Self {
            stats: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
