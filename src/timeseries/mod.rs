//! Time series of a numeric column against a datetime column
//!
//! Instants are normalized to whole days since the epoch (floor of the
//! millisecond epoch divided by the length of a day). A [`Timeseries`]
//! reducer accumulates `(day, value)` points plus a running regression of
//! value on day; on completion it fills the series onto a gap-free daily or
//! monthly grid, computes period-over-period growth and, when the cost
//! policy allows it and there is enough data, a seasonal decomposition.

mod stl;

pub use stl::{decompose, Decomposition};

use crate::config::Config;
use crate::cost::CostPolicy;
use crate::reducer::Reducer;
use crate::statistics::{CoMoments, Regression};
use crate::value::MS_PER_DAY;
use chrono::{Datelike, Months, NaiveDate};
use core::fmt;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Days from 0001-01-01 to 1970-01-01
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

const MONTHS_PER_YEAR: usize = 12;

/// Grid a series is filled onto
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Resolution {
    /// Points as observed, no filling
    Raw,
    #[default]
    Day,
    Month,
}

impl Resolution {
    /// Seasonal period, `None` for raw series
    pub fn period(&self, config: &Config) -> Option<usize> {
        match self {
            Resolution::Raw => None,
            Resolution::Day => Some(config.daily_period),
            Resolution::Month => Some(config.monthly_period),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Raw => "raw",
            Resolution::Day => "day",
            Resolution::Month => "month",
        })
    }
}

/// One point of an output series, at full millisecond precision
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// Milliseconds since the epoch
    pub at: i64,
    pub value: f64,
}

/// Whole days since the epoch, rounding towards negative infinity
pub fn truncate_to_day(epoch_millis: i64) -> i64 {
    epoch_millis.div_euclid(MS_PER_DAY)
}

/// Inverse of [`truncate_to_day`]: the first millisecond of `day`
pub fn pad_to_millis(day: i64) -> i64 {
    day.saturating_mul(MS_PER_DAY)
}

fn day_to_date(day: i64) -> Option<NaiveDate> {
    let days = i32::try_from(day.checked_add(EPOCH_DAYS_FROM_CE)?).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

fn date_to_day(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE
}

/// Fill `points` (day, value) onto the grid of `resolution`
///
/// The grid runs from the first to the last day in `points`, stepping one
/// day or one calendar month. Grid days missing from `points` get `0`; the
/// last value wins for repeated days and days off the grid are dropped.
/// Raw series are returned as given.
///
/// Returns `None` without allocating the grid when it would hold more than
/// `max_points` points, or when a monthly grid starts or ends outside the
/// calendar.
///
/// ```
/// use flowprint::timeseries::{fill_timeseries, Resolution};
///
/// let filled = fill_timeseries(&[(0, 5.0), (2, 7.0)], Resolution::Day, 100);
/// assert_eq!(filled, Some(vec![(0, 5.0), (1, 0.0), (2, 7.0)]));
///
/// assert_eq!(fill_timeseries(&[(0, 1.0), (1_000, 2.0)], Resolution::Day, 100), None);
/// ```
pub fn fill_timeseries(
    points: &[(i64, f64)],
    resolution: Resolution,
    max_points: usize,
) -> Option<Vec<(i64, f64)>> {
    if resolution == Resolution::Raw {
        return Some(points.to_vec());
    }

    let observed: BTreeMap<i64, f64> = points.iter().copied().collect();
    let (Some((&first, _)), Some((&last, _))) =
        (observed.first_key_value(), observed.last_key_value())
    else {
        return Some(Vec::new());
    };

    let len = grid_len(first, last, resolution)?;
    if len > max_points {
        debug!(%resolution, first, last, len, max_points, "series span exceeds grid cap");
        return None;
    }

    Some(
        grid(first, last, resolution)
            .into_iter()
            .map(|day| (day, observed.get(&day).copied().unwrap_or(0.0)))
            .collect(),
    )
}

/// Upper bound on the number of grid points between two days
fn grid_len(first: i64, last: i64, resolution: Resolution) -> Option<usize> {
    let len = match resolution {
        Resolution::Raw => 1,
        Resolution::Day => last.checked_sub(first)?.checked_add(1)?,
        Resolution::Month => {
            let (start, end) = (day_to_date(first)?, day_to_date(last)?);
            let years = i64::from(end.year() - start.year());
            years * MONTHS_PER_YEAR as i64 + i64::from(end.month()) - i64::from(start.month()) + 1
        }
    };
    usize::try_from(len).ok()
}

fn grid(first: i64, last: i64, resolution: Resolution) -> Vec<i64> {
    match resolution {
        Resolution::Raw => vec![first],
        Resolution::Day => (first..=last).collect(),
        Resolution::Month => {
            let Some(start) = day_to_date(first) else {
                return Vec::new();
            };
            (0u32..)
                .map_while(|k| start.checked_add_months(Months::new(k)))
                .map(date_to_day)
                .take_while(|&day| day <= last)
                .collect()
        }
    }
}

/// Sign-aware relative change from `x1` to `x2`
///
/// `sign(x1) * (x2 - x1) / x1`, so growth is positive whenever the value
/// went up, even from a negative base. Absent when either side is absent
/// or `x1` is zero.
///
/// ```
/// use flowprint::timeseries::growth;
///
/// assert_eq!(growth(Some(150.0), Some(100.0)), Some(0.5));
/// assert_eq!(growth(Some(-50.0), Some(-100.0)), Some(0.5));
/// assert_eq!(growth(Some(1.0), Some(0.0)), None);
/// assert_eq!(growth(None, Some(1.0)), None);
/// ```
pub fn growth(x2: Option<f64>, x1: Option<f64>) -> Option<f64> {
    let (x2, x1) = (x2?, x1?);
    if x1 == 0.0 {
        return None;
    }
    let g = x1.signum() * (x2 - x1) / x1;
    g.is_finite().then_some(g)
}

/// Period-over-period growth of a filled series
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrowthMetrics {
    Monthly {
        yoy: Option<f64>,
        yoy_previous: Option<f64>,
        mom: Option<f64>,
        mom_previous: Option<f64>,
    },
    Daily {
        dod: Option<f64>,
        dod_previous: Option<f64>,
    },
}

impl GrowthMetrics {
    /// Growth of the latest values in `values`, `None` for raw series
    pub fn compute(values: &[f64], resolution: Resolution) -> Option<Self> {
        // value `k` periods before the latest
        let ago = |k: usize| {
            values
                .len()
                .checked_sub(k + 1)
                .and_then(|i| values.get(i).copied())
        };

        match resolution {
            Resolution::Raw => None,
            Resolution::Month => Some(GrowthMetrics::Monthly {
                yoy: growth(ago(0), ago(MONTHS_PER_YEAR)),
                yoy_previous: growth(ago(1), ago(MONTHS_PER_YEAR + 1)),
                mom: growth(ago(0), ago(1)),
                mom_previous: growth(ago(1), ago(2)),
            }),
            Resolution::Day => Some(GrowthMetrics::Daily {
                dod: growth(ago(0), ago(1)),
                dod_previous: growth(ago(1), ago(2)),
            }),
        }
    }

    /// Named values, in a fixed order
    pub fn entries(&self) -> Vec<(&'static str, Option<f64>)> {
        match *self {
            GrowthMetrics::Monthly {
                yoy,
                yoy_previous,
                mom,
                mom_previous,
            } => vec![
                ("yoy", yoy),
                ("yoy_previous", yoy_previous),
                ("mom", mom),
                ("mom_previous", mom_previous),
            ],
            GrowthMetrics::Daily { dod, dod_previous } => {
                vec![("dod", dod), ("dod_previous", dod_previous)]
            }
        }
    }
}

/// Completed output of a [`Timeseries`] reducer
#[derive(Clone, Debug, PartialEq)]
pub struct TimeseriesAnalysis {
    pub resolution: Resolution,
    /// Filled series (as observed for raw series), millisecond timestamps;
    /// `None` when the span is too wide to fill
    pub series: Option<Vec<Point>>,
    /// Least-squares line of value on epoch day
    pub regression: Option<Regression>,
    pub growth: Option<GrowthMetrics>,
    /// Present only when the policy and the series length allow it
    pub decomposition: Option<Decomposition>,
}

/// Reducer over `(epoch millis, value)` pairs
///
/// Pairs with a missing instant or a missing value are skipped; their day
/// is zero-filled on completion like any other gap.
#[derive(Clone, Debug)]
pub struct Timeseries {
    resolution: Resolution,
    decompose: bool,
    period: Option<usize>,
    seasonal_window: usize,
    iterations: usize,
    max_points: usize,
}

impl Timeseries {
    pub fn new(resolution: Resolution, policy: &CostPolicy, config: &Config) -> Self {
        Self {
            resolution,
            decompose: policy.allows_unbounded(),
            period: resolution.period(config),
            seasonal_window: config.seasonal_window,
            iterations: config.decomposition_iterations,
            max_points: config.max_series_points,
        }
    }

    fn decomposition(&self, values: &[f64]) -> Option<Decomposition> {
        let period = self.period?;
        if !self.decompose {
            debug!(resolution = %self.resolution, "decomposition not allowed by cost policy");
            return None;
        }
        if values.len() < 2 * period {
            debug!(
                resolution = %self.resolution,
                len = values.len(),
                period,
                "series too short to decompose"
            );
            return None;
        }
        decompose(values, period, self.seasonal_window, self.iterations)
    }
}

impl Reducer for Timeseries {
    type Input = (Option<i64>, Option<f64>);
    type State = (Vec<(i64, f64)>, CoMoments);
    type Output = TimeseriesAnalysis;

    fn init(&self) -> Self::State {
        (Vec::new(), CoMoments::new())
    }

    fn step(&self, state: &mut Self::State, input: &Self::Input) {
        if let (Some(at), Some(value)) = *input {
            if !value.is_finite() {
                return;
            }
            let day = truncate_to_day(at);
            state.0.push((day, value));
            state.1.add(day as f64, value);
        }
    }

    fn complete(&self, (points, regression): Self::State) -> TimeseriesAnalysis {
        let filled = fill_timeseries(&points, self.resolution, self.max_points);
        if filled.is_none() {
            warn!(
                resolution = %self.resolution,
                points = points.len(),
                max_points = self.max_points,
                "series left unfilled"
            );
        }
        let values: Vec<f64> = filled.iter().flatten().map(|&(_, v)| v).collect();

        TimeseriesAnalysis {
            resolution: self.resolution,
            growth: GrowthMetrics::compute(&values, self.resolution),
            decomposition: self.decomposition(&values),
            regression: regression.regression(),
            series: filled.map(|filled| {
                filled
                    .into_iter()
                    .map(|(day, value)| Point {
                        at: pad_to_millis(day),
                        value,
                    })
                    .collect()
            }),
        }
    }
}
