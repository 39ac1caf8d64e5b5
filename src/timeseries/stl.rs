//! Seasonal-trend decomposition by LOESS
//!
//! The inner loop of STL (Cleveland et al., 1990) without robustness
//! weights:
//!
//! 1. detrend
//! 2. smooth each cycle-subseries with LOESS, extended one period on
//!    both ends
//! 3. low-pass filter the smoothed cycles (two moving averages of the
//!    period, one of 3, then LOESS) and subtract it to get the seasonal
//!    component
//! 4. deseasonalize and smooth with LOESS to get the trend
//!
//! The remainder is whatever trend and seasonal do not explain, so the
//! three components always add back up to the input.

/// Trend, seasonal and remainder components aligned to the input series
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

impl Decomposition {
    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }
}

/// Decompose `values` with seasonal `period`
///
/// Returns `None` when the period is shorter than 2 or the series holds
/// fewer than two full periods.
///
/// ```
/// use flowprint::timeseries::decompose;
///
/// let series: Vec<f64> = (0..36)
///     .map(|i| 10.0 + i as f64 + [3.0, 0.0, -3.0][i % 3])
///     .collect();
///
/// let parts = decompose(&series, 3, 7, 2).unwrap();
/// let rebuilt = parts.trend[5] + parts.seasonal[5] + parts.residual[5];
/// assert!((rebuilt - series[5]).abs() < 1e-9);
/// ```
pub fn decompose(
    values: &[f64],
    period: usize,
    seasonal_window: usize,
    iterations: usize,
) -> Option<Decomposition> {
    let n = values.len();
    if period < 2 || n < 2 * period {
        return None;
    }

    let ns = next_odd(seasonal_window.max(3) as f64);
    let nl = next_odd(period as f64);
    let nt = next_odd(1.5 * period as f64 / (1.0 - 1.5 / ns as f64));

    let mut trend = vec![0.0; n];
    let mut seasonal = vec![0.0; n];

    for _ in 0..iterations.max(1) {
        let detrended: Vec<f64> = values.iter().zip(&trend).map(|(y, t)| y - t).collect();

        let cycles = smooth_cycle_subseries(&detrended, period, ns);

        let low_pass = moving_average(&cycles, period);
        let low_pass = moving_average(&low_pass, period);
        let low_pass = moving_average(&low_pass, 3);
        let low_pass = loess(&low_pass, nl);

        seasonal = cycles[period..period + n]
            .iter()
            .zip(&low_pass)
            .map(|(c, l)| c - l)
            .collect();

        let deseasonalized: Vec<f64> = values.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
        trend = loess(&deseasonalized, nt);
    }

    let residual = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, t), s)| y - t - s)
        .collect();

    Some(Decomposition {
        trend,
        seasonal,
        residual,
    })
}

/// Smallest odd integer at or above `x`
fn next_odd(x: f64) -> usize {
    let n = x.ceil().max(1.0) as usize;
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Smooth every cycle-subseries and extend each by one point on both ends
///
/// The result has `values.len() + 2 * period` entries: position `i` of the
/// input maps to `i + period`.
fn smooth_cycle_subseries(values: &[f64], period: usize, window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n + 2 * period];

    for phase in 0..period {
        let sub: Vec<f64> = values.iter().skip(phase).step_by(period).copied().collect();
        let k = sub.len();
        if k == 0 {
            continue;
        }

        let mut smoothed = Vec::with_capacity(k + 2);
        smoothed.push(loess_at(&sub, window, -1.0));
        for j in 0..k {
            smoothed.push(loess_at(&sub, window, j as f64).or(Some(sub[j])));
        }
        smoothed.push(loess_at(&sub, window, k as f64));

        // extrapolated ends fall back to their neighbours
        if smoothed[0].is_none() {
            smoothed[0] = smoothed[1];
        }
        if smoothed[k + 1].is_none() {
            smoothed[k + 1] = smoothed[k];
        }

        for (i, value) in smoothed.into_iter().enumerate() {
            out[i * period + phase] = value.unwrap_or(0.0);
        }
    }

    out
}

/// Moving average of width `width`; the output is `width - 1` shorter
fn moving_average(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || values.len() < width {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - width + 1);
    let mut sum: f64 = values[..width].iter().sum();
    out.push(sum / width as f64);
    for i in width..values.len() {
        sum += values[i] - values[i - width];
        out.push(sum / width as f64);
    }
    out
}

/// LOESS smooth evaluated at every position, keeping the input where the
/// fit is undefined
fn loess(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| loess_at(values, window, i as f64).unwrap_or(values[i]))
        .collect()
}

/// Local linear fit with tricube weights over the `window` positions
/// nearest to `x`
///
/// Positions are `0..values.len()`; `x` may lie outside that range. When
/// the window is wider than the series, the bandwidth grows by half the
/// difference. Returns `None` if every weight is zero.
fn loess_at(values: &[f64], window: usize, x: f64) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let q = window.max(1);
    let (left, right) = if q >= n {
        (0, n - 1)
    } else {
        let center = x.round().clamp(0.0, (n - 1) as f64) as usize;
        let left = center.saturating_sub((q - 1) / 2).min(n - q);
        (left, left + q - 1)
    };

    let mut h = (x - left as f64).max(right as f64 - x);
    if q > n {
        h += ((q - n) / 2) as f64;
    }

    let upper = 0.999 * h;
    let lower = 0.001 * h;
    let mut weights: Vec<f64> = (left..=right)
        .map(|j| {
            let r = (j as f64 - x).abs();
            if r > upper {
                0.0
            } else if r <= lower {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    weights.iter_mut().for_each(|w| *w /= total);

    let a: f64 = weights
        .iter()
        .zip(left..=right)
        .map(|(w, j)| w * j as f64)
        .sum();
    let c: f64 = weights
        .iter()
        .zip(left..=right)
        .map(|(w, j)| w * (j as f64 - a).powi(2))
        .sum();

    if c.sqrt() > 0.001 * (n - 1) as f64 {
        let b = (x - a) / c;
        for (w, j) in weights.iter_mut().zip(left..=right) {
            *w *= b * (j as f64 - a) + 1.0;
        }
    }

    Some(
        weights
            .iter()
            .zip(&values[left..=right])
            .map(|(w, y)| w * y)
            .sum(),
    )
}
