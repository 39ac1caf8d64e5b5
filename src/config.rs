//! Tunable thresholds
//!
//! Every constant that bounds cost or decides a flag lives here so that
//! callers (and tests) can run the engine with alternate thresholds.

/// Engine configuration
///
/// # Example
///
/// ```
/// use flowprint::Config;
///
/// let config = Config::default()
///     .with_max_sample_rows(500)
///     .with_max_categories(64);
///
/// assert_eq!(config.max_sample_rows, 500);
/// assert_eq!(config.all_distinct_threshold, 0.99);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Row cap applied when the cost policy only allows sampling
    pub max_sample_rows: usize,
    /// Target relative error of distinct counts
    pub cardinality_error: f64,
    /// `cardinality / count` at or above which a column is all-distinct
    pub all_distinct_threshold: f64,
    /// Centroid budget of numeric histograms
    pub histogram_compression: f64,
    /// Maximum number of categories tracked by categorical histograms
    pub max_categories: usize,
    /// Ranks reported under `percentiles`
    pub percentiles: Vec<f64>,
    /// Seasonal period of daily series
    pub daily_period: usize,
    /// Seasonal period of monthly series
    pub monthly_period: usize,
    /// LOESS window of the cycle-subseries smoother (odd, at least 7)
    pub seasonal_window: usize,
    /// Passes of the decomposition inner loop
    pub decomposition_iterations: usize,
    /// Longest grid a time series is filled onto; wider spans are not filled
    pub max_series_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_sample_rows: 10_000,
            cardinality_error: 0.01,
            all_distinct_threshold: 0.99,
            histogram_compression: 100.0,
            max_categories: 1_000,
            percentiles: (1..10).map(|i| i as f64 / 10.0).collect(),
            daily_period: 52,
            monthly_period: 12,
            seasonal_window: 7,
            decomposition_iterations: 2,
            max_series_points: 100_000,
        }
    }
}

impl Config {
    pub fn with_max_sample_rows(mut self, rows: usize) -> Self {
        self.max_sample_rows = rows;
        self
    }

    pub fn with_cardinality_error(mut self, error: f64) -> Self {
        self.cardinality_error = error;
        self
    }

    pub fn with_all_distinct_threshold(mut self, threshold: f64) -> Self {
        self.all_distinct_threshold = threshold;
        self
    }

    pub fn with_histogram_compression(mut self, compression: f64) -> Self {
        self.histogram_compression = compression;
        self
    }

    pub fn with_max_categories(mut self, categories: usize) -> Self {
        self.max_categories = categories;
        self
    }

    pub fn with_percentiles(mut self, ranks: Vec<f64>) -> Self {
        self.percentiles = ranks;
        self
    }

    pub fn with_periods(mut self, daily: usize, monthly: usize) -> Self {
        self.daily_period = daily;
        self.monthly_period = monthly;
        self
    }

    pub fn with_seasonal_window(mut self, window: usize) -> Self {
        self.seasonal_window = window;
        self
    }

    pub fn with_max_series_points(mut self, points: usize) -> Self {
        self.max_series_points = points;
        self
    }
}
