//! Cost policy
//!
//! A [`CostPolicy`] pairs a computation budget with a query budget. The
//! computation budget gates which algorithms run; the query budget decides
//! how rows may be fetched from the data source.

use crate::config::Config;
use crate::source::QueryOptions;

/// Computation budget
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Computation {
    /// Single-pass, O(n) statistics only
    #[default]
    Linear,
    /// Also allows seasonal decomposition
    Unbounded,
    /// Anything goes
    Yolo,
}

/// Query budget
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum QueryLevel {
    /// Only cached results may be used
    Cache,
    /// At most [`Config::max_sample_rows`] rows are requested
    #[default]
    Sample,
    /// Every row may be scanned
    FullScan,
    /// Full scans that may also join other tables
    Joins,
}

/// Immutable cost ceiling for one fingerprint request
///
/// # Example
///
/// ```
/// use flowprint::{Computation, CostPolicy, QueryLevel};
///
/// let policy = CostPolicy::new(Computation::Unbounded, QueryLevel::Sample);
/// assert!(policy.allows_unbounded());
/// assert!(!policy.allows_yolo());
/// assert!(policy.sample_only());
/// assert!(!policy.allows_full_scan());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostPolicy {
    pub computation: Computation,
    pub query: QueryLevel,
}

impl CostPolicy {
    pub fn new(computation: Computation, query: QueryLevel) -> Self {
        Self { computation, query }
    }

    /// Linear computation over a full scan
    pub fn linear() -> Self {
        Self::new(Computation::Linear, QueryLevel::FullScan)
    }

    /// Everything allowed
    pub fn yolo() -> Self {
        Self::new(Computation::Yolo, QueryLevel::Joins)
    }

    pub fn is_linear_only(&self) -> bool {
        self.computation == Computation::Linear
    }

    pub fn allows_unbounded(&self) -> bool {
        matches!(self.computation, Computation::Unbounded | Computation::Yolo)
    }

    pub fn allows_yolo(&self) -> bool {
        self.computation == Computation::Yolo
    }

    pub fn cache_only(&self) -> bool {
        self.query == QueryLevel::Cache
    }

    pub fn sample_only(&self) -> bool {
        self.query == QueryLevel::Sample
    }

    pub fn allows_full_scan(&self) -> bool {
        matches!(self.query, QueryLevel::FullScan | QueryLevel::Joins)
    }

    pub fn allows_joins(&self) -> bool {
        self.query == QueryLevel::Joins
    }

    /// Options passed to the data source for this policy
    ///
    /// Sampling caps the row count; every other level is passed through.
    pub fn query_options(&self, config: &Config) -> QueryOptions {
        QueryOptions {
            limit: self.sample_only().then_some(config.max_sample_rows),
            level: self.query,
        }
    }
}
