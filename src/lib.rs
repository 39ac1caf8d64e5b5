//! # Flowprint
//!
//! Streaming, type-aware fingerprints of data columns.
//!
//! A fingerprint is a compact statistical summary of a column (or a pair of
//! columns) computed in a single pass with bounded memory: counts and
//! nils, an approximate distribution, distinct counts, moments, calendar
//! histograms for instants and, for a numeric column over time, a filled
//! series with growth metrics and an optional seasonal decomposition.
//!
//! ## Features
//!
//! - **Reducer algebra**: every statistic is a [`Reducer`](reducer::Reducer);
//!   fuse, pre-step, post-complete and rollup compose them into one pass
//! - **Type dispatch**: the column's type signature picks the statistics,
//!   most specific pattern first, with a default bundle for the rest
//! - **Sketches**: HyperLogLog distinct counts, centroid histograms for
//!   numbers, capped histograms for categories
//! - **Cost policy**: a [`CostPolicy`] bounds both the rows requested from
//!   the data source and the algorithms that may run
//!
//! ## Quick Start
//!
//! ```rust
//! use flowprint::prelude::*;
//!
//! let price = Field::new(1, "price", BaseType::Float, TableId(1));
//! let values = [9.5, 12.0, 7.25, 12.0].map(Value::from);
//!
//! let result = flowprint::engine::fingerprint_values(CostPolicy::linear(), &price, values);
//! let fp = &result.fingerprint;
//!
//! assert_eq!(fp.count(stat::COUNT), Some(4));
//! assert_eq!(fp.number(stat::MAX), Some(12.0));
//! assert_eq!(fp.number(stat::CARDINALITY), Some(3.0));
//! ```
//!
//! ## Data sources
//!
//! The [`Engine`] reads through a [`DataSource`](source::DataSource);
//! failures of the source are returned unchanged inside
//! [`FingerprintError::DataSource`]:
//!
//! ```rust
//! use flowprint::prelude::*;
//!
//! let ts = Field::new(1, "at", BaseType::DateTime, TableId(1));
//! let other = Field::new(2, "n", BaseType::Integer, TableId(2));
//! let engine = Engine::new(MemorySource::new());
//!
//! let err = engine
//!     .multifield_fingerprint(CostPolicy::linear(), Resolution::Month, &ts, &other)
//!     .unwrap_err();
//! assert!(err.is_precondition());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialize fingerprints, (de)serialize configuration and
//!   cost policies

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core traits always available
pub mod traits;

pub mod config;
pub mod cost;
pub mod error;
pub mod types;
pub mod value;

pub mod cardinality;
pub mod histogram;
pub mod reducer;
pub mod statistics;
pub mod timeseries;

pub mod engine;
pub mod fingerprint;
pub mod source;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::cardinality::HyperLogLog;
    pub use crate::engine::{Engine, FieldFingerprint, Fingerprintable};
    pub use crate::fingerprint::{stat, Fingerprint, FingerprintBuilder, Stat};
    pub use crate::histogram::{CategoricalHistogram, NumericHistogram};
    pub use crate::reducer::{transduce, Reducer, ReducerExt};
    pub use crate::source::{DataSource, MemorySource};
    pub use crate::timeseries::Resolution;
    pub use crate::types::{BaseType, Field, SemanticType, TableId, TypeSignature};
    pub use crate::{Computation, Config, CostPolicy, FingerprintError, QueryLevel, Value};
}

pub use config::Config;
pub use cost::{Computation, CostPolicy, QueryLevel};
pub use engine::Engine;
pub use error::{FingerprintError, MergeError, Result};
pub use fingerprint::{Fingerprint, Stat};
pub use value::{Category, Row, Value};
