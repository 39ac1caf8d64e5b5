//! Fingerprint entry points
//!
//! An [`Engine`] pairs a [`DataSource`] with a [`Config`]. Each request
//! takes a [`CostPolicy`], turns it into query options for the source and
//! runs the matching fingerprinter over what comes back. Requests share no
//! mutable state, so one engine can serve many threads.

use crate::config::Config;
use crate::cost::CostPolicy;
use crate::error::{FingerprintError, Result};
use crate::fingerprint::{column_pattern, pair_pattern, Fingerprint, FingerprintBuilder};
use crate::reducer::transduce;
use crate::source::{Breakout, DataSource, DatasetRef, QuerySpec, Rows};
use crate::timeseries::Resolution;
use crate::types::{Field, SavedQuery, Segment, Table};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Fingerprint of one field, with the field it describes
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldFingerprint {
    pub field: Field,
    pub fingerprint: Fingerprint,
}

/// Fingerprints of two fields keyed by field name
///
/// Fields sharing a name are keyed `name#<field id>` instead; the same
/// field compared with itself gets `name` and `name#2`.
pub type Comparison = BTreeMap<String, FieldFingerprint>;

/// Fingerprint of a field pair plus the fingerprints of both fields
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MultifieldFingerprint {
    pub fingerprint: Fingerprint,
    pub fields: Comparison,
}

/// Something the engine can fingerprint
pub trait Fingerprintable {
    type Output;

    fn fingerprint_with<D: DataSource>(&self, engine: &Engine<D>, policy: CostPolicy) -> Result<Self::Output>;
}

/// Fingerprinting over a data source
///
/// # Example
///
/// ```
/// use flowprint::fingerprint::stat;
/// use flowprint::source::MemorySource;
/// use flowprint::types::{BaseType, Field, TableId};
/// use flowprint::{CostPolicy, Engine, Value};
///
/// let score = Field::new(1, "score", BaseType::Integer, TableId(1));
/// let rows = (1..=4).map(|i| vec![Value::from(i as i64)]).collect();
/// let engine = Engine::new(MemorySource::new().with_table(TableId(1), vec![score.clone()], rows));
///
/// let result = engine.fingerprint(CostPolicy::linear(), &score).unwrap();
/// assert_eq!(result.fingerprint.number(stat::MEAN), Some(2.5));
/// ```
pub struct Engine<D> {
    source: D,
    config: Arc<Config>,
}

impl<D: DataSource> Engine<D> {
    pub fn new(source: D) -> Self {
        Self::with_config(source, Config::default())
    }

    pub fn with_config(source: D, config: Config) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    fn builder(&self, policy: CostPolicy) -> FingerprintBuilder {
        FingerprintBuilder::shared(Arc::clone(&self.config), policy)
    }

    /// Fingerprint a field, table, saved query or segment
    pub fn fingerprint<T: Fingerprintable>(&self, policy: CostPolicy, target: &T) -> Result<T::Output> {
        target.fingerprint_with(self, policy)
    }

    /// Fingerprints of two fields side by side
    pub fn compare_fingerprints(&self, policy: CostPolicy, a: &Field, b: &Field) -> Result<Comparison> {
        let mut out = Comparison::new();
        for (key, field) in comparison_keys(a, b).into_iter().zip([a, b]) {
            out.insert(key, self.fingerprint(policy, field)?);
        }
        Ok(out)
    }

    /// Joint fingerprint of two fields of one table
    ///
    /// Fails with [`FingerprintError::TableMismatch`] before any query when
    /// the fields belong to different tables. A DateTime x Numeric pair is
    /// read aggregated to `resolution` (sums per day or month) unless the
    /// resolution is raw.
    pub fn multifield_fingerprint(
        &self,
        policy: CostPolicy,
        resolution: Resolution,
        a: &Field,
        b: &Field,
    ) -> Result<MultifieldFingerprint> {
        if a.table != b.table {
            return Err(FingerprintError::TableMismatch {
                left: a.name.clone(),
                right: b.name.clone(),
                left_table: a.table,
                right_table: b.table,
            });
        }

        let (sig_a, sig_b) = (a.signature(), b.signature());
        let mut spec = QuerySpec::new(DatasetRef::Table(a.table), policy.query_options(&self.config))
            .with_fields(vec![a.id, b.id]);
        if resolution != Resolution::Raw && sig_a.is_datetime() && sig_b.is_numeric() {
            spec = spec.with_breakout(Breakout {
                datetime: a.id,
                numeric: b.id,
                unit: resolution,
            });
        }
        debug!(
            left = %a.name,
            right = %b.name,
            pattern = pair_pattern(&sig_a, &sig_b).unwrap_or("default"),
            breakout = spec.breakout.is_some(),
            "multifield fingerprint"
        );

        let rows = self.source.get_rows(&spec).map_err(FingerprintError::data_source)?;
        let pairs = rows.rows.into_iter().map(|row| {
            let mut cells = row.into_iter();
            let left = cells.next().unwrap_or(Value::Null);
            let right = cells.next().unwrap_or(Value::Null);
            (left, right)
        });
        let fingerprint = transduce(
            &self.builder(policy).with_resolution(resolution).pair(&sig_a, &sig_b),
            pairs,
        );

        Ok(MultifieldFingerprint {
            fingerprint,
            fields: self.compare_fingerprints(policy, a, b)?,
        })
    }

    /// Fingerprint values already in hand
    pub fn fingerprint_values<I>(&self, policy: CostPolicy, field: &Field, values: I) -> FieldFingerprint
    where
        I: IntoIterator<Item = Value>,
    {
        field_fingerprint(&self.builder(policy), field, values)
    }

    /// Fingerprint every column of rows already in hand
    pub fn fingerprint_rows(&self, policy: CostPolicy, rows: &Rows) -> BTreeMap<String, Fingerprint> {
        dataset_fingerprint(&self.builder(policy), rows)
    }

    fn dataset(&self, policy: CostPolicy, source: DatasetRef) -> Result<BTreeMap<String, Fingerprint>> {
        let spec = QuerySpec::new(source, policy.query_options(&self.config));
        let rows = self.source.get_rows(&spec).map_err(FingerprintError::data_source)?;
        debug!(?source, columns = rows.columns.len(), rows = rows.len(), "fingerprinting dataset");
        Ok(dataset_fingerprint(&self.builder(policy), &rows))
    }
}

fn comparison_keys(a: &Field, b: &Field) -> [String; 2] {
    if a.name != b.name {
        [a.name.clone(), b.name.clone()]
    } else if a.id != b.id {
        [format!("{}#{}", a.name, a.id.0), format!("{}#{}", b.name, b.id.0)]
    } else {
        [a.name.clone(), format!("{}#2", b.name)]
    }
}

/// [`Engine::fingerprint_values`] with the default configuration
pub fn fingerprint_values<I>(policy: CostPolicy, field: &Field, values: I) -> FieldFingerprint
where
    I: IntoIterator<Item = Value>,
{
    field_fingerprint(&FingerprintBuilder::new(Config::default(), policy), field, values)
}

/// [`Engine::fingerprint_rows`] with the default configuration
pub fn fingerprint_rows(policy: CostPolicy, rows: &Rows) -> BTreeMap<String, Fingerprint> {
    dataset_fingerprint(&FingerprintBuilder::new(Config::default(), policy), rows)
}

fn field_fingerprint<I>(builder: &FingerprintBuilder, field: &Field, values: I) -> FieldFingerprint
where
    I: IntoIterator<Item = Value>,
{
    FieldFingerprint {
        field: field.clone(),
        fingerprint: transduce(&builder.column(&field.signature()), values),
    }
}

fn dataset_fingerprint(builder: &FingerprintBuilder, rows: &Rows) -> BTreeMap<String, Fingerprint> {
    transduce(&builder.dataset(&rows.columns), &rows.rows)
}

impl Fingerprintable for Field {
    type Output = FieldFingerprint;

    fn fingerprint_with<D: DataSource>(&self, engine: &Engine<D>, policy: CostPolicy) -> Result<FieldFingerprint> {
        let options = policy.query_options(engine.config());
        let signature = self.signature();
        debug!(
            field = %self.name,
            %signature,
            pattern = column_pattern(&signature).unwrap_or("default"),
            "fingerprinting field"
        );
        let values = engine
            .source
            .get_values(self, &options)
            .map_err(FingerprintError::data_source)?;
        Ok(engine.fingerprint_values(policy, self, values))
    }
}

impl Fingerprintable for Table {
    type Output = BTreeMap<String, Fingerprint>;

    fn fingerprint_with<D: DataSource>(&self, engine: &Engine<D>, policy: CostPolicy) -> Result<Self::Output> {
        engine.dataset(policy, DatasetRef::Table(self.id))
    }
}

impl Fingerprintable for SavedQuery {
    type Output = BTreeMap<String, Fingerprint>;

    fn fingerprint_with<D: DataSource>(&self, engine: &Engine<D>, policy: CostPolicy) -> Result<Self::Output> {
        engine.dataset(policy, DatasetRef::SavedQuery(self.id))
    }
}

impl Fingerprintable for Segment {
    type Output = BTreeMap<String, Fingerprint>;

    fn fingerprint_with<D: DataSource>(&self, engine: &Engine<D>, policy: CostPolicy) -> Result<Self::Output> {
        engine.dataset(policy, DatasetRef::Segment(self.id))
    }
}
