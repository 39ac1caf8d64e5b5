//! Data source capability
//!
//! The engine never talks to a database itself; it asks a [`DataSource`]
//! for the values of one field or for the rows of a dataset. The request
//! carries the query budget of the cost policy (a row limit when only
//! sampling is allowed) and, for paired fields, an optional aggregation.
//!
//! [`MemorySource`] serves in-memory tables and is what the tests run on.

use crate::cost::QueryLevel;
use crate::timeseries::{truncate_to_day, Resolution};
use crate::types::{Field, FieldId, QueryId, SegmentId, TableId};
use crate::value::{Row, Value, MS_PER_DAY};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Budget of a single request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of rows to return
    pub limit: Option<usize>,
    pub level: QueryLevel,
}

/// What a dataset request reads from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetRef {
    Table(TableId),
    SavedQuery(QueryId),
    Segment(SegmentId),
}

/// Sum `numeric` grouped by `datetime` truncated to `unit`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breakout {
    pub datetime: FieldId,
    pub numeric: FieldId,
    pub unit: Resolution,
}

/// A dataset request
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    pub source: DatasetRef,
    /// Columns to return, in order; empty for all of them
    pub fields: Vec<FieldId>,
    pub breakout: Option<Breakout>,
    pub options: QueryOptions,
}

impl QuerySpec {
    pub fn new(source: DatasetRef, options: QueryOptions) -> Self {
        Self {
            source,
            fields: Vec::new(),
            breakout: None,
            options,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldId>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_breakout(mut self, breakout: Breakout) -> Self {
        self.breakout = Some(breakout);
        self
    }
}

/// Columns and rows of a result set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<Field>,
    pub rows: Vec<Row>,
}

impl Rows {
    pub fn new(columns: Vec<Field>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn position(&self, id: FieldId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }
}

/// Where fingerprinted values come from
///
/// Errors are passed through the engine unchanged, boxed in
/// [`FingerprintError::DataSource`](crate::FingerprintError::DataSource).
pub trait DataSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Values of one field, in table order
    fn get_values(&self, field: &Field, options: &QueryOptions) -> Result<Vec<Value>, Self::Error>;

    /// Rows of a dataset
    fn get_rows(&self, spec: &QuerySpec) -> Result<Rows, Self::Error>;
}

impl<D: DataSource + ?Sized> DataSource for &D {
    type Error = D::Error;

    fn get_values(&self, field: &Field, options: &QueryOptions) -> Result<Vec<Value>, Self::Error> {
        (**self).get_values(field, options)
    }

    fn get_rows(&self, spec: &QuerySpec) -> Result<Rows, Self::Error> {
        (**self).get_rows(spec)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemorySourceError {
    #[error("unknown table {0}")]
    UnknownTable(TableId),
    #[error("unknown saved query {0}")]
    UnknownQuery(QueryId),
    #[error("unknown segment {0}")]
    UnknownSegment(SegmentId),
    #[error("{field} is not a column of {source_name}")]
    UnknownField { field: FieldId, source_name: String },
}

type RowFilter = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Tables, saved query results and segments held in memory
///
/// Every request increments [`MemorySource::query_count`].
///
/// ```
/// use flowprint::source::{DataSource, MemorySource, QueryOptions};
/// use flowprint::types::{BaseType, Field, TableId};
/// use flowprint::Value;
///
/// let price = Field::new(1, "price", BaseType::Float, TableId(1));
/// let source = MemorySource::new().with_table(
///     TableId(1),
///     vec![price.clone()],
///     vec![vec![Value::from(1.5)], vec![Value::from(2.0)]],
/// );
///
/// let options = QueryOptions { limit: Some(1), ..Default::default() };
/// let values = source.get_values(&price, &options).unwrap();
/// assert_eq!(values, vec![Value::from(1.5)]);
/// assert_eq!(source.query_count(), 1);
/// ```
#[derive(Default)]
pub struct MemorySource {
    tables: HashMap<TableId, Rows>,
    saved_queries: HashMap<QueryId, Rows>,
    segments: HashMap<SegmentId, (TableId, RowFilter)>,
    queries: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, id: TableId, columns: Vec<Field>, rows: Vec<Row>) -> Self {
        self.tables.insert(id, Rows::new(columns, rows));
        self
    }

    pub fn with_saved_query(mut self, id: QueryId, columns: Vec<Field>, rows: Vec<Row>) -> Self {
        self.saved_queries.insert(id, Rows::new(columns, rows));
        self
    }

    /// Rows of `table` for which `filter` holds
    pub fn with_segment<F>(mut self, id: SegmentId, table: TableId, filter: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.segments.insert(id, (table, Arc::new(filter)));
        self
    }

    /// Number of requests served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn table(&self, id: TableId) -> Result<&Rows, MemorySourceError> {
        self.tables.get(&id).ok_or(MemorySourceError::UnknownTable(id))
    }

    fn resolve(&self, source: DatasetRef) -> Result<(&Rows, Option<&RowFilter>), MemorySourceError> {
        match source {
            DatasetRef::Table(id) => Ok((self.table(id)?, None)),
            DatasetRef::SavedQuery(id) => self
                .saved_queries
                .get(&id)
                .map(|rows| (rows, None))
                .ok_or(MemorySourceError::UnknownQuery(id)),
            DatasetRef::Segment(id) => {
                let (table, filter) = self
                    .segments
                    .get(&id)
                    .ok_or(MemorySourceError::UnknownSegment(id))?;
                Ok((self.table(*table)?, Some(filter)))
            }
        }
    }
}

fn column_of(data: &Rows, field: FieldId, source: DatasetRef) -> Result<usize, MemorySourceError> {
    data.position(field).ok_or_else(|| MemorySourceError::UnknownField {
        field,
        source_name: format!("{:?}", source),
    })
}

fn cell(row: &Row, i: usize) -> Value {
    row.get(i).cloned().unwrap_or(Value::Null)
}

/// First millisecond of the period of `unit` containing `millis`
fn period_start(millis: i64, unit: Resolution) -> Option<i64> {
    match unit {
        Resolution::Raw => Some(millis),
        Resolution::Day => Some(truncate_to_day(millis) * MS_PER_DAY),
        Resolution::Month => {
            let date = DateTime::from_timestamp_millis(millis)?.date_naive();
            let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
            Some(first.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
        }
    }
}

fn breakout(data: &Rows, rows: Vec<&Row>, spec: &Breakout, source: DatasetRef) -> Result<Rows, MemorySourceError> {
    let dt = column_of(data, spec.datetime, source)?;
    let num = column_of(data, spec.numeric, source)?;
    let semantic = data.columns[dt].semantic_type;

    let mut sums: BTreeMap<i64, f64> = BTreeMap::new();
    for row in rows {
        let Some(at) = cell(row, dt)
            .as_epoch_millis(semantic)
            .and_then(|ms| period_start(ms, spec.unit))
        else {
            continue;
        };
        let sum = sums.entry(at).or_insert(0.0);
        if let Some(v) = cell(row, num).as_f64() {
            *sum += v;
        }
    }

    let rows = sums
        .into_iter()
        .filter_map(|(at, sum)| {
            let at: DateTime<Utc> = DateTime::from_timestamp_millis(at)?;
            Some(vec![Value::DateTime(at), Value::Float(sum)])
        })
        .collect();
    Ok(Rows::new(
        vec![data.columns[dt].clone(), data.columns[num].clone()],
        rows,
    ))
}

impl DataSource for MemorySource {
    type Error = MemorySourceError;

    fn get_values(&self, field: &Field, options: &QueryOptions) -> Result<Vec<Value>, Self::Error> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        debug!(field = %field.id, limit = ?options.limit, level = ?options.level, "get_values");

        let source = DatasetRef::Table(field.table);
        let data = self.table(field.table)?;
        let i = column_of(data, field.id, source)?;
        Ok(data
            .rows
            .iter()
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|row| cell(row, i))
            .collect())
    }

    fn get_rows(&self, spec: &QuerySpec) -> Result<Rows, Self::Error> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        debug!(
            source = ?spec.source,
            fields = spec.fields.len(),
            breakout = spec.breakout.is_some(),
            limit = ?spec.options.limit,
            "get_rows"
        );

        let (data, filter) = self.resolve(spec.source)?;
        let selected: Vec<&Row> = data
            .rows
            .iter()
            .filter(|row| filter.map_or(true, |f| f(row)))
            .collect();

        let mut out = match &spec.breakout {
            Some(b) => breakout(data, selected, b, spec.source)?,
            None if spec.fields.is_empty() => {
                Rows::new(data.columns.clone(), selected.into_iter().cloned().collect())
            }
            None => {
                let indices = spec
                    .fields
                    .iter()
                    .map(|&id| column_of(data, id, spec.source))
                    .collect::<Result<Vec<_>, _>>()?;
                Rows::new(
                    indices.iter().map(|&i| data.columns[i].clone()).collect(),
                    selected
                        .into_iter()
                        .map(|row| indices.iter().map(|&i| cell(row, i)).collect())
                        .collect(),
                )
            }
        };

        if let Some(limit) = spec.options.limit {
            out.rows.truncate(limit);
        }
        Ok(out)
    }
}
