//! Scalar values as delivered by a data source
//!
//! A [`Value`] can be viewed as a number, a category or an instant; each
//! view returns `None` when the value is missing or does not fit, and the
//! fingerprinters count those as missing.

use crate::types::SemanticType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// One cell of a column
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

/// A row of values in column order
pub type Row = Vec<Value>;

/// Hashable, ordered key of a categorical bin
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Category {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Bool(b) => write!(f, "{}", b),
            Category::Integer(i) => write!(f, "{}", i),
            Category::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::Text(s.to_string())
    }
}

impl From<i64> for Category {
    fn from(i: i64) -> Self {
        Category::Integer(i)
    }
}

pub(crate) const MS_PER_DAY: i64 = 86_400_000;

impl Value {
    /// Whether the value counts as missing (`Null`, NaN or an infinity)
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => !f.is_finite(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<Category> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(Category::Bool(*b)),
            Value::Integer(i) => Some(Category::Integer(*i)),
            Value::Float(f) if !f.is_finite() => None,
            Value::Float(f) => Some(Category::Text(f.to_string())),
            Value::Text(s) => Some(Category::Text(s.clone())),
            Value::DateTime(dt) => Some(Category::Text(dt.to_rfc3339())),
        }
    }

    /// Milliseconds since the epoch
    ///
    /// Integers are only instants when the semantic type says so, and only
    /// when they fall inside the calendar `chrono` can represent.
    pub fn as_epoch_millis(&self, semantic: Option<SemanticType>) -> Option<i64> {
        let in_calendar = |ms: i64| DateTime::from_timestamp_millis(ms).map(|_| ms);
        match (self, semantic) {
            (Value::DateTime(dt), _) => Some(dt.timestamp_millis()),
            (Value::Integer(s), Some(SemanticType::UnixTimestampSeconds)) => {
                s.checked_mul(1000).and_then(in_calendar)
            }
            (Value::Integer(ms), Some(SemanticType::UnixTimestampMilliseconds)) => in_calendar(*ms),
            (Value::Text(s), _) => parse_instant(s).map(|dt| dt.timestamp_millis()),
            _ => None,
        }
    }

    pub fn as_datetime(&self, semantic: Option<SemanticType>) -> Option<DateTime<Utc>> {
        self.as_epoch_millis(semantic)
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Stable 64-bit hash used by distinct counting
    ///
    /// Integral floats hash like the matching integer so that a column mixing
    /// `1` and `1.0` counts one distinct value.
    pub fn distinct_hash(&self) -> Option<u64> {
        let mut buf = [0u8; 9];
        let bytes: &[u8] = match self {
            Value::Null => return None,
            Value::Float(f) if !f.is_finite() => return None,
            Value::Bool(b) => {
                buf[0] = 1;
                buf[1] = *b as u8;
                &buf[..2]
            }
            Value::Integer(i) => integer_key(&mut buf, *i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => {
                integer_key(&mut buf, *f as i64)
            }
            Value::Float(f) => {
                // -0.0 and 0.0 are integral and handled above
                buf[0] = 3;
                buf[1..].copy_from_slice(&f.to_bits().to_le_bytes());
                &buf[..]
            }
            Value::Text(s) => return Some(xxh3_64(s.as_bytes())),
            Value::DateTime(dt) => {
                buf[0] = 4;
                buf[1..].copy_from_slice(&dt.timestamp_millis().to_le_bytes());
                &buf[..]
            }
        };
        Some(xxh3_64(bytes))
    }
}

fn integer_key(buf: &mut [u8; 9], i: i64) -> &[u8] {
    buf[0] = 2;
    buf[1..].copy_from_slice(&i.to_le_bytes());
    &buf[..]
}

/// Parse an RFC 3339 instant, a naive `YYYY-MM-DD[ T]HH:MM:SS` or a date
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
