//! Error types
//!
//! Only two things can make a fingerprint request fail: a precondition
//! violation on the request itself, or a failure reported by the data
//! source. Numeric degeneracies (division by zero, empty input) are never
//! errors; they surface as absent statistics instead.

use crate::types::TableId;
use thiserror::Error;

/// Error during sketch merge operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Sketches have incompatible configurations
    #[error("incompatible config: expected {expected}, found {found}")]
    IncompatibleConfig { expected: String, found: String },
}

/// Error returned by the fingerprint entry points
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Paired fingerprints need both fields to live in the same table
    #[error(
        "fields `{left}` and `{right}` belong to different tables ({left_table} vs {right_table})"
    )]
    TableMismatch {
        left: String,
        right: String,
        left_table: TableId,
        right_table: TableId,
    },

    /// The data source failed; the original error is kept as the source
    #[error("data source request failed: {0}")]
    DataSource(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl FingerprintError {
    pub(crate) fn data_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FingerprintError::DataSource(Box::new(err))
    }

    /// Check whether this is a precondition failure rather than an upstream one
    pub fn is_precondition(&self) -> bool {
        matches!(self, FingerprintError::TableMismatch { .. })
    }
}

pub type Result<T, E = FingerprintError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("timeout after {0}ms")]
    struct Timeout(u64);

    #[test]
    fn test_merge_error_display() {
        let err = MergeError::IncompatibleConfig {
            expected: "precision=14".into(),
            found: "precision=12".into(),
        };
        assert_eq!(
            err.to_string(),
            "incompatible config: expected precision=14, found precision=12"
        );
    }

    #[test]
    fn test_data_source_error_keeps_source() {
        let err = FingerprintError::data_source(Timeout(500));
        assert!(!err.is_precondition());

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "timeout after 500ms");
        assert!(source.downcast_ref::<Timeout>().is_some());
    }

    #[test]
    fn test_table_mismatch_message() {
        let err = FingerprintError::TableMismatch {
            left: "created_at".into(),
            right: "total".into(),
            left_table: TableId(1),
            right_table: TableId(2),
        };
        assert!(err.is_precondition());
        assert!(err.to_string().contains("created_at"));
        assert!(err.to_string().contains("table#2"));
    }
}
