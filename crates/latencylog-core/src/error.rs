//! Error taxonomy for ingestion, storage and import.
//!
//! Validation failures name the offending field. Storage failures carry the
//! backing file path and the underlying I/O cause, or the line and column of
//! the row that failed to parse. Nothing here is retried internally.

use std::io;
use std::path::PathBuf;

/// A submitted record violated the schema. Never touches stored state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field `{field}`: {reason}")]
pub struct ValidationError {
    /// Canonical column name of the offending field.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure of the backing CSV file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Opening, appending to or truncating the file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be opened or read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was readable but a row does not match the canonical schema.
    /// `line` is 1-based and counts the header as line 1.
    #[error("malformed row at line {line}{}: {reason}", .column.map(|c| format!(", column `{c}`")).unwrap_or_default())]
    Malformed {
        line: usize,
        column: Option<&'static str>,
        reason: String,
    },
}

impl StoreError {
    /// True for both read-side variants.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Malformed { .. })
    }
}

/// A multi-record append stopped early. The first `appended` records are
/// already on disk and stay there.
#[derive(Debug, thiserror::Error)]
#[error("append stopped after {appended} record(s): {source}")]
pub struct PartialAppend {
    pub appended: usize,
    #[source]
    pub source: StoreError,
}

/// Failure of a single submission through the ingestion gateway.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl IngestError {
    /// Field name for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.field),
            Self::Storage(_) => None,
        }
    }
}

/// Failure of the telemetry blob import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unterminated JSON object starting at byte {offset}")]
    Unterminated { offset: usize },

    #[error("object {index} is not valid JSON: {source}")]
    Json {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("object {index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_message_includes_column() {
        let err = StoreError::Malformed {
            line: 4,
            column: Some("latency_ms"),
            reason: "not a number: \"abc\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 4"));
        assert!(msg.contains("`latency_ms`"));
        assert!(err.is_read());
    }

    #[test]
    fn write_error_keeps_cause() {
        let err = StoreError::Write {
            path: PathBuf::from("/nope/latency_logs.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_read());
    }

    #[test]
    fn ingest_error_exposes_field() {
        let err: IngestError = ValidationError::new("latency_ms", "must be >= 0").into();
        assert_eq!(err.field(), Some("latency_ms"));
        assert_eq!(err.to_string(), "invalid field `latency_ms`: must be >= 0");
    }
}
