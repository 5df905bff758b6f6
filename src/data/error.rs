use chrono::NaiveDateTime;
use itertools::Itertools;
use thiserror::Error;

/// Errors raised while turning a raw CSV into a normalized price series.
///
/// Only structural problems surface here. A single unparseable price reading
/// is not an error: it becomes a gap and is repaired by the normalizer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Schema error: {message} (columns present: [{}])", .columns.iter().join(", "))]
    Schema {
        message: String,
        columns: Vec<String>,
    },

    #[error("Parse error at row {row}: cannot read timestamp from {value:?} ({reason})")]
    Parse {
        row: usize,
        value: String,
        reason: String,
    },

    #[error("Duplicate timestamp {timestamp} in source data")]
    DuplicateTimestamp { timestamp: NaiveDateTime },

    #[error("Column '{column}' has no numeric values to fill gaps from")]
    EmptySeries { column: String },

    #[error("Insufficient history: {required} observations required, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DataError {
    pub(crate) fn schema(message: impl Into<String>, columns: &[String]) -> Self {
        Self::Schema {
            message: message.into(),
            columns: columns.to_vec(),
        }
    }

    pub(crate) fn parse(row: usize, value: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            row,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type DataResult<T> = std::result::Result<T, DataError>;
