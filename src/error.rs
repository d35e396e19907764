use chrono::NaiveDate;
use thiserror::Error;

/// Structural errors raised by the table engine.
///
/// Data-quality problems (a cell that does not parse as a number or date)
/// are never reported here; they only change how a column is classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("column '{column}' does not exist in the table")]
    InvalidColumn { column: String },

    #[error("column '{column}' appears more than once")]
    DuplicateColumn { column: String },

    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{column}' cannot be used as {role}: expected a {expected} column")]
    IncompatibleAxis {
        column: String,
        role: &'static str,
        expected: &'static str,
    },

    #[error("shifting {date} by {days} days leaves the supported calendar range")]
    DateOutOfRange { date: NaiveDate, days: i64 },
}

impl EngineError {
    pub(crate) fn invalid_column(column: &str) -> Self {
        EngineError::InvalidColumn {
            column: column.to_string(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
