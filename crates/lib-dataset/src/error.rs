//! Error types for dataset operations.

use thiserror::Error;

/// Errors that can occur while reading, transforming or validating tables.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// I/O error reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent.
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// A column is present that the schema does not declare.
    #[error("Undeclared column '{column}' in {table}")]
    UndeclaredColumn { table: String, column: String },

    /// A cell could not be interpreted as the expected type.
    #[error("Invalid value in column '{column}' at row {row}: {message}")]
    InvalidValue {
        column: String,
        row: usize,
        message: String,
    },

    /// A row has a different number of cells than the header.
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// A join key appears more than once where it must be unique.
    #[error("Duplicate key '{key}' in {table}")]
    DuplicateKey { table: String, key: String },

    /// Both sides of a join carry the same non-key column.
    #[error("Column '{0}' exists on both sides of the join")]
    ColumnCollision(String),

    /// Not enough samples to compute a statistic.
    #[error("Insufficient samples for {what}: need {needed}, got {got}")]
    InsufficientSamples {
        what: String,
        needed: usize,
        got: usize,
    },

    /// A requested row or record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl DatasetError {
    /// Create a missing column error.
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(column: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            row,
            message: message.into(),
        }
    }

    /// Create an insufficient samples error.
    pub fn insufficient(what: impl Into<String>, needed: usize, got: usize) -> Self {
        Self::InsufficientSamples {
            what: what.into(),
            needed,
            got,
        }
    }
}

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
