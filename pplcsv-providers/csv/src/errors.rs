use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvProviderError {
    #[error("failed to open `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to replace `{path}`: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV input has no header row")]
    MissingHeader,
    #[error("column `{column}` does not exist in the CSV header")]
    ColumnNotFound { column: String },
    #[error("row {row} has no value for column `{column}`")]
    MissingField { row: usize, column: String },
    #[error("column `{column}` already holds data and cannot receive scores")]
    ColumnConflict { column: String },
    #[error("column has {actual} values but the table has {expected} rows")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("invalid delimiter `{raw}`: expected one ASCII character, `\\t`, or `tab`")]
    InvalidDelimiter { raw: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
