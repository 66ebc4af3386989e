// ❗ Error types for loading, validating and writing agreement matrices
//
// The fill and review passes never fail: absence is the universal "unknown"
// sentinel. Everything here comes from I/O or from a broken shape contract.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(String),

    #[error("sheet not found: {0}")]
    Sheet(String),

    #[error("expected at least {expected} leading columns, header has {found}")]
    MissingColumns { expected: usize, found: usize },

    #[error("column {column} header is not a date: {label:?}")]
    BadSlotLabel { column: usize, label: String },

    #[error("slot labels must be strictly increasing months: {previous} then {next}")]
    LabelsNotIncreasing { previous: String, next: String },

    #[error("row {row} has {found} slots, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown step: {0} (expected bridge, propagate, decide, complete or revisions)")]
    UnknownStep(String),
}

pub type Result<T> = std::result::Result<T, FillError>;
