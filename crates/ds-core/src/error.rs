//! Error types for didstat

use thiserror::Error;

use crate::types::Cell;

/// didstat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A requested column is absent from the dataset.
    #[error("missing column: '{column}'")]
    MissingColumn {
        /// Column name as requested by the caller.
        column: String,
    },

    /// One of the four (group, post) cells has no usable observations.
    #[error("empty cell: {cell} has no observations with a numeric metric")]
    EmptyCell {
        /// The first empty cell in canonical order.
        cell: Cell,
    },

    /// Percentage change against a zero baseline.
    #[error("undefined variation for {series}: baseline value is 0")]
    DivideByZero {
        /// Series whose `before` value is zero (e.g. "control").
        series: String,
    },

    /// The regression design matrix is rank-deficient.
    #[error("singular design: {0}")]
    SingularDesign(String),

    /// A group/post indicator outside {0, 1}.
    #[error("column '{column}' row {row}: indicator must be 0 or 1, got {value}")]
    InvalidIndicator {
        /// Indicator column name.
        column: String,
        /// 0-based row index.
        row: usize,
        /// Offending value.
        value: f64,
    },

    /// Tabular input could not be read or decoded.
    #[error("Data error: {0}")]
    Data(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
