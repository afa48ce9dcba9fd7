//! Core traits for didstat
//!
//! The estimator reads columns through [`Tabular`] and never depends on a
//! concrete storage format. `ds-translate` implements it for Arrow-backed
//! datasets.

use crate::Result;

/// Read-only, name-addressed access to a rectangular table.
pub trait Tabular: Send + Sync {
    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Column names in table order.
    fn column_names(&self) -> Vec<String>;

    /// Whether a column with this exact name exists.
    fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|c| c == name)
    }

    /// Numeric view of a column. Missing or non-numeric cells are `None`.
    ///
    /// Fails with [`crate::Error::MissingColumn`] if the column is absent.
    fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>>;

    /// Display strings for a column (nulls become `""`).
    ///
    /// Fails with [`crate::Error::MissingColumn`] if the column is absent.
    fn display_column(&self, name: &str) -> Result<Vec<String>>;
}
