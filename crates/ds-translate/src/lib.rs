//! # ds-translate
//!
//! Format translators for didstat.
//!
//! Supports:
//! - CSV / TSV (type-inferred into Arrow columns)
//! - Parquet
//!
//! Every reader produces a [`Dataset`], an immutable Arrow-backed table that
//! implements [`ds_core::Tabular`].

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod tabular;

pub use tabular::{
    ColumnInfo, Dataset, DatasetPreview, TabularError, f64_column, read_tabular_file, utf8_column,
};
