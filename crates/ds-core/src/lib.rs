//! # ds-core
//!
//! Core types and traits for didstat.
//!
//! This crate provides:
//! - The error taxonomy shared by every didstat crate
//! - Analysis request types (`ColumnSelection`, `AnalysisOptions`)
//! - The `Tabular` trait the estimator reads datasets through

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;
/// Core traits.
pub mod traits;
/// Common data types.
pub mod types;

pub use error::{Error, Result};
pub use traits::Tabular;
pub use types::{AnalysisOptions, AnalysisRequest, Cell, ColumnSelection};

/// didstat version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
