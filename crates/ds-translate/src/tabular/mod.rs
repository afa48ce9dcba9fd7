//! Tabular datasets backed by Apache Arrow.
//!
//! Input files are decoded into a single Arrow [`RecordBatch`] and wrapped in
//! a [`Dataset`]. The estimator never sees Arrow types: it reads columns
//! through [`ds_core::Tabular`], which coerces any numeric-like column to
//! `Option<f64>` cells.
//!
//! # Modules
//!
//! - [`csv`]: CSV/TSV → RecordBatch with per-column type inference
//! - [`parquet`]: Parquet → RecordBatch

pub mod csv;
pub mod parquet;


use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast, concat_batches};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use serde::Serialize;

/// Error type for tabular ingestion.
#[derive(Debug, thiserror::Error)]
pub enum TabularError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("unsupported file extension '.{0}' (expected .csv, .tsv, .txt, .parquet or .pq)")]
    UnsupportedExtension(String),

    #[error("input has no columns")]
    NoColumns,

    #[error("input contains no data rows")]
    NoRows,
}

impl From<TabularError> for ds_core::Error {
    fn from(e: TabularError) -> Self {
        match e {
            TabularError::Io(io) => ds_core::Error::Io(io),
            other => ds_core::Error::Data(other.to_string()),
        }
    }
}

/// Read a CSV, TSV or Parquet file into a [`Dataset`], dispatching on extension.
pub fn read_tabular_file(path: &Path) -> Result<Dataset, TabularError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();

    match ext.as_str() {
        "csv" | "txt" => csv::read_csv_path(path, b','),
        "tsv" => csv::read_csv_path(path, b'\t'),
        "parquet" | "pq" => {
            let batches = parquet::read_parquet_batches(path)?;
            Dataset::from_batches(&batches)
        }
        _ => Err(TabularError::UnsupportedExtension(ext)),
    }
}

/// Immutable, name-addressed table.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap a single RecordBatch.
    pub fn from_record_batch(batch: RecordBatch) -> Result<Self, TabularError> {
        if batch.num_columns() == 0 {
            return Err(TabularError::NoColumns);
        }
        Ok(Self { batch })
    }

    /// Concatenate RecordBatches sharing one schema.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self, TabularError> {
        let first = batches.first().ok_or(TabularError::NoRows)?;
        let batch = concat_batches(&first.schema(), batches)?;
        Self::from_record_batch(batch)
    }

    /// Build a dataset from named Arrow arrays of equal length.
    pub fn from_columns(columns: Vec<(&str, ArrayRef)>) -> Result<Self, TabularError> {
        if columns.is_empty() {
            return Err(TabularError::NoColumns);
        }
        let batch = RecordBatch::try_from_iter(columns)?;
        Self::from_record_batch(batch)
    }

    /// Underlying Arrow batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> ds_core::Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| ds_core::Error::MissingColumn { column: name.to_string() })
    }

    /// Schema summary plus the first `n_rows` rows as display strings.
    pub fn preview(&self, n_rows: usize) -> Result<DatasetPreview, TabularError> {
        let schema = self.batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(self.batch.columns())
            .map(|(f, col)| ColumnInfo {
                name: f.name().clone(),
                data_type: f.data_type().to_string(),
                n_null: col.null_count(),
            })
            .collect();

        let n_head = n_rows.min(self.batch.num_rows());
        let mut rows = Vec::with_capacity(n_head);
        for i in 0..n_head {
            let mut row = Vec::with_capacity(self.batch.num_columns());
            for col in self.batch.columns() {
                row.push(cell_to_string(col, i)?);
            }
            rows.push(row);
        }

        Ok(DatasetPreview { n_rows: self.batch.num_rows(), columns, rows })
    }
}

/// Column metadata shown in a preview.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub n_null: usize,
}

/// Plot/table-friendly preview of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPreview {
    /// Total number of rows in the dataset.
    pub n_rows: usize,
    pub columns: Vec<ColumnInfo>,
    /// Head rows, one string per column.
    pub rows: Vec<Vec<String>>,
}

fn cell_to_string(col: &ArrayRef, i: usize) -> Result<String, TabularError> {
    if col.is_null(i) {
        return Ok(String::new());
    }
    Ok(array_value_to_string(col, i)?)
}

fn to_f64_cells(name: &str, col: &ArrayRef) -> ds_core::Result<Vec<Option<f64>>> {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

    match col.data_type() {
        DataType::Utf8 => {
            Ok(col.as_string::<i32>().iter().map(|s| finite(s.and_then(parse_f64))).collect())
        }
        DataType::LargeUtf8 => {
            Ok(col.as_string::<i64>().iter().map(|s| finite(s.and_then(parse_f64))).collect())
        }
        DataType::Float64 => Ok(col.as_primitive::<Float64Type>().iter().map(finite).collect()),
        dt if can_cast_types(dt, &DataType::Float64) => {
            let casted = cast(col, &DataType::Float64)
                .map_err(|e| ds_core::Error::Data(format!("column '{}': {}", name, e)))?;
            Ok(casted.as_primitive::<Float64Type>().iter().map(finite).collect())
        }
        dt => Err(ds_core::Error::Validation(format!(
            "column '{}' has unsupported type {:?} (expected numeric)",
            name, dt
        ))),
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

impl ds_core::Tabular for Dataset {
    fn n_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn column_names(&self) -> Vec<String> {
        self.batch.schema().fields().iter().map(|f| f.name().clone()).collect()
    }

    fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    fn numeric_column(&self, name: &str) -> ds_core::Result<Vec<Option<f64>>> {
        let col = self.column(name)?;
        to_f64_cells(name, col)
    }

    fn display_column(&self, name: &str) -> ds_core::Result<Vec<String>> {
        let col = self.column(name)?;
        (0..col.len()).map(|i| cell_to_string(col, i).map_err(ds_core::Error::from)).collect()
    }
}

/// Float64 column for in-memory tables.
pub fn f64_column(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(arrow::array::Float64Array::from(values.to_vec()))
}

/// Utf8 column for in-memory tables.
pub fn utf8_column<S: AsRef<str>>(values: &[S]) -> ArrayRef {
    Arc::new(arrow::array::StringArray::from_iter_values(values.iter().map(|s| s.as_ref())))
}
