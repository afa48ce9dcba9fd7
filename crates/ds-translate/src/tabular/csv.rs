//! CSV/TSV → Arrow RecordBatch.
//!
//! Strategy: read all rows as strings, then build one typed Arrow array per
//! column. Columns whose non-empty cells are all booleans become Boolean,
//! all integers become Int64, all floats become Float64; anything else stays
//! Utf8. Empty cells are nulls in typed columns.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::{Dataset, TabularError};

/// Read a delimited text file.
pub fn read_csv_path(path: &Path, delimiter: u8) -> Result<Dataset, TabularError> {
    let file = std::fs::File::open(path)?;
    read_csv_reader(file, delimiter)
}

/// Read delimited text from any reader (the first record is the header).
pub fn read_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Dataset, TabularError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(TabularError::NoColumns);
    }

    let n_cols = headers.len();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); n_cols];
    for result in rdr.records() {
        let record = result?;
        for (j, field) in record.iter().enumerate().take(n_cols) {
            columns[j].push(field.to_string());
        }
    }

    if columns[0].is_empty() {
        return Err(TabularError::NoRows);
    }

    let mut fields = Vec::with_capacity(n_cols);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(n_cols);
    for (name, col_data) in headers.iter().zip(&columns) {
        let (dt, array) = build_column(col_data);
        fields.push(Field::new(name, dt, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema, arrays)?;
    Dataset::from_record_batch(batch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

fn is_bool_literal(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
}

fn infer(col_data: &[String]) -> Inferred {
    let cells = || col_data.iter().map(|s| s.trim()).filter(|s| !s.is_empty());

    if cells().next().is_none() {
        return Inferred::Utf8;
    }
    let all_bool = cells().all(|s| is_bool_literal(s) || s == "0" || s == "1");
    if all_bool && cells().any(is_bool_literal) {
        return Inferred::Boolean;
    }
    if cells().all(|s| s.parse::<i64>().is_ok()) {
        return Inferred::Int64;
    }
    if cells().all(|s| s.parse::<f64>().is_ok()) {
        return Inferred::Float64;
    }
    Inferred::Utf8
}

fn build_column(col_data: &[String]) -> (DataType, ArrayRef) {
    let n = col_data.len();
    match infer(col_data) {
        Inferred::Boolean => {
            let mut b = BooleanBuilder::with_capacity(n);
            for s in col_data.iter().map(|s| s.trim()) {
                if s.is_empty() {
                    b.append_null();
                } else {
                    b.append_value(s.eq_ignore_ascii_case("true") || s == "1");
                }
            }
            (DataType::Boolean, Arc::new(b.finish()))
        }
        Inferred::Int64 => {
            let mut b = Int64Builder::with_capacity(n);
            for s in col_data.iter().map(|s| s.trim()) {
                b.append_option(s.parse::<i64>().ok());
            }
            (DataType::Int64, Arc::new(b.finish()))
        }
        Inferred::Float64 => {
            let mut b = Float64Builder::with_capacity(n);
            for s in col_data.iter().map(|s| s.trim()) {
                b.append_option(s.parse::<f64>().ok());
            }
            (DataType::Float64, Arc::new(b.finish()))
        }
        Inferred::Utf8 => {
            let mut b = StringBuilder::with_capacity(n, n * 16);
            for s in col_data {
                if s.is_empty() {
                    b.append_null();
                } else {
                    b.append_value(s);
                }
            }
            (DataType::Utf8, Arc::new(b.finish()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_column_types() {
        assert_eq!(infer(&strings(&["1", "0", ""])), Inferred::Int64);
        assert_eq!(infer(&strings(&["true", "0", "FALSE"])), Inferred::Boolean);
        assert_eq!(infer(&strings(&["1.5", "2", ""])), Inferred::Float64);
        assert_eq!(infer(&strings(&["2024-01-01", "2024-01-08"])), Inferred::Utf8);
        assert_eq!(infer(&strings(&["", ""])), Inferred::Utf8);
        assert_eq!(infer(&strings(&["3.1", "n/a"])), Inferred::Utf8);
    }
}
