//! Loader for the comma-separated attrition table.
//!
//! The first row names the columns; the trailing column is the `0`/`1` label
//! and every other column is a raw feature.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use super::record::{RawRecord, RawTable};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no header row")]
    MissingHeader,
    #[error("dataset needs at least one feature column and a label column, found {0} column(s)")]
    TooFewColumns(usize),
    #[error("column {name:?} appears more than once in the header")]
    DuplicateColumn { name: String },
    #[error("row {row}: label {value:?} is not 0 or 1")]
    InvalidLabel { row: usize, value: String },
}

/// Raw feature table with one label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    /// Feature columns and records, label column excluded.
    pub features: RawTable,
    /// Name of the trailing label column.
    pub label_column: String,
    /// `0.0` or `1.0` per row, aligned with `features.rows`.
    pub labels: Vec<f64>,
}

impl LabeledTable {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Load a CSV dataset from disk.
pub fn load_csv(path: &Path) -> Result<LabeledTable, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_csv(BufReader::new(file))?;
    tracing::info!(
        "Loaded {} rows with {} feature columns from {}",
        table.len(),
        table.features.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Parse a CSV dataset from any reader.
pub fn read_csv<R: Read>(reader: R) -> Result<LabeledTable, DatasetError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(DatasetError::MissingHeader);
    }
    if headers.len() < 2 {
        return Err(DatasetError::TooFewColumns(headers.len()));
    }
    let mut seen = HashSet::with_capacity(headers.len());
    if let Some(name) = headers.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(DatasetError::DuplicateColumn { name: name.clone() });
    }
    let (label_column, feature_columns) = headers
        .split_last()
        .map(|(label, features)| (label.clone(), features.to_vec()))
        .ok_or(DatasetError::MissingHeader)?;

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let row_number = idx + 1;
        let raw_label = record.get(feature_columns.len()).unwrap_or_default();
        labels.push(parse_label(raw_label).ok_or_else(|| DatasetError::InvalidLabel {
            row: row_number,
            value: raw_label.to_string(),
        })?);
        let values = record
            .iter()
            .take(feature_columns.len())
            .map(str::to_string);
        rows.push(RawRecord::from_columns(&feature_columns, values));
    }

    Ok(LabeledTable {
        features: RawTable::new(feature_columns, rows),
        label_column,
        labels,
    })
}

fn parse_label(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value == 0.0 || value == 1.0 {
        Some(value)
    } else {
        None
    }
}
