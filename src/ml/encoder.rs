//! One-hot encoder turning raw records into fixed-length numeric vectors.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::dataset::{LabeledTable, RawRecord};
use crate::ml::logreg::TrainDataset;
use crate::ml::schema::{FeatureField, FeatureSchema};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaFitError {
    #[error("cannot fit a feature schema on an empty table")]
    EmptyTable,
    #[error("cannot fit a feature schema without feature columns")]
    NoColumns,
    #[error("row {row} has no value for column {column}")]
    MissingValue { row: usize, column: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("column {column}: {value:?} is not a number")]
    NotNumeric { column: String, value: String },
    #[error("record has no value for column {column}")]
    MissingValue { column: String },
}

/// A categorical value that matched none of the fitted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenCategory {
    pub column: String,
    pub value: String,
}

/// Encoded vector plus the categories that fell back to an all-zero block.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub features: Vec<f64>,
    pub unseen: Vec<UnseenCategory>,
}

impl EncodedRow {
    /// True when every categorical value was known to the schema.
    pub fn is_exact(&self) -> bool {
        self.unseen.is_empty()
    }
}

/// Encoder holding a schema fitted on a full raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalEncoder {
    schema: FeatureSchema,
}

impl CategoricalEncoder {
    /// Fit a schema over every row of the table.
    ///
    /// A column is numeric only if all of its values parse as numbers.
    /// Categorical values are sorted by their raw string, so the result does
    /// not depend on row order.
    pub fn fit(columns: &[String], rows: &[RawRecord]) -> Result<Self, SchemaFitError> {
        if columns.is_empty() {
            return Err(SchemaFitError::NoColumns);
        }
        if rows.is_empty() {
            return Err(SchemaFitError::EmptyTable);
        }
        let fields = columns
            .iter()
            .map(|column| fit_field(column, rows))
            .collect::<Result<Vec<_>, _>>()?;
        let schema = FeatureSchema::new(fields);
        tracing::info!(
            "Expanded features from {} to {}",
            columns.len(),
            schema.width()
        );
        Ok(Self { schema })
    }

    /// Fit on the table's features, then encode every row with its label.
    pub fn fit_transform(table: &LabeledTable) -> Result<(Self, TrainDataset), FitTransformError> {
        let encoder = Self::fit(&table.features.columns, &table.features.rows)?;
        let mut x = Vec::with_capacity(table.len());
        for record in &table.features.rows {
            x.push(encoder.transform(record)?.features);
        }
        let dataset = TrainDataset {
            feature_names: encoder.schema.feature_names(),
            x,
            y: table.labels.clone(),
        };
        Ok((encoder, dataset))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode one record against the fitted schema.
    ///
    /// Unseen categorical values produce an all-zero block and are listed in
    /// [`EncodedRow::unseen`]; the vector width never changes.
    pub fn transform(&self, record: &RawRecord) -> Result<EncodedRow, EncodingError> {
        let mut features = Vec::with_capacity(self.schema.width());
        let mut unseen = Vec::new();
        for field in self.schema.fields() {
            let column = field.column();
            let raw = record.get(column).ok_or_else(|| EncodingError::MissingValue {
                column: column.to_string(),
            })?;
            match field {
                FeatureField::Numeric { .. } => {
                    let value = parse_numeric(raw).ok_or_else(|| EncodingError::NotNumeric {
                        column: column.to_string(),
                        value: raw.to_string(),
                    })?;
                    features.push(value);
                }
                FeatureField::Categorical { values, .. } => {
                    let start = features.len();
                    features.resize(start + values.len(), 0.0);
                    match values.iter().position(|known| known == raw) {
                        Some(hit) => features[start + hit] = 1.0,
                        None => unseen.push(UnseenCategory {
                            column: column.to_string(),
                            value: raw.to_string(),
                        }),
                    }
                }
            }
        }
        for miss in &unseen {
            tracing::warn!(
                "Unseen value {:?} for column {}; encoded as all-zero block",
                miss.value,
                miss.column
            );
        }
        Ok(EncodedRow { features, unseen })
    }
}

/// Failure from [`CategoricalEncoder::fit_transform`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FitTransformError {
    #[error(transparent)]
    Fit(#[from] SchemaFitError),
    #[error(transparent)]
    Encode(#[from] EncodingError),
}

/// Parse a raw cell as a finite float, ignoring surrounding whitespace.
///
/// `NaN` and infinities are rejected so they never reach training.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn fit_field(column: &str, rows: &[RawRecord]) -> Result<FeatureField, SchemaFitError> {
    let mut values = Vec::with_capacity(rows.len());
    for (idx, record) in rows.iter().enumerate() {
        let value = record
            .get(column)
            .ok_or_else(|| SchemaFitError::MissingValue {
                row: idx + 1,
                column: column.to_string(),
            })?;
        values.push(value);
    }
    if values.iter().all(|value| parse_numeric(value).is_some()) {
        return Ok(FeatureField::Numeric {
            column: column.to_string(),
        });
    }
    let distinct: BTreeSet<&str> = values.into_iter().collect();
    Ok(FeatureField::Categorical {
        column: column.to_string(),
        values: distinct.into_iter().map(str::to_string).collect(),
    })
}
