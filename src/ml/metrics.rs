//! Confusion-matrix evaluation for the binary attrition classifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logreg::{DECISION_THRESHOLD, LogRegModel, TrainDataset};

/// Counts of the four binary classification outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl ConfusionMatrix {
    pub fn add(&mut self, truth: bool, predicted: bool) {
        let slot = match (truth, predicted) {
            (true, true) => &mut self.true_positive,
            (false, false) => &mut self.true_negative,
            (false, true) => &mut self.false_positive,
            (true, false) => &mut self.false_negative,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    /// Rows are truth (negative, positive), columns are prediction.
    pub fn as_grid(&self) -> [[u64; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

/// Confusion counts plus the rates derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(flatten)]
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    /// Derive rates, using `0.0` wherever a denominator is zero.
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let tp = confusion.true_positive as f64;
        let tn = confusion.true_negative as f64;
        let fp = confusion.false_positive as f64;
        let fn_ = confusion.false_negative as f64;
        let total = confusion.total() as f64;
        let accuracy = if total == 0.0 { 0.0 } else { (tp + tn) / total };
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            confusion,
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("{rows} feature rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[error("row {row} has {actual} features, model expects {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Score every held-out row and tally the outcomes.
///
/// A row is predicted positive when its probability is at least 0.5.
pub fn evaluate(model: &LogRegModel, dataset: &TrainDataset) -> Result<Metrics, EvaluationError> {
    if dataset.x.len() != dataset.y.len() {
        return Err(EvaluationError::LabelCountMismatch {
            rows: dataset.x.len(),
            labels: dataset.y.len(),
        });
    }
    let mut confusion = ConfusionMatrix::default();
    for (idx, (row, &label)) in dataset.x.iter().zip(&dataset.y).enumerate() {
        let probability = model
            .predict_proba(row)
            .ok_or(EvaluationError::RowWidth {
                row: idx,
                expected: model.width(),
                actual: row.len(),
            })?;
        confusion.add(label == 1.0, probability >= DECISION_THRESHOLD);
    }
    Ok(Metrics::from_confusion(confusion))
}
