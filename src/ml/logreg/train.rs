use thiserror::Error;

use super::{LogRegModel, sigmoid};

/// Training options for the attrition classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            learning_rate: 0.01,
        }
    }
}

impl TrainOptions {
    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        if self.epochs == 0 {
            return Err(TrainingConfigError::Epochs);
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainingConfigError::LearningRate(self.learning_rate));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TrainingConfigError {
    #[error("epoch count must be positive")]
    Epochs,
    #[error("learning rate must be a positive number, got {0}")]
    LearningRate(f64),
    #[error("test fraction must lie in [0, 1), got {0}")]
    TestFraction(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error(transparent)]
    Config(#[from] TrainingConfigError),
    #[error("empty training set")]
    EmptyDataset,
    #[error("{rows} feature rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[error("row {row} has {actual} features, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Encoded rows with aligned labels and the names of their columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainDataset {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl TrainDataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Check label count and that every row is as wide as the name list.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.x.len() != self.y.len() {
            return Err(TrainingError::LabelCountMismatch {
                rows: self.x.len(),
                labels: self.y.len(),
            });
        }
        let expected = self.feature_names.len();
        for (idx, row) in self.x.iter().enumerate() {
            if row.len() != expected {
                return Err(TrainingError::RowWidth {
                    row: idx,
                    expected,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }

    /// Keep the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            x: indices.iter().map(|&idx| self.x[idx].clone()).collect(),
            y: indices.iter().map(|&idx| self.y[idx]).collect(),
        }
    }
}

/// Fit coefficients and intercept with per-row delta-rule updates.
///
/// Parameters start at zero and each epoch visits the rows in the given
/// order, so identical inputs give bit-identical models. Each row applies
/// `delta = lr * (y - p) * p * (1 - p)` to the intercept and
/// `delta * x[i]` to every coefficient.
pub fn train_logreg(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<LogRegModel, TrainingError> {
    options.validate()?;
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    dataset.validate()?;

    let mut model = LogRegModel::zeroed(dataset.feature_names.clone());
    let lr = options.learning_rate;
    for epoch in 0..options.epochs {
        let mut sum_error = 0.0;
        for (row, &target) in dataset.x.iter().zip(&dataset.y) {
            let z = model
                .coefficients
                .iter()
                .zip(row)
                .fold(model.intercept, |z, (coef, x)| z + coef * x);
            let predicted = sigmoid(z);
            let error = target - predicted;
            sum_error += error * error;
            let delta = lr * error * predicted * (1.0 - predicted);
            model.intercept += delta;
            for (coef, x) in model.coefficients.iter_mut().zip(row) {
                *coef += delta * x;
            }
        }
        tracing::debug!("Epoch {epoch}: squared error {sum_error:.3}");
    }
    Ok(model)
}
