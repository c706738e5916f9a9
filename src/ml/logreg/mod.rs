//! Binary logistic classifier over one-hot encoded attrition features.

use serde::{Deserialize, Serialize};

mod train;
pub use train::{TrainDataset, TrainOptions, TrainingConfigError, TrainingError, train_logreg};

/// Decision threshold; probabilities at or above it predict attrition.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// `ln(f64::MAX)`: beyond this magnitude `exp` overflows to infinity.
const EXP_OVERFLOW_LIMIT: f64 = 709.782712893384;

/// Logistic function `1 / (1 + e^-z)`, saturating to exactly `0.0`/`1.0`
/// where the exponential would overflow.
pub fn sigmoid(z: f64) -> f64 {
    if z <= -EXP_OVERFLOW_LIMIT {
        0.0
    } else if z >= EXP_OVERFLOW_LIMIT {
        1.0
    } else {
        1.0 / (1.0 + (-z).exp())
    }
}

/// Fitted coefficients with the feature names that define the vector layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRegModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(rename = "features")]
    pub feature_names: Vec<String>,
}

/// One feature's coefficient, as listed in training summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Determinant {
    pub feature: String,
    pub coefficient: f64,
}

impl LogRegModel {
    /// Model with all parameters at zero.
    pub fn zeroed(feature_names: Vec<String>) -> Self {
        Self {
            coefficients: vec![0.0; feature_names.len()],
            intercept: 0.0,
            feature_names,
        }
    }

    /// Validate that every coefficient has a feature name.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(format!(
                "coefficients length {} does not match features length {}",
                self.coefficients.len(),
                self.feature_names.len()
            ));
        }
        Ok(())
    }

    /// Encoded vector length this model expects.
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// `intercept + Σ coefficients[i] * features[i]`, or `None` on a width mismatch.
    pub fn decision(&self, features: &[f64]) -> Option<f64> {
        if features.len() != self.coefficients.len() {
            return None;
        }
        Some(
            self.coefficients
                .iter()
                .zip(features)
                .fold(self.intercept, |z, (coef, x)| z + coef * x),
        )
    }

    /// Attrition probability for an encoded vector, `None` on a width mismatch.
    pub fn predict_proba(&self, features: &[f64]) -> Option<f64> {
        self.decision(features).map(sigmoid)
    }

    /// The `n` features with the largest absolute coefficient, strongest first.
    pub fn top_determinants(&self, n: usize) -> Vec<Determinant> {
        let mut ranked: Vec<Determinant> = self
            .feature_names
            .iter()
            .zip(&self.coefficients)
            .map(|(feature, &coefficient)| Determinant {
                feature: feature.clone(),
                coefficient,
            })
            .collect();
        ranked.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        ranked.truncate(n);
        ranked
    }
}
