use std::path::Path;

use crate::ml::artifact::{ArtifactError, ArtifactStore};
use crate::ml::logreg::{DECISION_THRESHOLD, LogRegModel, sigmoid};

/// Probability returned when a request cannot be scored against the model.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Why a score fell back to [`NEUTRAL_PROBABILITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// The input vector is not as wide as the model's feature list.
    LengthMismatch { expected: usize, actual: usize },
    /// The decision value overflowed to NaN or infinity.
    NonFinite,
}

/// Outcome of a scoring call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Scored { probability: f64 },
    Degraded { probability: f64, reason: DegradeReason },
}

impl Score {
    pub fn probability(&self) -> f64 {
        match *self {
            Self::Scored { probability } | Self::Degraded { probability, .. } => probability,
        }
    }

    /// `1` when the probability reaches the decision threshold, else `0`.
    pub fn prediction(&self) -> u8 {
        u8::from(self.probability() >= DECISION_THRESHOLD)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Read-only scorer built once from a loaded model.
///
/// Performs no feature encoding: callers send vectors already laid out in the
/// model's feature order.
#[derive(Debug, Clone)]
pub struct InferenceService {
    model: LogRegModel,
}

impl InferenceService {
    pub fn new(model: LogRegModel) -> Self {
        Self { model }
    }

    /// Load the artifact at `path`; any failure here is fatal for serving.
    pub fn from_artifact(path: &Path) -> Result<Self, ArtifactError> {
        ArtifactStore::new(path).load().map(Self::new)
    }

    pub fn model(&self) -> &LogRegModel {
        &self.model
    }

    /// Score an encoded vector.
    ///
    /// A vector of the wrong length, or one whose decision value is not
    /// finite, is not an error: it degrades to [`NEUTRAL_PROBABILITY`], which
    /// predicts `1`.
    pub fn predict(&self, features: &[f64]) -> Score {
        let Some(z) = self.model.decision(features) else {
            tracing::warn!(
                "Scoring fallback: got {} features, model expects {}",
                features.len(),
                self.model.width()
            );
            return Score::Degraded {
                probability: NEUTRAL_PROBABILITY,
                reason: DegradeReason::LengthMismatch {
                    expected: self.model.width(),
                    actual: features.len(),
                },
            };
        };
        if !z.is_finite() {
            tracing::warn!("Scoring fallback: decision value {z} is not finite");
            return Score::Degraded {
                probability: NEUTRAL_PROBABILITY,
                reason: DegradeReason::NonFinite,
            };
        }
        Score::Scored {
            probability: sigmoid(z),
        }
    }
}
