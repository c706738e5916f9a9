//! Offline training run: encode, split, fit, evaluate and publish.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::TrainingSettings;
use crate::dataset::{DatasetError, LabeledTable, load_csv, train_test_split};
use crate::ml::artifact::{ArtifactError, ArtifactStore, write_json_atomic};
use crate::ml::encoder::{CategoricalEncoder, FitTransformError};
use crate::ml::logreg::{
    Determinant, LogRegModel, TrainOptions, TrainingConfigError, TrainingError, train_logreg,
};
use crate::ml::metrics::{EvaluationError, Metrics, evaluate};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Encode(#[from] FitTransformError),
    #[error(transparent)]
    Config(#[from] TrainingConfigError),
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Hyperparameters and split policy for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRun {
    pub options: TrainOptions,
    pub test_fraction: f64,
    pub seed: u64,
    pub top_determinants: usize,
}

impl Default for TrainingRun {
    fn default() -> Self {
        Self::from(&TrainingSettings::default())
    }
}

impl From<&TrainingSettings> for TrainingRun {
    fn from(settings: &TrainingSettings) -> Self {
        Self {
            options: TrainOptions {
                epochs: settings.epochs,
                learning_rate: settings.learning_rate,
            },
            test_fraction: settings.test_fraction,
            seed: settings.seed,
            top_determinants: settings.top_determinants,
        }
    }
}

impl TrainingRun {
    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        self.options.validate()?;
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(TrainingConfigError::TestFraction(self.test_fraction));
        }
        Ok(())
    }
}

/// Summary written as `metrics.json` for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Rows are truth (0, 1), columns are prediction (0, 1).
    pub confusion_matrix: [[u64; 2]; 2],
    pub train_rows: usize,
    pub test_rows: usize,
    pub top_determinants: Vec<Determinant>,
}

/// Fitted model plus its held-out report.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub model: LogRegModel,
    pub report: MetricsReport,
}

/// Load the CSV at `path` and train on it.
pub fn train_from_csv(path: &Path, run: &TrainingRun) -> Result<TrainingOutcome, PipelineError> {
    let table = load_csv(path)?;
    run_training(&table, run)
}

/// Train and evaluate on an already loaded table.
///
/// Configuration is checked before any work, so a bad run never produces a
/// model.
pub fn run_training(
    table: &LabeledTable,
    run: &TrainingRun,
) -> Result<TrainingOutcome, PipelineError> {
    run.validate()?;
    let (_encoder, dataset) = CategoricalEncoder::fit_transform(table)?;
    dataset.validate()?;
    let indices: Vec<usize> = (0..dataset.len()).collect();
    let (train_idx, test_idx) = train_test_split(indices, run.test_fraction, run.seed)?;
    let train = dataset.select(&train_idx);
    let test = dataset.select(&test_idx);
    info!(
        "Training on {} rows, holding out {} ({} features)",
        train.len(),
        test.len(),
        dataset.feature_names.len()
    );

    let model = train_logreg(&train, &run.options)?;
    if test.is_empty() {
        warn!("Held-out set is empty; metrics are all zero");
    }
    let metrics = evaluate(&model, &test)?;
    info!(
        "Accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4}",
        metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
    );
    let report = MetricsReport {
        confusion_matrix: metrics.confusion.as_grid(),
        metrics,
        train_rows: train.len(),
        test_rows: test.len(),
        top_determinants: model.top_determinants(run.top_determinants),
    };
    Ok(TrainingOutcome { model, report })
}

/// Publish the artifact, then the metrics report.
pub fn write_outputs(
    outcome: &TrainingOutcome,
    model_path: &Path,
    metrics_path: &Path,
) -> Result<(), PipelineError> {
    ArtifactStore::new(model_path).save(&outcome.model)?;
    write_json_atomic(metrics_path, &outcome.report)?;
    info!("Wrote metrics report to {}", metrics_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_csv;

    const SMALL: &str = "DEPT,LEVEL,ATTRITION\nA,1,0\nB,2,1\nA,3,0\nC,4,1\nB,5,1\n";

    fn table(csv: &str) -> LabeledTable {
        read_csv(csv.as_bytes()).unwrap()
    }

    fn one_epoch() -> TrainingRun {
        TrainingRun {
            options: TrainOptions {
                epochs: 1,
                learning_rate: 0.1,
            },
            test_fraction: 0.0,
            seed: 42,
            top_determinants: 3,
        }
    }

    #[test]
    fn small_table_trains_deterministically() {
        let first = run_training(&table(SMALL), &one_epoch()).unwrap();
        let second = run_training(&table(SMALL), &one_epoch()).unwrap();
        assert_eq!(
            first.model.feature_names,
            vec!["DEPT_A", "DEPT_B", "DEPT_C", "LEVEL"]
        );
        assert_eq!(first.model.width(), 4);
        assert!(first.model.coefficients.iter().any(|&coef| coef != 0.0));
        assert_eq!(first.model.intercept.to_bits(), second.model.intercept.to_bits());
        for (a, b) in first.model.coefficients.iter().zip(&second.model.coefficients) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(first.report.train_rows, 5);
        assert_eq!(first.report.test_rows, 0);
        assert_eq!(first.report.metrics.accuracy, 0.0);
        assert_eq!(first.report.top_determinants.len(), 3);
    }

    #[test]
    fn holds_out_requested_fraction() {
        let mut csv = String::from("DEPT,AGE,ATTRITION\n");
        for idx in 0..20 {
            let dept = if idx % 2 == 0 { "HR" } else { "Sales" };
            csv.push_str(&format!("{dept},{},{}\n", 20 + idx, idx % 2));
        }
        let run = TrainingRun {
            test_fraction: 0.25,
            ..one_epoch()
        };
        let outcome = run_training(&table(&csv), &run).unwrap();
        assert_eq!(outcome.report.train_rows, 15);
        assert_eq!(outcome.report.test_rows, 5);
        assert_eq!(outcome.report.metrics.confusion.total(), 5);
    }

    #[test]
    fn invalid_settings_fail_before_training() {
        let mut run = one_epoch();
        run.options.epochs = 0;
        assert!(matches!(
            run_training(&table(SMALL), &run),
            Err(PipelineError::Config(TrainingConfigError::Epochs))
        ));
        let run = TrainingRun {
            test_fraction: 1.0,
            ..one_epoch()
        };
        assert!(matches!(
            run_training(&table(SMALL), &run),
            Err(PipelineError::Config(TrainingConfigError::TestFraction(_)))
        ));
    }

    #[test]
    fn ragged_table_aborts_before_training() {
        let mut table = table(SMALL);
        table.labels.pop();
        assert!(matches!(
            run_training(&table, &one_epoch()),
            Err(PipelineError::Training(TrainingError::LabelCountMismatch { .. }))
        ));
    }

    #[test]
    fn outputs_land_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_training(&table(SMALL), &one_epoch()).unwrap();
        let model_path = dir.path().join("model_artifacts.json");
        let metrics_path = dir.path().join("metrics.json");
        write_outputs(&outcome, &model_path, &metrics_path).unwrap();

        assert_eq!(ArtifactStore::new(&model_path).load().unwrap(), outcome.model);
        let report: MetricsReport =
            serde_json::from_slice(&std::fs::read(&metrics_path).unwrap()).unwrap();
        assert_eq!(report, outcome.report);
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&metrics_path).unwrap()).unwrap();
        assert!(raw.get("true_negative").is_some());
        assert!(raw.get("f1").is_some());
    }

    #[test]
    fn reads_training_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attrition.csv");
        std::fs::write(&path, SMALL).unwrap();
        let outcome = train_from_csv(&path, &one_epoch()).unwrap();
        assert_eq!(outcome.model.width(), 4);
        assert!(matches!(
            train_from_csv(&dir.path().join("missing.csv"), &one_epoch()),
            Err(PipelineError::Dataset(_))
        ));
    }
}
