use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::{
    clamp_workers, default_bind_addr, default_epochs, default_io_timeout_secs,
    default_learning_rate, default_max_body_bytes, default_metrics_path, default_model_path,
    default_seed, default_test_fraction, default_top_determinants, default_workers,
};

/// Settings stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub serving: ServingSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

/// Hyperparameters and split policy for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Step size for the per-row delta update.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Number of full passes over the training rows.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Share of shuffled rows held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// How many of the strongest coefficients to report after training.
    #[serde(default = "default_top_determinants")]
    pub top_determinants: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            top_determinants: default_top_determinants(),
        }
    }
}

/// Scoring server network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingSettings {
    /// Socket address the server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Worker threads handling accepted connections.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-connection read/write timeout.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

impl Default for ServingSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            workers: default_workers(),
            max_body_bytes: default_max_body_bytes(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

/// File locations for the dataset and the artifacts produced from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
    #[serde(default = "default_metrics_path")]
    pub metrics: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            dataset: None,
            model: default_model_path(),
            metrics: default_metrics_path(),
        }
    }
}

impl AppConfig {
    /// Clamp values that would leave the server unusable.
    pub fn normalized(mut self) -> Self {
        self.serving.workers = clamp_workers(self.serving.workers);
        self.serving.io_timeout_secs = self.serving.io_timeout_secs.max(1);
        self
    }
}
