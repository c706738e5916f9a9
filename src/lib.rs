//! Library exports for the attrition trainer, the scoring server and tests.
/// Per-user application directories.
pub mod app_dirs;
/// Persistent settings stored in `config.toml`.
pub mod config;
/// CSV loading and train/test splitting.
pub mod dataset;
/// Tracing setup with per-launch log files.
pub mod logging;
/// Encoding, training, evaluation and model artifacts.
pub mod ml;
/// End-to-end training run.
pub mod pipeline;
/// Inference service and HTTP scoring endpoint.
pub mod serve;
