use std::path::PathBuf;

pub(super) const MAX_SERVER_WORKERS: usize = 256;

pub(super) fn clamp_workers(value: usize) -> usize {
    value.clamp(1, MAX_SERVER_WORKERS)
}

pub(super) fn default_learning_rate() -> f64 {
    0.01
}

pub(super) fn default_epochs() -> usize {
    50
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_top_determinants() -> usize {
    15
}

pub(super) fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

pub(super) fn default_workers() -> usize {
    4
}

pub(super) fn default_max_body_bytes() -> usize {
    1024 * 1024
}

pub(super) fn default_io_timeout_secs() -> u64 {
    30
}

pub(super) fn default_model_path() -> PathBuf {
    PathBuf::from("model_artifacts.json")
}

pub(super) fn default_metrics_path() -> PathBuf {
    PathBuf::from("metrics.json")
}
