//! Persistent configuration for training runs and the scoring server.
//!
//! Settings live in a TOML file under the application directory. Every key is
//! optional; command-line flags layered on top by the binaries take precedence.

mod defaults;
mod errors;
mod io;
mod types;

pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load_from, load_or_default, save_to_path};
pub use types::{AppConfig, PathSettings, ServingSettings, TrainingSettings};
