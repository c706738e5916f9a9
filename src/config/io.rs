use std::path::{Path, PathBuf};

use crate::app_dirs;

use super::errors::ConfigError;
use super::types::AppConfig;

/// Default filename used to store the configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default location, returning defaults if missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    load_from(&path)
}

/// Load configuration from a specific file; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppConfig>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(AppConfig::normalized)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingSettings;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let loaded = load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, AppConfig::default());
        assert_eq!(loaded.training.epochs, 50);
        assert!((loaded.training.learning_rate - 0.01).abs() < f64::EPSILON);
        assert!((loaded.training.test_fraction - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[training]\nepochs = 5\n\n[serving]\nbind_addr = \"127.0.0.1:9000\"\nworkers = 0\n",
        )
        .unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.training.epochs, 5);
        assert!((loaded.training.learning_rate - 0.01).abs() < f64::EPSILON);
        assert_eq!(loaded.serving.bind_addr, "127.0.0.1:9000");
        assert_eq!(loaded.serving.workers, 1);
        assert_eq!(loaded.paths.model, PathBuf::from("model_artifacts.json"));
    }

    #[test]
    fn saves_and_reloads_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = AppConfig {
            training: TrainingSettings {
                learning_rate: 0.5,
                seed: 7,
                ..TrainingSettings::default()
            },
            ..AppConfig::default()
        };
        save_to_path(&cfg, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[training\nepochs = ").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn default_location_uses_app_root() {
        let dir = tempdir().unwrap();
        let _guard = crate::app_dirs::ConfigBaseGuard::set(dir.path().to_path_buf());
        let path = config_path().unwrap();
        assert_eq!(
            path,
            dir.path().join(app_dirs::APP_DIR_NAME).join(CONFIG_FILE_NAME)
        );
        assert_eq!(load_or_default().unwrap(), AppConfig::default());
    }
}
