//! JSON model artifact: the only channel carrying the feature layout from
//! training to serving.
//!
//! The document has exactly three fields, `coefficients`, `intercept` and
//! `features`. Writes go through a temporary file in the destination
//! directory that is renamed into place, so readers never observe a partial
//! document.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::logreg::LogRegModel;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model artifact {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("refusing to save model with non-finite {0}")]
    NonFinite(&'static str),
    #[error("model is invalid: {0}")]
    Invalid(String),
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File-backed home of one model artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and atomically publish `model`.
    pub fn save(&self, model: &LogRegModel) -> Result<(), ArtifactError> {
        model.validate().map_err(ArtifactError::Invalid)?;
        if !model.intercept.is_finite() {
            return Err(ArtifactError::NonFinite("intercept"));
        }
        if model.coefficients.iter().any(|coef| !coef.is_finite()) {
            return Err(ArtifactError::NonFinite("coefficients"));
        }
        write_json_atomic(&self.path, model)?;
        tracing::info!(
            "Saved model artifact with {} features to {}",
            model.feature_names.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read, parse and validate the artifact.
    pub fn load(&self) -> Result<LogRegModel, ArtifactError> {
        let bytes = std::fs::read(&self.path).map_err(|source| ArtifactError::Read {
            path: self.path.clone(),
            source,
        })?;
        let model = decode(&bytes).map_err(|reason| ArtifactError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;
        tracing::info!(
            "Loaded model artifact with {} features from {}",
            model.feature_names.len(),
            self.path.display()
        );
        Ok(model)
    }
}

/// Parse artifact bytes and check the length invariant.
pub fn decode(bytes: &[u8]) -> Result<LogRegModel, String> {
    let model: LogRegModel = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
    model.validate()?;
    Ok(model)
}

/// Serialize `value` as JSON into `path` via a sibling temp file and rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    let write_err = |source: std::io::Error| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".artifact")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(write_err)?;
    temp.write_all(&bytes).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
