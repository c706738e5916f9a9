//! Tracing setup for `attrition-train` and `attrition-serve`.
//!
//! Each launch logs to stdout and to its own file under the app `logs/`
//! directory, named `attrition_<component>_<local time>.log`. Only the newest
//! [`MAX_LOG_FILES`] files per component are kept, so a chatty server never
//! evicts the logs of past training runs.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Log files retained per component.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "attrition";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log directory unavailable: {0}")]
    Dir(#[from] AppDirError),
    #[error("failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to prune {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to timestamp log file name: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("tracing subscriber already installed: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber for `component` (`train` or `serve`).
///
/// Repeated calls are no-ops. Binaries report an error on stderr and keep
/// running without file logging.
pub fn init(component: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let dir = app_dirs::logs_dir()?;
    let file_name = log_file_name(component, now_local_or_utc())?;
    let path = dir.join(&file_name);
    create_log_file(&path)?;
    prune_component_logs(&dir, component, MAX_LOG_FILES)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&dir, file_name));
    let timer = local_timer();
    let subscriber = Registry::default()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("{component} logging to {}", path.display());
    Ok(())
}

fn create_log_file(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Delete the oldest `attrition_<component>_*.log` files beyond `keep`.
fn prune_component_logs(dir: &Path, component: &str, keep: usize) -> Result<(), LoggingError> {
    let prefix = format!("{LOG_FILE_PREFIX}_{component}_");
    let read_err = |source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !(name.starts_with(&prefix) && name.ends_with(".log")) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        logs.push((modified, entry.path()));
    }
    logs.sort();
    let excess = logs.len().saturating_sub(keep);
    for (_, path) in logs.drain(..excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn log_file_name(component: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!(
        "{LOG_FILE_PREFIX}_{component}_{}.log",
        now.format(STAMP)?
    ))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const LINE_STAMP: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, LINE_STAMP.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn log_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn file_name_carries_component_and_launch_time() {
        let launch = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name("serve", launch).unwrap(),
            "attrition_serve_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn pruning_keeps_newest_runs_of_one_component() {
        let dir = tempdir().unwrap();
        for run in 0..4 {
            create_log_file(&dir.path().join(format!("attrition_serve_{run}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        create_log_file(&dir.path().join("attrition_train_0.log")).unwrap();
        fs::write(dir.path().join("model_artifacts.json"), b"{}").unwrap();

        prune_component_logs(dir.path(), "serve", 2).unwrap();
        assert_eq!(
            log_names(dir.path()),
            vec![
                "attrition_serve_2.log",
                "attrition_serve_3.log",
                "attrition_train_0.log",
                "model_artifacts.json",
            ]
        );
    }
}
