//! Shared logging utilities for GeoAudit binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "geoaudit=info,geoaudit_core=info";

/// Overrides the home directory (logs live under `<home>/logs`).
pub const HOME_ENV: &str = "GEOAUDIT_HOME";

/// Logging configuration shared by GeoAudit binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Machine-readable output on stdout; keep the console to errors.
    pub json_mode: bool,
}

/// Initialize tracing with a daily rolling file and stderr output.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. When the log directory cannot be created the
/// file layer is skipped and only the console layer is installed.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    let mut guard = None;
    let file_layer = match ensure_logs_dir() {
        Ok(log_dir) => {
            let file_appender =
                tracing_appender::rolling::daily(log_dir, log_file_name(config.app_name));
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(env_filter()),
            )
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            None
        }
    };

    let console_filter = if config.json_mode {
        EnvFilter::new("error")
    } else if config.verbose || std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        env_filter()
    } else {
        EnvFilter::new("warn")
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Get the GeoAudit home directory: `$GEOAUDIT_HOME` or `~/.geoaudit`
pub fn geoaudit_home() -> PathBuf {
    if let Some(override_path) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geoaudit")
}

/// Get the logs directory: `<home>/logs`
pub fn logs_dir() -> PathBuf {
    logs_dir_in(&geoaudit_home())
}

fn logs_dir_in(home: &Path) -> PathBuf {
    home.join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    ensure_logs_dir_in(&geoaudit_home())
}

fn ensure_logs_dir_in(home: &Path) -> Result<PathBuf> {
    let logs = logs_dir_in(home);
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn log_file_name(app_name: &str) -> String {
    format!("{}.log", sanitize_name(app_name))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
