//! Log setup for a single CLI invocation
//!
//! Logs go to `<log dir>/<prefix>-YYYYMMDD-HHMMSS.log` unless `--verbose`
//! sends them to stderr. `YAPCLI_LOG_DIR` overrides the directory and
//! `YAPCLI_LOG_LEVEL` the filter.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;

const LOG_DIR_ENV_VAR: &str = "YAPCLI_LOG_DIR";
const LOG_LEVEL_ENV_VAR: &str = "YAPCLI_LOG_LEVEL";

/// Install the global logger. Returns the log file path, if any.
pub fn init(prefix: &str, verbose: bool) -> Result<Option<PathBuf>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_LEVEL_ENV_VAR, "info"));
    builder.format_timestamp_millis();

    let log_path = if verbose {
        builder.target(env_logger::Target::Stderr);
        None
    } else {
        let dir = log_dir()?;
        config::ensure_dir(&dir)?;
        let path = dir.join(log_file_name(prefix, Local::now()));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        Some(path)
    };

    builder.try_init().context("Failed to install logger")?;
    Ok(log_path)
}

fn log_dir() -> Result<PathBuf> {
    match std::env::var(LOG_DIR_ENV_VAR) {
        Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => config::data_path("logs").context("Could not determine data directory"),
    }
}

fn log_file_name(prefix: &str, at: DateTime<Local>) -> String {
    format!("{}-{}.log", prefix, at.format("%Y%m%d-%H%M%S"))
}
