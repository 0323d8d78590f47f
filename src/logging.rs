use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Where log files go: `<data_local_dir>/grammar-chat/logs`.
pub fn default_log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("grammar-chat").join("logs"))
}

/// Parse a filter expression, falling back to `info` when it is invalid.
pub fn build_filter(filter: &str) -> EnvFilter {
    match filter.parse::<EnvFilter>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("WARN: log filter '{}' is invalid ({}); falling back to 'info'", filter, e);
            EnvFilter::new("info")
        }
    }
}

/// Send tracing output to a daily file. The terminal belongs to the UI, so
/// nothing is written to stdout or stderr.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, "grammar-chat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(filter))
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}
