use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::ExportConfig;

const LOG_FILE_PREFIX: &str = "report-export";

/// The configured level for dependencies, debug for the engine crates.
fn default_filter(level: &str) -> String {
    let engine = ["report_core", "report_docs", "report_capture", "report_export"]
        .map(|krate| format!("{krate}=debug"))
        .join(",");
    format!("{level},{engine}")
}

/// Install the global subscriber: a daily-rolling file under `logs_dir`,
/// plus a compact stderr layer when `console` is set.
///
/// `RUST_LOG` overrides `filter` when present.
fn install(logs_dir: &Path, filter: &str, console: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory: {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);
    let console_layer = console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// File + console logging under `~/.report_export/logs`.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(config: &ExportConfig) -> Result<WorkerGuard> {
    install(
        &ExportConfig::logs_dir()?,
        &default_filter(&config.log_level),
        true,
    )
}

/// File-only logging into `logs_dir`, for tests and embedding hosts.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let logs_dir = tmp.path().join("nested").join("logs");

        // Only one global subscriber per process; a second install errors,
        // but the directory is created first either way.
        let result = init_logging_to_dir(&logs_dir, "warn");
        assert!(logs_dir.is_dir());
        if let Err(e) = result {
            assert!(e.to_string().contains("logging"), "unexpected error: {e}");
        }
    }

    #[test]
    fn test_default_filter_raises_engine_crates_to_debug() {
        let filter = default_filter("warn");
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("report_capture=debug"));
        assert!(filter.contains("report_export=debug"));
        drop(EnvFilter::new(filter));
    }
}
