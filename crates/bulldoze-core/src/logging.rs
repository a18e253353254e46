//! Log file setup.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Filter used when the configured level does not parse
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// First line of the log file: plugin name, version and local start time.
pub fn log_header(version: &str) -> String {
    format!(
        "SC4BulldozeExtensions v{} ({})",
        version,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Truncate `path`, write `header`, then send all `tracing` output there.
///
/// Fails when a global subscriber is already installed.
pub fn init_file_logging(path: &Path, level: &str, header: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    writeln!(file, "{}", header)?;

    let (filter, level_error) = match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_LOG_LEVEL), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    if let Some(e) = level_error {
        warn!("Invalid log level {:?}: {}, using {}", level, e, DEFAULT_LOG_LEVEL);
    }
    Ok(())
}
