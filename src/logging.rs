//! Logging setup
//!
//! Structured logging goes through `tracing`. Line mode logs to stderr;
//! the TUI logs to a file so the alternate screen is not disturbed.

use crate::{DiskMemError, Result, APP_NAME, LOG_FILE};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Where log lines go
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl LogTarget {
    /// Default log file for TUI sessions: $CACHE_HOME/diskmem/diskmem.log
    pub fn default_file() -> Result<Self> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| {
            DiskMemError::ConfigError("Unable to determine cache directory".to_string())
        })?;
        Ok(LogTarget::File(cache_dir.join(APP_NAME).join(LOG_FILE)))
    }
}

/// Build the filter; `RUST_LOG` wins over the configured level
fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", APP_NAME, level.to_tracing_level())))
}

/// Initialize the global subscriber.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(level: LogLevel, target: LogTarget) -> Result<()> {
    let filter = build_filter(level);

    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact()
                .try_init();
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .compact()
                .try_init();
        }
    }

    Ok(())
}
