//! diskmem - disk throughput and memory allocation benchmark
//!
//! Measures sequential disk write/read speed with round-trip verification
//! and times successively larger RAM allocations. Ships a TUI and a
//! line-mode front end on top of the measurement core.

use std::fmt;

pub mod app;
pub mod bench;
pub mod config;
pub mod io;
pub mod logging;
pub mod models;
pub mod simple;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum DiskMemError {
    /// Disk write/read failed (device, permission, space)
    IoError(std::io::Error),
    /// Data read back differs from what was written
    VerificationFailure {
        /// Offset of the first mismatching byte
        offset: u64,
        /// Byte that was written
        expected: u8,
        /// Byte that was read back
        actual: u8,
    },
    /// Configuration validation or parsing error
    ConfigError(String),
    /// TUI rendering or interaction error
    TuiError(String),
    /// Platform query not available here
    Unsupported(String),
    /// Background task failed or panicked
    WorkerError(String),
    /// Cancellation error
    CancellationError(String),
}

impl fmt::Display for DiskMemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskMemError::IoError(err) => write!(f, "I/O error: {}", err),
            DiskMemError::VerificationFailure {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Verification failed: byte {} read back as {:#04x}, expected {:#04x}",
                offset, actual, expected
            ),
            DiskMemError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            DiskMemError::TuiError(msg) => write!(f, "TUI error: {}", msg),
            DiskMemError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            DiskMemError::WorkerError(msg) => write!(f, "Worker error: {}", msg),
            DiskMemError::CancellationError(msg) => write!(f, "Cancellation error: {}", msg),
        }
    }
}

impl std::error::Error for DiskMemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskMemError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiskMemError {
    fn from(err: std::io::Error) -> Self {
        DiskMemError::IoError(err)
    }
}

impl From<toml::de::Error> for DiskMemError {
    fn from(err: toml::de::Error) -> Self {
        DiskMemError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for DiskMemError {
    fn from(err: toml::ser::Error) -> Self {
        DiskMemError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_json::Error> for DiskMemError {
    fn from(err: serde_json::Error) -> Self {
        DiskMemError::ConfigError(format!("JSON serialization error: {}", err))
    }
}

impl From<tokio::task::JoinError> for DiskMemError {
    fn from(err: tokio::task::JoinError) -> Self {
        DiskMemError::WorkerError(format!("Benchmark task failed: {}", err))
    }
}

/// Result type alias for diskmem operations
pub type Result<T> = std::result::Result<T, DiskMemError>;

/// Error handling utilities
pub mod error {
    use super::DiskMemError;
    use std::io::ErrorKind;

    /// Whether the error is a disk IOFailure (as opposed to verification or setup)
    pub fn is_io_failure(error: &DiskMemError) -> bool {
        matches!(error, DiskMemError::IoError(_))
    }

    /// Whether the error means the measurement must not be trusted
    pub fn is_untrustworthy(error: &DiskMemError) -> bool {
        matches!(error, DiskMemError::VerificationFailure { .. })
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &DiskMemError) -> String {
        match error {
            DiskMemError::IoError(err) => match err.kind() {
                ErrorKind::PermissionDenied => {
                    "Permission denied. Pick a directory you can write to or run with elevated privileges."
                        .to_string()
                }
                ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
                    "Not enough free space on the selected disk for the test file.".to_string()
                }
                ErrorKind::NotFound => format!("Target not found: {}", err),
                _ => format!("An error occurred while testing the disk: {}", err),
            },
            DiskMemError::VerificationFailure { .. } => format!(
                "{}. The data read back does not match what was written, so no speed is reported.",
                error
            ),
            DiskMemError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            DiskMemError::CancellationError(_) => "Operation was cancelled by user.".to_string(),
            _ => error.to_string(),
        }
    }

    /// Suggest a way forward for common failures
    pub fn create_fallback_strategy(error: &DiskMemError) -> Option<String> {
        match error {
            DiskMemError::IoError(err) => match err.kind() {
                ErrorKind::StorageFull | ErrorKind::OutOfMemory => Some(
                    "Reduce the test file size or select a disk with more free space.".to_string(),
                ),
                ErrorKind::PermissionDenied => Some(
                    "Select a different location, such as your home or temp directory.".to_string(),
                ),
                _ => None,
            },
            DiskMemError::VerificationFailure { .. } => Some(
                "Re-run the test; repeated mismatches point at failing hardware or a faulty filesystem."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "diskmem";
pub const CONFIG_FILE: &str = "diskmem.toml";
pub const LOG_FILE: &str = "diskmem.log";
pub const TEST_DIR_NAME: &str = "diskmem_speed_test";
pub const TEMP_FILE_PREFIX: &str = "test_speed_";
