//! Configuration management module
//!
//! Handles loading, saving, and validation of the disk and memory test
//! parameters and logging preferences.

use crate::io::memory::MemoryStatus;
use crate::logging::LogLevel;
use crate::util::units::GIB;
use crate::{DiskMemError, Result, APP_NAME, CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest test file the disk benchmark accepts, in MB (100 GiB)
pub const MAX_SIZE_MB: u32 = 100 * 1024;

/// Largest sweep ceiling accepted, in GB (4 TiB)
pub const MAX_SWEEP_GB: u32 = 4096;

/// Default share of available memory a sweep may reach
pub const DEFAULT_CEILING_FRACTION: f64 = 0.9;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub disk: DiskTestConfig,
    pub memory: MemoryTestConfig,
    pub logging: LoggingConfig,
}

/// Parameters of the disk write/read test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskTestConfig {
    /// Directory on the volume under test
    pub target_path: PathBuf,
    /// Test file size in MB
    pub size_mb: u32,
}

/// Parameters of the memory allocation sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryTestConfig {
    /// Share of currently available memory the sweep may reach (0, 1]
    pub ceiling_fraction: f64,
    /// Explicit ceiling in GB, overrides the fraction when set
    pub max_gb: Option<u32>,
    /// Whether sweep buffers are freed between steps
    pub retention: BufferRetention,
}

/// What happens to a sweep step's buffer once it has been timed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferRetention {
    /// Drop each buffer before the next allocation
    #[default]
    Release,
    /// Keep every buffer alive until the sweep ends
    Retain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl Default for DiskTestConfig {
    fn default() -> Self {
        Self {
            target_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            size_mb: 100,
        }
    }
}

impl Default for MemoryTestConfig {
    fn default() -> Self {
        Self {
            ceiling_fraction: DEFAULT_CEILING_FRACTION,
            max_gb: None,
            retention: BufferRetention::Release,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

impl BufferRetention {
    /// Get a human-readable description of the policy
    pub fn description(&self) -> &'static str {
        match self {
            BufferRetention::Release => "release each buffer",
            BufferRetention::Retain => "retain all buffers",
        }
    }
}

impl DiskTestConfig {
    /// Set the directory to test
    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = path.into();
        self
    }

    /// Set the test file size in MB
    pub fn with_size_mb(mut self, size_mb: u32) -> Self {
        self.size_mb = size_mb;
        self
    }

    /// Validate the size without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        validate_size_mb(self.size_mb)
    }

    /// Validate that the target exists and is a directory
    pub fn validate_target(&self) -> Result<()> {
        validate_target_path(&self.target_path)
    }
}

impl MemoryTestConfig {
    /// Set an explicit sweep ceiling
    pub fn with_max_gb(mut self, max_gb: u32) -> Self {
        self.max_gb = Some(max_gb);
        self
    }

    /// Set the buffer retention policy
    pub fn with_retention(mut self, retention: BufferRetention) -> Self {
        self.retention = retention;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ceiling_fraction > 0.0 && self.ceiling_fraction <= 1.0) {
            return Err(DiskMemError::ConfigError(format!(
                "Ceiling fraction must be in (0, 1], got {}",
                self.ceiling_fraction
            )));
        }

        if self.max_gb == Some(0) {
            return Err(DiskMemError::ConfigError(
                "max_gb must be at least 1 when set".to_string(),
            ));
        }

        if let Some(max_gb) = self.max_gb.filter(|&gb| gb > MAX_SWEEP_GB) {
            return Err(DiskMemError::ConfigError(format!(
                "max_gb too large: {} GB (max: {} GB)",
                max_gb, MAX_SWEEP_GB
            )));
        }

        Ok(())
    }

    /// Sweep ceiling in whole GB for the given memory status
    ///
    /// Uses `max_gb` if configured, otherwise `ceiling_fraction` of the
    /// currently available memory, rounded down. Never above `MAX_SWEEP_GB`.
    pub fn resolve_max_gb(&self, status: &MemoryStatus) -> u32 {
        if let Some(max_gb) = self.max_gb {
            return max_gb.min(MAX_SWEEP_GB);
        }

        let ceiling_bytes = status.available_bytes as f64 * self.ceiling_fraction;
        ((ceiling_bytes / GIB as f64).floor() as u32).min(MAX_SWEEP_GB)
    }
}

/// Check a disk test size in MB
pub fn validate_size_mb(size_mb: u32) -> Result<()> {
    if size_mb == 0 {
        return Err(DiskMemError::ConfigError(
            "File size must be a positive number".to_string(),
        ));
    }

    if size_mb > MAX_SIZE_MB {
        return Err(DiskMemError::ConfigError(format!(
            "File size too large: {} MB (max: {} MB)",
            size_mb, MAX_SIZE_MB
        )));
    }

    Ok(())
}

/// Check that a disk test target is an existing directory
pub fn validate_target_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DiskMemError::ConfigError(format!(
            "Target path does not exist: {}",
            path.display()
        )));
    }

    if !path.is_dir() {
        return Err(DiskMemError::ConfigError(format!(
            "Target path is not a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.disk.validate()?;
        self.memory.validate()?;
        Ok(())
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            DiskMemError::ConfigError(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            DiskMemError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DiskMemError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| {
            DiskMemError::ConfigError(format!(
                "Failed to write config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/diskmem/diskmem.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DiskMemError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn status(available_gb: f64) -> MemoryStatus {
        MemoryStatus {
            total_bytes: 64 * GIB,
            available_bytes: (available_gb * GIB as f64) as u64,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.disk.size_mb, 100);
        assert_eq!(config.memory.retention, BufferRetention::Release);
        assert_eq!(config.memory.ceiling_fraction, DEFAULT_CEILING_FRACTION);
    }

    #[test]
    fn test_size_validation() {
        assert!(validate_size_mb(0).is_err());
        assert!(validate_size_mb(1).is_ok());
        assert!(validate_size_mb(MAX_SIZE_MB).is_ok());
        assert!(validate_size_mb(MAX_SIZE_MB + 1).is_err());
    }

    #[test]
    fn test_target_validation() {
        let temp_dir = TempDir::new().unwrap();
        let ok = DiskTestConfig::default().with_target_path(temp_dir.path());
        assert!(ok.validate_target().is_ok());

        let missing = DiskTestConfig::default().with_target_path(temp_dir.path().join("nope"));
        assert!(matches!(
            missing.validate_target(),
            Err(DiskMemError::ConfigError(_))
        ));

        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        let not_dir = DiskTestConfig::default().with_target_path(file);
        assert!(not_dir.validate_target().is_err());
    }

    #[test]
    fn test_resolve_max_gb() {
        let memory = MemoryTestConfig::default();
        // 90% of 10 GB is 9 GB
        assert_eq!(memory.resolve_max_gb(&status(10.0)), 9);
        // 90% of 1.5 GB rounds down to 1
        assert_eq!(memory.resolve_max_gb(&status(1.5)), 1);
        assert_eq!(memory.resolve_max_gb(&status(0.5)), 0);

        let fixed = MemoryTestConfig::default().with_max_gb(3);
        assert_eq!(fixed.resolve_max_gb(&status(100.0)), 3);
    }

    #[test]
    fn test_memory_validation() {
        let mut memory = MemoryTestConfig::default();
        memory.ceiling_fraction = 0.0;
        assert!(memory.validate().is_err());
        memory.ceiling_fraction = 1.5;
        assert!(memory.validate().is_err());
        memory.ceiling_fraction = 1.0;
        assert!(memory.validate().is_ok());
        memory.max_gb = Some(0);
        assert!(memory.validate().is_err());
    }

    #[test]
    fn test_max_gb_upper_bound() {
        let memory = MemoryTestConfig::default().with_max_gb(MAX_SWEEP_GB);
        assert!(memory.validate().is_ok());

        let memory = MemoryTestConfig::default().with_max_gb(MAX_SWEEP_GB + 1);
        assert!(memory.validate().is_err());

        // Builders skip validation, so the ceiling is clamped as well
        let huge = MemoryTestConfig::default().with_max_gb(4_000_000_000);
        assert_eq!(huge.resolve_max_gb(&status(16.0)), MAX_SWEEP_GB);
    }

    #[test]
    fn test_huge_max_gb_in_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "[memory]\nmax_gb = 4000000000\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_gb too large"));
    }

    #[test]
    fn test_toml_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.disk = config.disk.with_size_mb(42);
        config.memory = config
            .memory
            .with_max_gb(2)
            .with_retention(BufferRetention::Retain);
        config.save_to(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("retention = \"retain\""));

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.disk.size_mb, 42);
        assert_eq!(loaded.memory.max_gb, Some(2));
        assert_eq!(loaded.memory.retention, BufferRetention::Retain);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[disk]\nsize_mb = 7\n").unwrap();
        assert_eq!(config.disk.size_mb, 7);
        assert_eq!(config.memory.ceiling_fraction, DEFAULT_CEILING_FRACTION);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.disk.size_mb, 100);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "[disk]\nsize_mb = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(DiskMemError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_file_path() {
        let path = AppConfig::config_file_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("diskmem.toml"));
    }
}
