//! Configuration management for BatchScale

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{Result, BatchScaleError};
use crate::processing::FilterType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How each file is transformed
    pub resize: ResizeConfig,

    /// How many files are transformed at once
    pub concurrency: ConcurrencyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Per-file transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// JPEG quality (1-100)
    pub quality: u8,

    /// Resampling filter
    pub filter: FilterType,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            quality: 100,
            filter: FilterType::default(),
        }
    }
}

impl ResizeConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JPEG quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the resampling filter
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(BatchScaleError::config(format!(
                "Quality must be between 1 and 100, got {}",
                self.quality
            )));
        }

        Ok(())
    }
}

/// Concurrency settings for the concurrent batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub limit: ConcurrencyLimit,
}

/// Upper bound on simultaneously running transforms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConcurrencyLimit {
    /// One worker per logical CPU
    #[default]
    Auto,
    /// One task per file with no cap
    Unbounded,
    /// A fixed number of workers
    Fixed { workers: usize },
}

impl ConcurrencyLimit {
    /// Resolve to a worker count; `None` means no cap
    pub fn workers(self) -> Option<usize> {
        match self {
            Self::Auto => Some(num_cpus::get().max(1)),
            Self::Unbounded => None,
            Self::Fixed { workers } => Some(workers),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BatchScaleError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(BatchScaleError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| BatchScaleError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| BatchScaleError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(BatchScaleError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| BatchScaleError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.resize.validate()?;

        if self.concurrency.limit == (ConcurrencyLimit::Fixed { workers: 0 }) {
            return Err(BatchScaleError::config(
                "Worker count must be greater than 0"
            ));
        }

        Ok(())
    }
}
