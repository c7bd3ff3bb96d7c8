//! Service configuration
//!
//! Loaded from a TOML file (default `cleanair.toml`) and then overridden by
//! environment variables, which may themselves come from a `.env` file.
//! Every field has a default, so a missing file is not an error.
//!
//! ```toml
//! [dataset]
//! path = "data/AQI_and_LatLong.csv"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [logging]
//! level = "info"
//! file = "cleanair.log"
//! console_timestamps = false
//!
//! [openaq]
//! base_url = "https://api.openaq.org/v2/measurements"
//! radius_m = 100000
//! fallback_radii_m = [200000, 300000]
//! limit = 400
//! timeout_secs = 20
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::LogLevel;

pub const DEFAULT_CONFIG_PATH: &str = "cleanair.toml";

/// Environment variables applied on top of the file.
pub const ENV_DATASET: &str = "CLEANAIR_DATASET";
pub const ENV_BIND: &str = "CLEANAIR_BIND";
pub const ENV_LOG_LEVEL: &str = "CLEANAIR_LOG_LEVEL";
pub const ENV_OPENAQ_API_KEY: &str = "OPENAQ_API_KEY";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {var}")]
    InvalidOverride { var: &'static str, value: String },
}

// ============================================================================
// TOML Configuration Structures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub openaq: OpenAqConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// CSV file holding the reference cities.
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/AQI_and_LatLong.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            console_timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenAqConfig {
    pub base_url: String,
    /// First search radius, metres.
    pub radius_m: u32,
    /// Wider radii tried in order when the first comes back empty or fails.
    pub fallback_radii_m: Vec<u32>,
    pub limit: u32,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for OpenAqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openaq.org/v2/measurements".to_string(),
            radius_m: 100_000,
            fallback_radii_m: vec![200_000, 300_000],
            limit: 400,
            timeout_secs: 20,
            api_key: None,
        }
    }
}

impl OpenAqConfig {
    /// The configured radius followed by the fallbacks.
    pub fn radii(&self) -> Vec<u32> {
        std::iter::once(self.radius_m)
            .chain(self.fallback_radii_m.iter().copied())
            .collect()
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `.env`, then the file, then applies environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = Self::load_file(path)?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Taking a closure keeps this testable without touching the
    /// process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATASET) {
            self.dataset.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level.parse().map_err(|_| ConfigError::InvalidOverride {
                var: ENV_LOG_LEVEL,
                value: level.clone(),
            })?;
        }
        if let Some(key) = lookup(ENV_OPENAQ_API_KEY) {
            if !key.trim().is_empty() {
                self.openaq.api_key = Some(key);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
