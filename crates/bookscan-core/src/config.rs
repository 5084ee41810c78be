//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/bookscan/config.toml)
//! 3. Environment variables (BOOKSCAN_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{ApplicationId, DEFAULT_ENDPOINT};
use crate::error::ConfigurationError;
use crate::scan::GateOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "BOOKSCAN";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Book catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Scan gate timing and geometry
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Book catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog credential; required for any lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    /// Search endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            application_id: None,
            endpoint: default_endpoint(),
        }
    }
}

impl CatalogConfig {
    /// The configured credential, or a configuration error
    pub fn application_id(&self) -> Result<ApplicationId, ConfigurationError> {
        let value = self
            .application_id
            .as_deref()
            .ok_or(ConfigurationError::MissingApplicationId)?;
        ApplicationId::new(value)
    }

    pub fn has_application_id(&self) -> bool {
        self.application_id().is_ok()
    }
}

/// Scan gate timing and geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How long an armed gate waits for a barcode before disarming
    #[serde(default = "default_arm_timeout_ms")]
    pub arm_timeout_ms: u64,

    /// Refractory period after an accepted scan
    #[serde(default = "default_cool_down_ms")]
    pub cool_down_ms: u64,

    /// Camera frame height in pixels, for pixel bounding boxes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            arm_timeout_ms: default_arm_timeout_ms(),
            cool_down_ms: default_cool_down_ms(),
            frame_height: None,
        }
    }
}

impl ScanConfig {
    /// Gate options derived from this configuration
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            arm_timeout: Duration::from_millis(self.arm_timeout_ms),
            cool_down: Duration::from_millis(self.cool_down_ms),
            frame_height: self.frame_height,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BOOKSCAN_APPLICATION_ID, BOOKSCAN_CATALOG_ENDPOINT, ...)
    /// 2. Config file (~/.config/bookscan/config.toml or BOOKSCAN_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path (e.g. `--config`)
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read only the file at `path`, without environment overrides
    ///
    /// Use this before editing and saving, so values that came from the
    /// environment are not written back to disk.
    pub fn read_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // BOOKSCAN_APPLICATION_ID
        if let Some(val) = env_var("APPLICATION_ID") {
            self.catalog.application_id = if val.is_empty() { None } else { Some(val) };
        }

        // BOOKSCAN_CATALOG_ENDPOINT
        if let Some(val) = env_var("CATALOG_ENDPOINT") {
            if !val.is_empty() {
                self.catalog.endpoint = val;
            }
        }

        // BOOKSCAN_ARM_TIMEOUT_MS
        if let Some(ms) = env_parse::<u64>("ARM_TIMEOUT_MS") {
            self.scan.arm_timeout_ms = ms;
        }

        // BOOKSCAN_COOL_DOWN_MS
        if let Some(ms) = env_parse::<u64>("COOL_DOWN_MS") {
            self.scan.cool_down_ms = ms;
        }

        // BOOKSCAN_FRAME_HEIGHT
        if let Some(height) = env_parse::<f64>("FRAME_HEIGHT") {
            self.scan.frame_height = Some(height).filter(|h| *h > 0.0);
        }

        // BOOKSCAN_LOG_FILE
        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = if val.is_empty() { None } else { Some(val.into()) };
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BOOKSCAN_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookscan")
            .join("config.toml")
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    let raw = env_var(suffix)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}_{}={:?}: not a number", ENV_PREFIX, suffix, raw);
            None
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_arm_timeout_ms() -> u64 {
    3_000
}

fn default_cool_down_ms() -> u64 {
    2_000
}
