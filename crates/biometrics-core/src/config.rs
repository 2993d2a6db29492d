//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/biometrics/config.toml, `BIOMETRICS_CONFIG`, or `--config`)
//! 3. Environment variables (BIOMETRICS_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::day::LocalZone;
use crate::models::WeightUnit;

/// Environment variable prefix
const ENV_PREFIX: &str = "BIOMETRICS";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &["data_dir", "timezone", "display_unit", "log_file"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Zone used to bucket events into days: `local`, `utc` or `±HH:MM`
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Unit weights are shown in by default
    #[serde(default = "default_display_unit")]
    pub display_unit: WeightUnit,

    /// Log destination when BIOMETRICS_LOG is set; stderr if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            timezone: default_timezone(),
            display_unit: default_display_unit(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit `--config` path when given, else the default location
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
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_TZ", ENV_PREFIX)) {
            self.timezone = val;
        }

        if let Ok(val) = std::env::var(format!("{}_UNIT", ENV_PREFIX)) {
            match val.parse() {
                Ok(unit) => self.display_unit = unit,
                Err(e) => warn!("Ignoring {}_UNIT: {}", ENV_PREFIX, e),
            }
        }
    }

    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Parsed day-bucketing zone
    pub fn zone(&self) -> Result<LocalZone> {
        self.timezone
            .parse()
            .with_context(|| format!("Invalid timezone in configuration: {:?}", self.timezone))
    }

    /// Set one key from its string form, validating the value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => {
                if value.is_empty() {
                    bail!("data_dir cannot be empty");
                }
                self.data_dir = PathBuf::from(value);
            }
            "timezone" => {
                value
                    .parse::<LocalZone>()
                    .context("Invalid value for timezone")?;
                self.timezone = value.to_string();
            }
            "display_unit" => {
                self.display_unit = value
                    .parse()
                    .context("Invalid value for display_unit. Use 'kg' or 'lb'.")?;
            }
            "log_file" => {
                self.log_file = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
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
    /// Can be overridden with BIOMETRICS_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("biometrics")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("biometrics.sqlite")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("biometrics")
}

fn default_timezone() -> String {
    "local".to_string()
}

fn default_display_unit() -> WeightUnit {
    WeightUnit::Lb
}
