//! Configuration types and parsing for tunevault.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names searched by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["tunevault.yml", "tunevault.yaml"];

/// Main configuration from tunevault.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Library database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Schema migration settings
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Deferred metadata refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Library database location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the DuckDB file, relative to the config directory
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Schema migration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Interval between progress pulses while a legacy import runs
    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            pulse_interval_ms: default_pulse_interval_ms(),
        }
    }
}

impl MigrationConfig {
    /// Pulse interval as a [`Duration`]
    pub fn pulse_interval(&self) -> Duration {
        Duration::from_millis(self.pulse_interval_ms)
    }
}

/// Deferred metadata refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshConfig {
    /// Arm the metadata refresh after a migration leaves metadata stale
    #[serde(default = "default_refresh_enabled")]
    pub enabled: bool,

    /// Minimum delay between arming and starting the refresh pass
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_refresh_enabled(),
            min_delay_ms: default_min_delay_ms(),
        }
    }
}

impl RefreshConfig {
    /// Minimum delay as a [`Duration`]
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

fn default_refresh_enabled() -> bool {
    true
}

fn default_database_path() -> String {
    "library.duckdb".to_string()
}

fn default_pulse_interval_ms() -> u64 {
    100
}

fn default_min_delay_ms() -> u64 {
    3000
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for tunevault.yml or tunevault.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Load from a directory, falling back to defaults when no config file exists.
    ///
    /// Parse and validation errors still surface.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { path }) => {
                log::debug!("No config at {path}, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.migration.pulse_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "migration.pulse_interval_ms must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve the database path against the directory holding the config
    pub fn database_path_absolute(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.database.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
