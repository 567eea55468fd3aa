// CLI configuration: compiled defaults < YAML config file < command-line flags

use crate::storage::validate_key;
use crate::store::STORAGE_KEY;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "tasklist";
const CONFIG_FILE_NAME: &str = "config.yml";

/// Config file contents; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    store_dir: Option<PathBuf>,
    storage_key: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the storage files
    pub store_dir: PathBuf,
    /// Key the task list is stored under
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            storage_key: STORAGE_KEY.to_string(),
        }
    }
}

/// `<data dir>/tasklist`, or `./.tasklist` when the platform has no data dir
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".tasklist"))
}

/// `<config dir>/tasklist/config.yml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config path is
    /// read if present; a missing default file just means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(eyre!("Config file not found: {}", path.display()));
                }
                Self::from_file(path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = ?path, "Loading config file");
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content).wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse YAML and layer it over the defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML config")?
        };

        let mut config = Self::default();
        if let Some(store_dir) = file.store_dir {
            config.store_dir = store_dir;
        }
        if let Some(storage_key) = file.storage_key {
            config.storage_key = storage_key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, store_dir: Option<PathBuf>, storage_key: Option<String>) -> Result<Self> {
        if let Some(store_dir) = store_dir {
            self.store_dir = store_dir;
        }
        if let Some(storage_key) = storage_key {
            self.storage_key = storage_key;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        validate_key(&self.storage_key)
    }
}
