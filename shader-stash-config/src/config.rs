//! Stash configuration file format and loading.

use crate::defaults;
use crate::error::ConfigError;
use crate::types::ShaderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one shader stash.
///
/// ```yaml
/// shader_dir: assets/shaders
/// scan_interval_ms: 250
/// hot_reload: true
/// extensions:
///   vs: vertex
///   fs: fragment
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StashConfig {
    /// Directory tree scanned for shader sources.
    #[serde(default = "defaults::shader_dir")]
    pub shader_dir: PathBuf,

    /// Pause between two watcher scans, in milliseconds.
    #[serde(default = "defaults::scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Start the background watcher as soon as the stash is built.
    #[serde(default = "defaults::hot_reload")]
    pub hot_reload: bool,

    /// Extra file extension (without the dot) to shader kind mappings.
    /// Entries here override the built-in table.
    #[serde(default)]
    pub extensions: BTreeMap<String, ShaderKind>,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            shader_dir: defaults::shader_dir(),
            scan_interval_ms: defaults::scan_interval_ms(),
            hot_reload: defaults::hot_reload(),
            extensions: BTreeMap::new(),
        }
    }
}

impl StashConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading stash config from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: StashConfig = serde_yaml_ng::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and write the configuration as YAML, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::Serialize)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, yaml).map_err(io_err)?;
        log::info!("Saved stash config to {}", path.display());
        Ok(())
    }

    /// Check field values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "scan_interval_ms must be greater than zero".to_string(),
            ));
        }
        for ext in self.extensions.keys() {
            if ext.is_empty() || ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "extension '{ext}' must be non-empty and given without a leading dot"
                )));
            }
        }
        Ok(())
    }

    /// Scan interval as a `Duration`.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Default config file location: `<config dir>/shader-stash/config.yaml`.
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("shader-stash").join("config.yaml")
        } else {
            // Fallback if the platform config directory cannot be determined
            PathBuf::from("config.yaml")
        }
    }
}
