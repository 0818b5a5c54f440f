//! Typed error variants for the shader-stash-config crate.
//!
//! Callers can match on specific failure modes instead of opaque strings;
//! `anyhow` users get these coerced automatically through `std::error::Error`.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur when loading or saving a stash configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing the config file.
    Io {
        /// Path of the file that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file contained invalid YAML.
    Parse(serde_yaml_ng::Error),

    /// The configuration could not be serialized to YAML.
    Serialize(serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string describes which field is invalid and why.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "I/O error accessing config '{}': {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "YAML parse error in config: {e}"),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {e}"),
            ConfigError::Validation(msg) => write!(f, "Config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) | ConfigError::Serialize(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(e)
    }
}
