//! Configuration system for the shader-stash live shader cache.
//!
//! This crate provides configuration loading and default values for the
//! stash. It includes:
//!
//! - The `StashConfig` file format (YAML)
//! - Shader kind definitions shared with the core crate
//! - Typed configuration errors

pub mod config;
pub mod defaults;
pub mod error;
mod types;

pub use config::StashConfig;
pub use error::ConfigError;
pub use types::ShaderKind;
