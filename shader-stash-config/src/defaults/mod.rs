//! Default values for stash settings.
//!
//! Used as `#[serde(default = "...")]` targets so that a partial YAML file
//! still produces a complete configuration.

use std::path::PathBuf;

pub fn shader_dir() -> PathBuf {
    PathBuf::from("shaders")
}

pub fn scan_interval_ms() -> u64 {
    1000 // One scan per second
}

pub fn hot_reload() -> bool {
    false // Watcher starts idle until explicitly enabled
}
