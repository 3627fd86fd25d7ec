//! CLI command implementations.

pub mod config;
pub mod devices;
pub mod info;
pub mod process;

use std::path::Path;

use patchbay_config::{EngineConfig, default_config_path};

/// Loads `path`, or the default config file if present, or defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_or_default(default_config_path())?,
    };
    Ok(config)
}
