//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/patchbay/`
//! - macOS: `~/Library/Application Support/patchbay/`
//! - Windows: `%APPDATA%\patchbay\`
//!
//! # Example
//!
//! ```rust,no_run
//! use patchbay_config::paths;
//!
//! println!("config file: {}", paths::default_config_path().display());
//! ```

use std::path::PathBuf;

use crate::error::{ConfigError, FileOp};

/// Application name used for directory paths.
const APP_NAME: &str = "patchbay";

/// File name of the engine configuration.
pub const CONFIG_FILE_NAME: &str = "patchbay.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform has none.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the engine configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensure the user config directory exists.
///
/// Creates the directory and any parent directories if they don't exist.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(ConfigError::io(FileOp::CreateDir, &dir))?;
    }

    Ok(dir)
}
