//! Engine configuration for patchbay.
//!
//! An [`EngineConfig`] holds everything needed to build and run a graph:
//! sample rate, block size, parallelism, meter and clip settings, the
//! failure policy and the device names. It is stored as TOML in the
//! platform config directory (see [`paths`]), validated on load, and
//! converted into a [`patchbay_core::GraphConfig`] with
//! [`EngineConfig::to_graph_config`].
//!
//! # Example
//!
//! ```rust,no_run
//! use patchbay_config::{EngineConfig, default_config_path};
//! use patchbay_core::Graph;
//!
//! let config = EngineConfig::load_or_default(default_config_path())?;
//! let graph = Graph::new(config.to_graph_config());
//! # Ok::<(), patchbay_config::ConfigError>(())
//! ```

mod engine_config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Setting validation.
pub mod validation;

pub use engine_config::{
    EngineConfig, MAX_BLOCK_SIZE, MAX_CLIP_HOLD_MS, MAX_SAMPLE_RATE, MAX_WORKER_THREADS,
    MIN_SAMPLE_RATE, TapSide,
};
pub use error::{ConfigError, FileOp};
pub use paths::{CONFIG_FILE_NAME, default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult};
