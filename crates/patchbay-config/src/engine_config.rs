//! Engine settings file.

use std::path::Path;
use std::time::Duration;

use patchbay_core::{FailurePolicy, GraphConfig, SpectrumSource};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, FileOp};
use crate::validation::{Checker, ValidationResult};

/// Lowest accepted sample rate, in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Highest accepted sample rate, in Hz.
pub const MAX_SAMPLE_RATE: u32 = 192_000;
/// Largest accepted block size, in frames.
pub const MAX_BLOCK_SIZE: usize = 8192;
/// Largest accepted worker count.
pub const MAX_WORKER_THREADS: usize = 64;
/// Longest accepted clip hold, in milliseconds.
pub const MAX_CLIP_HOLD_MS: u64 = 10_000;

/// Which external block feeds the spectrum listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapSide {
    /// Block handed to the graph.
    Input,
    /// Block produced by the graph.
    #[default]
    Output,
}

impl From<TapSide> for SpectrumSource {
    fn from(side: TapSide) -> Self {
        match side {
            TapSide::Input => SpectrumSource::Input,
            TapSide::Output => SpectrumSource::Output,
        }
    }
}

/// Engine configuration stored as TOML.
///
/// Missing keys take their default, unknown keys are rejected.
///
/// ```toml
/// sample_rate = 48000
/// block_size = 256
/// parallel = true
/// worker_threads = 0
/// clip_hold_ms = 500
/// meter_floor_db = -100.0
/// silence_after = 8
/// spectrum_source = "output"
/// output_device = "default"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per processing block.
    pub block_size: usize,
    /// Run independent nodes of a level on the worker pool.
    pub parallel: bool,
    /// Worker threads; `0` picks hardware threads minus one.
    pub worker_threads: usize,
    /// Hold window of the clip indicators, in milliseconds.
    pub clip_hold_ms: u64,
    /// Meter floor in dB.
    pub meter_floor_db: f32,
    /// Consecutive failed blocks before a node is silenced; `0` never silences.
    pub silence_after: u32,
    /// Tap analysed by the spectrum listener.
    pub spectrum_source: TapSide,
    /// Capture device name or index; `None` selects the host default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Playback device name or index; `None` selects the host default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        Self {
            sample_rate: graph.sample_rate as u32,
            block_size: graph.max_frames,
            parallel: graph.parallel,
            worker_threads: graph.worker_threads,
            clip_hold_ms: graph.clip_hold.as_millis() as u64,
            meter_floor_db: graph.meter_floor_db,
            silence_after: graph.failure_policy.silence_after,
            spectrum_source: TapSide::default(),
            input_device: None,
            output_device: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(ConfigError::io(FileOp::Read, path))?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(ConfigError::io(FileOp::CreateDir, parent))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(ConfigError::io(FileOp::Write, path))?;
        debug!(path = %path.display(), "saved engine config");
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut checker = Checker::default();
        checker.range(
            "sample_rate",
            f64::from(self.sample_rate),
            f64::from(MIN_SAMPLE_RATE),
            f64::from(MAX_SAMPLE_RATE),
        );
        checker.range(
            "block_size",
            self.block_size as f64,
            1.0,
            MAX_BLOCK_SIZE as f64,
        );
        checker.range(
            "worker_threads",
            self.worker_threads as f64,
            0.0,
            MAX_WORKER_THREADS as f64,
        );
        checker.range(
            "clip_hold_ms",
            self.clip_hold_ms as f64,
            0.0,
            MAX_CLIP_HOLD_MS as f64,
        );
        checker.range(
            "meter_floor_db",
            f64::from(self.meter_floor_db),
            -200.0,
            -20.0,
        );
        for (field, device) in [
            ("input_device", &self.input_device),
            ("output_device", &self.output_device),
        ] {
            checker.require(
                device.as_ref().is_none_or(|name| !name.trim().is_empty()),
                field,
                "device name is empty",
            );
        }
        checker.finish()
    }

    /// Graph settings derived from this configuration.
    pub fn to_graph_config(&self) -> GraphConfig {
        GraphConfig {
            sample_rate: self.sample_rate as f32,
            max_frames: self.block_size,
            parallel: self.parallel,
            worker_threads: self.worker_threads,
            clip_hold: Duration::from_millis(self.clip_hold_ms),
            meter_floor_db: self.meter_floor_db,
            failure_policy: FailurePolicy {
                silence_after: self.silence_after,
            },
            spectrum_source: self.spectrum_source.into(),
        }
    }
}
