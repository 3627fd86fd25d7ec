//! Device layer and file I/O for the patchbay graph runtime.
//!
//! This crate provides:
//!
//! - **Devices**: the [`BlockDevice`] collaborator trait, a deterministic
//!   [`MemoryDevice`] and a cpal-backed [`CpalDevice`]
//! - **Exclusivity**: an injected [`DeviceRegistry`] handing out one
//!   [`DeviceLease`] per physical device
//! - **Device nodes**: [`DeviceInputNode`] / [`DeviceOutputNode`] that place a
//!   device directly inside a graph
//! - **Driving a graph**: [`BlockEngine`] for device-paced and offline rendering
//! - **WAV file I/O**: [`read_wav`], [`write_wav`] and [`read_wav_info`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patchbay_core::{AudioInputNode, AudioOutputNode, GainNode, Graph, PortId, SignalType};
//! use patchbay_io::{BlockEngine, read_wav, write_wav};
//!
//! let (samples, spec) = read_wav("input.wav")?;
//!
//! let mut graph = Graph::default();
//! graph.add_node(AudioInputNode::new("in", SignalType::Stereo))?;
//! graph.add_node(GainNode::new("gain", SignalType::Stereo, -6.0))?;
//! graph.add_node(AudioOutputNode::new("out", SignalType::Stereo))?;
//! graph.set_input_tap("in")?;
//! graph.set_output_tap("out")?;
//! graph.connect(&PortId::output("in", 0), &PortId::input("gain", 0))?;
//! graph.connect(&PortId::output("gain", 0), &PortId::input("out", 0))?;
//!
//! let mut engine = BlockEngine::new(graph, spec.sample_rate as f32, 256);
//! let processed = engine.render_offline(&samples, spec.channels as usize, 2)?;
//! write_wav("output.wav", &processed, spec.with_channels(2))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cpal_device;
mod device;
mod engine;
mod memory;
mod nodes;
mod wav;

pub use cpal_device::{AudioDevice, CpalDevice, DeviceDirection, default_devices, list_devices};
pub use device::{BlockDevice, DeviceLease, DeviceRegistry};
pub use engine::BlockEngine;
pub use memory::{MemoryCapture, MemoryDevice};
pub use nodes::{DeviceInputNode, DeviceOutputNode};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for device and file I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Another node already holds the device.
    #[error("Device '{0}' is already in use")]
    DeviceInUse(String),

    /// The WAV layout cannot be handled.
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u16),

    /// Graph mutation or topology error.
    #[error(transparent)]
    Graph(#[from] patchbay_core::GraphError),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for device and file I/O.
pub type Result<T> = std::result::Result<T, Error>;
