//! Hardware devices via cpal.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream};
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::device::BlockDevice;
use crate::{Error, Result};

/// Blocks of slack in the sample queue between the callback and the graph.
const QUEUE_BLOCKS: usize = 8;

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// List all available audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                let is_output = device.default_output_config().is_ok();
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    // Output-only devices
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);
                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    Ok(devices)
}

/// Default input and output device names.
pub fn default_devices() -> (Option<String>, Option<String>) {
    let host = cpal::default_host();
    let input = host
        .default_input_device()
        .and_then(|d| device_name(&d).ok());
    let output = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());
    (input, output)
}

/// Which way samples flow through a [`CpalDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceDirection {
    /// Capture.
    Input,
    /// Playback.
    Output,
}

enum Queue {
    Idle,
    Capture(Receiver<f32>),
    Playback(Sender<f32>),
}

/// A cpal stream bridged to the block interface through a bounded sample queue.
///
/// The cpal callback runs on the driver's thread; [`read_block`](BlockDevice::read_block)
/// and [`write_block`](BlockDevice::write_block) never wait on it. Underruns
/// read as silence and overruns drop samples.
pub struct CpalDevice {
    name: String,
    direction: DeviceDirection,
    channels: usize,
    device: Device,
    stream: Option<Stream>,
    queue: Queue,
    stream_error: Arc<Mutex<Option<String>>>,
    error: Option<String>,
}

impl CpalDevice {
    /// Looks up a device by index, exact name or case-insensitive substring;
    /// `None` selects the host default.
    pub fn open(name: Option<&str>, direction: DeviceDirection, channels: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = match (name, direction) {
            (Some(search), _) => find_device(&host, search, direction)?,
            (None, DeviceDirection::Input) => host.default_input_device().ok_or(Error::NoDevice)?,
            (None, DeviceDirection::Output) => {
                host.default_output_device().ok_or(Error::NoDevice)?
            }
        };
        let name = device_name(&device).map_err(|e| Error::Stream(e.to_string()))?;
        Ok(Self {
            name,
            direction,
            channels: channels.clamp(1, 2),
            device,
            stream: None,
            queue: Queue::Idle,
            stream_error: Arc::new(Mutex::new(None)),
            error: None,
        })
    }

    /// Capture or playback.
    pub fn direction(&self) -> DeviceDirection {
        self.direction
    }

    fn build(&mut self, sample_rate: f32, frames: usize) -> Result<()> {
        let config = cpal::StreamConfig {
            channels: self.channels as u16,
            sample_rate: sample_rate as u32,
            buffer_size: cpal::BufferSize::Fixed(frames as u32),
        };
        let slot = Arc::clone(&self.stream_error);
        let on_error = move |err: cpal::StreamError| {
            *slot.lock() = Some(err.to_string());
        };
        let (tx, rx) = bounded::<f32>(frames * self.channels * QUEUE_BLOCKS);

        let stream = match self.direction {
            DeviceDirection::Input => {
                let stream = self
                    .device
                    .build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            for &sample in data {
                                let _ = tx.try_send(sample);
                            }
                        },
                        on_error,
                        None,
                    )
                    .map_err(|e| Error::Stream(e.to_string()))?;
                self.queue = Queue::Capture(rx);
                stream
            }
            DeviceDirection::Output => {
                let stream = self
                    .device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            for sample in data.iter_mut() {
                                *sample = rx.try_recv().unwrap_or(0.0);
                            }
                        },
                        on_error,
                        None,
                    )
                    .map_err(|e| Error::Stream(e.to_string()))?;
                self.queue = Queue::Playback(tx);
                stream
            }
        };

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        self.stream = Some(stream);
        info!(
            device = %self.name,
            channels = self.channels,
            sample_rate,
            frames,
            "stream started"
        );
        Ok(())
    }

    fn poll_error(&mut self) {
        if let Some(message) = self.stream_error.lock().take() {
            warn!(device = %self.name, %message, "stream error");
            self.error = Some(message);
        }
    }
}

impl BlockDevice for CpalDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self, sample_rate: f32, frames: usize) {
        self.stop();
        self.error = None;
        if let Err(err) = self.build(sample_rate, frames) {
            warn!(device = %self.name, %err, "could not open device");
            self.error = Some(err.to_string());
            self.queue = Queue::Idle;
        }
    }

    fn read_block(&mut self, block: &mut [f32]) -> usize {
        self.poll_error();
        let Queue::Capture(rx) = &self.queue else {
            block.fill(0.0);
            return 0;
        };
        let mut received = 0;
        for sample in block.iter_mut() {
            match rx.try_recv() {
                Ok(s) => {
                    *sample = s;
                    received += 1;
                }
                Err(_) => *sample = 0.0,
            }
        }
        received / self.channels
    }

    fn write_block(&mut self, block: &[f32]) {
        self.poll_error();
        if let Queue::Playback(tx) = &self.queue {
            for &sample in block {
                if tx.try_send(sample).is_err() {
                    break;
                }
            }
        }
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!(device = %self.name, "stream stopped");
        }
        self.queue = Queue::Idle;
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CpalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalDevice")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("channels", &self.channels)
            .field("running", &self.stream.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Finds a device by index, exact name, or case-insensitive substring.
fn find_device(host: &Host, name_or_index: &str, direction: DeviceDirection) -> Result<Device> {
    let (devices, kind): (Vec<Device>, &str) = match direction {
        DeviceDirection::Input => (
            host.input_devices()
                .map_err(|e| Error::Stream(e.to_string()))?
                .collect(),
            "input",
        ),
        DeviceDirection::Output => (
            host.output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?
                .collect(),
            "output",
        ),
    };

    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{} device index {} (only {} devices available)",
                kind,
                index,
                devices.len()
            ))
        });
    }

    for device in &devices {
        if device_name(device).is_ok_and(|n| n == name_or_index) {
            return Ok(device.clone());
        }
    }

    let search_lower = name_or_index.to_lowercase();
    let mut matches: Vec<(Device, String)> = devices
        .iter()
        .filter_map(|d| {
            device_name(d)
                .ok()
                .filter(|name| name.to_lowercase().contains(&search_lower))
                .map(|name| (d.clone(), name))
        })
        .collect();

    match matches.len() {
        0 => Err(Error::DeviceNotFound(format!(
            "no {} device matching '{}'",
            kind, name_or_index
        ))),
        1 => Ok(matches.remove(0).0),
        _ => {
            let names: Vec<&str> = matches.iter().map(|(_, n)| n.as_str()).collect();
            warn!(
                search = name_or_index,
                kind,
                ?names,
                "several devices match, using the first"
            );
            Ok(matches.remove(0).0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // Device availability depends on the system; only check it does not fail.
        assert!(list_devices().is_ok());
    }

    #[test]
    fn test_missing_device_is_an_error() {
        let result = CpalDevice::open(
            Some("patchbay-no-such-device-7f3a"),
            DeviceDirection::Output,
            2,
        );
        assert!(matches!(
            result,
            Err(Error::DeviceNotFound(_) | Error::Stream(_) | Error::NoDevice)
        ));
    }
}
