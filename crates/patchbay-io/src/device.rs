//! Block device contract and device-exclusivity registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{Error, Result};

/// A buffer-producing and/or buffer-consuming audio device.
///
/// Blocks are interleaved `f32` with [`channels`](Self::channels) samples
/// per frame. Devices never fail a call: problems are recorded and exposed
/// through [`error`](Self::error) while reads yield silence and writes are
/// dropped.
pub trait BlockDevice: Send {
    /// Device name, used as the exclusivity key.
    fn name(&self) -> &str;

    /// Interleaved channels per frame.
    fn channels(&self) -> usize;

    /// Opens the device for blocks of `frames` frames.
    fn start(&mut self, sample_rate: f32, frames: usize);

    /// Fills `block` with captured audio and returns the frames actually
    /// captured. The remainder of `block` is zeroed.
    fn read_block(&mut self, block: &mut [f32]) -> usize;

    /// Plays `block`.
    fn write_block(&mut self, block: &[f32]);

    /// Closes the device. Idempotent.
    fn stop(&mut self);

    /// Current failure status, if any.
    fn error(&self) -> Option<&str>;
}

/// Tracks which devices are open so that two nodes never drive one device.
///
/// Shared between nodes as an `Arc<DeviceRegistry>`.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    open: Mutex<BTreeSet<String>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims `name`.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceInUse`] if a live lease already holds it.
    pub fn acquire(self: &Arc<Self>, name: &str) -> Result<DeviceLease> {
        if !self.open.lock().insert(name.to_owned()) {
            return Err(Error::DeviceInUse(name.to_owned()));
        }
        debug!(device = name, "device acquired");
        Ok(DeviceLease {
            registry: Arc::clone(self),
            name: name.to_owned(),
        })
    }

    /// Returns true if a lease on `name` is live.
    pub fn is_open(&self, name: &str) -> bool {
        self.open.lock().contains(name)
    }

    /// Names of all leased devices, sorted.
    pub fn open_devices(&self) -> Vec<String> {
        self.open.lock().iter().cloned().collect()
    }

    fn release(&self, name: &str) {
        if self.open.lock().remove(name) {
            debug!(device = name, "device released");
        }
    }
}

/// Exclusive claim on one device; released on drop.
#[derive(Debug)]
pub struct DeviceLease {
    registry: Arc<DeviceRegistry>,
    name: String,
}

impl DeviceLease {
    /// Name of the leased device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Releases the device now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}
