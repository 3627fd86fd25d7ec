//! Deterministic in-memory device.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::device::BlockDevice;

/// Shared view of everything written to a [`MemoryDevice`].
#[derive(Clone, Debug, Default)]
pub struct MemoryCapture {
    samples: Arc<Mutex<Vec<f32>>>,
    starts: Arc<AtomicUsize>,
}

impl MemoryCapture {
    /// Copy of the captured interleaved samples.
    pub fn samples(&self) -> Vec<f32> {
        self.samples.lock().clone()
    }

    /// Number of captured samples.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `start` calls on the device.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::Relaxed)
    }
}

/// Plays back a fixed interleaved buffer and records everything written.
///
/// Reads past the end of the source yield silence. A device created with
/// [`failing`](Self::failing) reports its message from `start` on.
#[derive(Debug)]
pub struct MemoryDevice {
    name: String,
    channels: usize,
    source: Vec<f32>,
    cursor: usize,
    capture: MemoryCapture,
    fail_with: Option<String>,
    error: Option<String>,
    running: bool,
}

impl MemoryDevice {
    /// Device producing `source` and capturing writes.
    pub fn new(name: impl Into<String>, channels: usize, source: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            channels: channels.max(1),
            source,
            cursor: 0,
            capture: MemoryCapture::default(),
            fail_with: None,
            error: None,
            running: false,
        }
    }

    /// Capture-only device.
    pub fn sink(name: impl Into<String>, channels: usize) -> Self {
        Self::new(name, channels, Vec::new())
    }

    /// Device that fails to open with `message`.
    pub fn failing(name: impl Into<String>, channels: usize, message: impl Into<String>) -> Self {
        let mut device = Self::sink(name, channels);
        device.fail_with = Some(message.into());
        device
    }

    /// Handle to the captured output, usable after the device is moved.
    pub fn capture(&self) -> MemoryCapture {
        self.capture.clone()
    }

    /// Returns true once the whole source has been read.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.source.len()
    }

    /// Returns true between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl BlockDevice for MemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self, _sample_rate: f32, _frames: usize) {
        if let Some(message) = &self.fail_with {
            self.error = Some(message.clone());
            return;
        }
        self.running = true;
        self.capture.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn read_block(&mut self, block: &mut [f32]) -> usize {
        if !self.running {
            block.fill(0.0);
            return 0;
        }
        let available = self.source.len().saturating_sub(self.cursor);
        let frames = block.len().min(available) / self.channels;
        let len = frames * self.channels;
        block[..len].copy_from_slice(&self.source[self.cursor..self.cursor + len]);
        block[len..].fill(0.0);
        self.cursor += len;
        frames
    }

    fn write_block(&mut self, block: &[f32]) {
        if self.running {
            self.capture.samples.lock().extend_from_slice(block);
        }
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_then_silence() {
        let mut device = MemoryDevice::new("mem", 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        device.start(48000.0, 2);

        let mut block = [9.0f32; 4];
        assert_eq!(device.read_block(&mut block), 2);
        assert_eq!(block, [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(device.read_block(&mut block), 1);
        assert_eq!(block, [5.0, 6.0, 0.0, 0.0]);
        assert!(device.is_exhausted());

        assert_eq!(device.read_block(&mut block), 0);
        assert_eq!(block, [0.0; 4]);
    }

    #[test]
    fn test_capture_outlives_device() {
        let mut device = MemoryDevice::sink("mem", 1);
        let capture = device.capture();
        device.start(48000.0, 2);
        device.write_block(&[0.25, 0.5]);
        device.stop();
        device.write_block(&[1.0]);
        drop(device);
        assert_eq!(capture.samples(), vec![0.25, 0.5]);
    }

    #[test]
    fn test_failing_device_reports_and_stays_silent() {
        let mut device = MemoryDevice::failing("mem", 1, "no such card");
        assert_eq!(device.error(), None);
        device.start(48000.0, 4);
        assert_eq!(device.error(), Some("no such card"));
        assert!(!device.is_running());

        let mut block = [1.0f32; 4];
        assert_eq!(device.read_block(&mut block), 0);
        assert_eq!(block, [0.0; 4]);
    }
}
