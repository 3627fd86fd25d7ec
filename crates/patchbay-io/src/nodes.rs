//! Graph nodes backed by a [`BlockDevice`].
//!
//! Each node claims its device from a shared [`DeviceRegistry`] at
//! construction. A node whose device is already claimed stays in the graph
//! but produces (or consumes) silence and reports the conflict through
//! [`ProcessingNode::device_status`].

use std::sync::Arc;

use patchbay_core::{
    NodeCategory, NodeCore, NodeError, NodeId, ProcessingNode, SignalBehavior, SignalType,
};
use tracing::{debug, warn};

use crate::device::{BlockDevice, DeviceLease, DeviceRegistry};

fn signal_type_for(channels: usize) -> SignalType {
    if channels >= 2 {
        SignalType::Stereo
    } else {
        SignalType::Mono
    }
}

/// Shared device bookkeeping for both node kinds.
struct DeviceSlot {
    device: Box<dyn BlockDevice>,
    lease: Option<DeviceLease>,
    status: Option<String>,
    /// Sample rate the device is running at, if started.
    running_at: Option<f32>,
}

impl DeviceSlot {
    fn claim(node: &NodeId, device: Box<dyn BlockDevice>, registry: &Arc<DeviceRegistry>) -> Self {
        match registry.acquire(device.name()) {
            Ok(lease) => Self {
                device,
                lease: Some(lease),
                status: None,
                running_at: None,
            },
            Err(err) => {
                warn!(%node, device = device.name(), %err, "device unavailable");
                Self {
                    device,
                    lease: None,
                    status: Some(err.to_string()),
                    running_at: None,
                }
            }
        }
    }

    fn is_active(&self) -> bool {
        self.lease.is_some()
    }

    /// Opens the device, or reopens it after a sample rate change. A graph
    /// growing its buffers mid-stream keeps the running device.
    fn start(&mut self, sample_rate: f32, max_frames: usize) {
        if !self.is_active() {
            return;
        }
        match self.running_at {
            Some(rate) if rate == sample_rate => {
                debug!(device = self.device.name(), max_frames, "device already running");
                return;
            }
            Some(_) => self.device.stop(),
            None => {}
        }
        self.device.start(sample_rate, max_frames);
        self.running_at = Some(sample_rate);
    }

    fn release(&mut self) {
        if self.lease.take().is_some() {
            self.device.stop();
        }
        self.running_at = None;
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref().or_else(|| self.device.error())
    }
}

/// Source node reading blocks from a capture device.
pub struct DeviceInputNode {
    core: NodeCore,
    slot: DeviceSlot,
}

impl DeviceInputNode {
    /// Wraps `device`, claiming it from `registry`.
    pub fn new(
        id: impl Into<NodeId>,
        device: impl BlockDevice + 'static,
        registry: &Arc<DeviceRegistry>,
    ) -> Self {
        let id = id.into();
        let ty = signal_type_for(device.channels());
        let slot = DeviceSlot::claim(&id, Box::new(device), registry);
        Self {
            core: NodeCore::new(id, "Device Input", NodeCategory::Source).with_output("out", ty),
            slot,
        }
    }

    /// Returns true if this node holds its device.
    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }
}

impl ProcessingNode for DeviceInputNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        let Some(port) = self.core.output_mut(0) else {
            return Ok(());
        };
        let block = port.samples_mut(frames);
        if self.slot.is_active() {
            self.slot.device.read_block(block);
        } else {
            block.fill(0.0);
        }
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::Fixed(signal_type_for(self.slot.device.channels()))
    }

    fn prepare(&mut self, sample_rate: f32, max_frames: usize) {
        if self.core.prepare(sample_rate, max_frames) {
            self.slot.start(sample_rate, max_frames);
        }
    }

    fn release(&mut self) {
        self.slot.release();
        self.core.release();
    }

    fn device_status(&self) -> Option<&str> {
        self.slot.status()
    }
}

/// Sink node writing its input to a playback device.
pub struct DeviceOutputNode {
    core: NodeCore,
    slot: DeviceSlot,
}

impl DeviceOutputNode {
    /// Wraps `device`, claiming it from `registry`.
    pub fn new(
        id: impl Into<NodeId>,
        device: impl BlockDevice + 'static,
        registry: &Arc<DeviceRegistry>,
    ) -> Self {
        let id = id.into();
        let ty = signal_type_for(device.channels());
        let slot = DeviceSlot::claim(&id, Box::new(device), registry);
        Self {
            core: NodeCore::new(id, "Device Output", NodeCategory::Sink).with_input("in", ty),
            slot,
        }
    }

    /// Returns true if this node holds its device.
    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }
}

impl ProcessingNode for DeviceOutputNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        if !self.slot.is_active() {
            return Ok(());
        }
        if let Some(port) = self.core.input(0) {
            self.slot.device.write_block(port.samples(frames));
        }
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::Fixed(signal_type_for(self.slot.device.channels()))
    }

    fn prepare(&mut self, sample_rate: f32, max_frames: usize) {
        if self.core.prepare(sample_rate, max_frames) {
            self.slot.start(sample_rate, max_frames);
        }
    }

    fn release(&mut self) {
        self.slot.release();
        self.core.release();
    }

    fn device_status(&self) -> Option<&str> {
        self.slot.status()
    }
}
