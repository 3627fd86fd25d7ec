//! Gain stage.

use crate::error::NodeError;
use crate::math::{db_to_linear, linear_to_db};
use crate::node::{NodeCategory, NodeCore, NodeId, ProcessingNode};
use crate::port::SignalType;

/// Minimum gain in dB.
pub const GAIN_MIN_DB: f32 = -60.0;

/// Maximum gain in dB.
pub const GAIN_MAX_DB: f32 = 24.0;

/// Scales one mono or stereo signal by a fixed gain.
///
/// Bypassed, the input is copied through unchanged.
#[derive(Debug)]
pub struct GainNode {
    core: NodeCore,
    gain: f32,
}

impl GainNode {
    /// Creates a gain stage at `gain_db`, clamped to
    /// [`GAIN_MIN_DB`]..=[`GAIN_MAX_DB`].
    pub fn new(id: impl Into<NodeId>, signal_type: SignalType, gain_db: f32) -> Self {
        let mut node = Self {
            core: NodeCore::new(id, "Gain", NodeCategory::Utility)
                .with_input("in", signal_type)
                .with_output("out", signal_type),
            gain: 1.0,
        };
        node.set_gain_db(gain_db);
        node
    }

    /// Current gain in dB.
    pub fn gain_db(&self) -> f32 {
        linear_to_db(self.gain)
    }

    /// Sets the gain in dB (clamped).
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain = db_to_linear(db.clamp(GAIN_MIN_DB, GAIN_MAX_DB));
    }

    /// Current linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl ProcessingNode for GainNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        if self.core.is_bypassed() {
            self.core.pass_through(frames);
            return Ok(());
        }
        let gain = self.gain;
        let (inputs, outputs) = self.core.io_mut();
        let (Some(input), Some(output)) = (inputs.first(), outputs.first_mut()) else {
            return Err(NodeError::Processing("gain stage has no ports".into()));
        };
        for (o, i) in output.samples_mut(frames).iter_mut().zip(input.samples(frames)) {
            *o = *i * gain;
        }
        Ok(())
    }
}
