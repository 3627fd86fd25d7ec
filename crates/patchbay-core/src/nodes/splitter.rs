//! One-to-many fan-out.

use crate::error::NodeError;
use crate::node::{NodeCategory, NodeCore, NodeId, ProcessingNode, SignalBehavior};
use crate::port::SignalType;

/// Fewest outputs a splitter can have.
pub const MIN_SPLITTER_OUTPUTS: usize = 2;

/// Most outputs a splitter can have.
pub const MAX_SPLITTER_OUTPUTS: usize = 8;

/// Copies one mono input verbatim to 2–8 mono outputs.
///
/// Each copy is truncated to the shortest of input, output and block length;
/// any remainder of the block is zeroed.
#[derive(Debug)]
pub struct Splitter {
    core: NodeCore,
}

impl Splitter {
    /// Creates a splitter; `outputs` is clamped to
    /// [`MIN_SPLITTER_OUTPUTS`]..=[`MAX_SPLITTER_OUTPUTS`].
    ///
    /// The input is `"in"`; outputs are `"out1"`, `"out2"`, ...
    pub fn new(id: impl Into<NodeId>, outputs: usize) -> Self {
        let outputs = outputs.clamp(MIN_SPLITTER_OUTPUTS, MAX_SPLITTER_OUTPUTS);
        let mut core = NodeCore::new(id, "Splitter", NodeCategory::Splitter)
            .with_input("in", SignalType::Mono);
        for i in 1..=outputs {
            core.add_output(format!("out{i}"), SignalType::Mono);
        }
        Self { core }
    }

    /// Number of outputs.
    pub fn output_count(&self) -> usize {
        self.core.outputs().len()
    }
}

impl ProcessingNode for Splitter {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        let (inputs, outputs) = self.core.io_mut();
        let Some(input) = inputs.first() else {
            return Err(NodeError::Processing("splitter has no input".into()));
        };
        let src = input.buffer();
        for out in outputs.iter_mut() {
            let dst = out.samples_mut(frames);
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
            dst[n..].fill(0.0);
        }
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_clamped() {
        assert_eq!(Splitter::new("s", 0).output_count(), 2);
        assert_eq!(Splitter::new("s", 9).output_count(), 8);
    }

    #[test]
    fn test_ramp_copied_to_every_output() {
        let mut split = Splitter::new("s", 3);
        split.prepare(48000.0, 16);
        let ramp: Vec<f32> = (0..16).map(|i| i as f32 / 16.0).collect();
        split
            .core_mut()
            .input_mut(0)
            .unwrap()
            .buffer_mut()
            .copy_from_slice(&ramp);
        split.process(10).unwrap();
        for out in split.core().outputs() {
            assert_eq!(out.samples(10), &ramp[..10]);
        }
    }
}
