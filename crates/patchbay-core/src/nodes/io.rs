//! External tap endpoints.
//!
//! The graph writes the external input block into an [`AudioInputNode`]'s
//! output before level 0 runs and reads an [`AudioOutputNode`]'s input after
//! the last level. Their own `process` is a no-op.

use crate::error::NodeError;
use crate::node::{NodeCategory, NodeCore, NodeId, ProcessingNode, SignalBehavior};
use crate::port::SignalType;

/// Source node carrying the external input block.
#[derive(Debug)]
pub struct AudioInputNode {
    core: NodeCore,
    signal_type: SignalType,
}

impl AudioInputNode {
    /// Creates an input tap with one output named `"out"`.
    pub fn new(id: impl Into<NodeId>, signal_type: SignalType) -> Self {
        Self {
            core: NodeCore::new(id, "Audio In", NodeCategory::Source).with_output("out", signal_type),
            signal_type,
        }
    }
}

impl ProcessingNode for AudioInputNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, _frames: usize) -> Result<(), NodeError> {
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::Fixed(self.signal_type)
    }
}

/// Sink node whose input becomes the external output block.
#[derive(Debug)]
pub struct AudioOutputNode {
    core: NodeCore,
    signal_type: SignalType,
}

impl AudioOutputNode {
    /// Creates an output tap with one input named `"in"`.
    pub fn new(id: impl Into<NodeId>, signal_type: SignalType) -> Self {
        Self {
            core: NodeCore::new(id, "Audio Out", NodeCategory::Sink).with_input("in", signal_type),
            signal_type,
        }
    }
}

impl ProcessingNode for AudioOutputNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, _frames: usize) -> Result<(), NodeError> {
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::Fixed(self.signal_type)
    }
}
