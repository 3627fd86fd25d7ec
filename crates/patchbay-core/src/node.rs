//! The processing node contract.
//!
//! Every unit placed in a [`Graph`](crate::Graph) implements
//! [`ProcessingNode`]. The graph owns the nodes, fills their input ports before
//! each block, calls [`process`](ProcessingNode::process), and reads their
//! output ports afterwards. What a node does between those points is opaque to
//! the graph.
//!
//! Shared state (id, name, ports, bypass flag, clip indicator, lifecycle) lives
//! in [`NodeCore`], which implementations embed and expose through
//! [`core`](ProcessingNode::core) / [`core_mut`](ProcessingNode::core_mut).
//!
//! # Lifecycle
//!
//! ```text
//! Unprepared ──prepare──▶ Prepared ──process──▶ Processing
//!                            ▲                      │
//!                            └────────reset─────────┘
//!      any state ──release──▶ Released (terminal)
//! ```

use core::borrow::Borrow;
use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use crate::clip::ClipIndicator;
use crate::connection;
use crate::error::NodeError;
use crate::port::{Port, PortDirection, PortId, SignalType};

/// Unique, caller-chosen identifier of a node.
///
/// Cheap to clone; compares and hashes like the underlying string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Creates a node id from a string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:?})", &*self.0)
    }
}

/// Broad role of a node, used for presentation and signal inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Produces audio without inputs (external input tap, device input).
    Source,
    /// Consumes audio without outputs (external output tap, device output).
    Sink,
    /// Transforms audio.
    Effect,
    /// Combines several inputs.
    Mixer,
    /// Duplicates one input.
    Splitter,
    /// Anything else (meters, gain stages).
    Utility,
}

/// Lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Created; port buffers not yet allocated.
    Unprepared,
    /// Buffers allocated, no block processed since the last prepare/reset.
    Prepared,
    /// At least one block processed.
    Processing,
    /// Resources released. Terminal.
    Released,
}

/// How a node's output channel layout relates to its inputs.
///
/// Queried by the [`SignalFlowAnalyzer`](crate::SignalFlowAnalyzer) instead of
/// inspecting concrete node types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalBehavior {
    /// Always emits this layout (sources and sinks).
    Fixed(SignalType),
    /// Each output carries whatever arrives at the inputs (splitters).
    PassThrough,
    /// Emits the widest layout present on any input (generic effects).
    MaxOfInputs,
    /// Layout chosen by the node's current configuration (mixers).
    Configured(SignalType),
}

/// State shared by every node implementation.
#[derive(Debug)]
pub struct NodeCore {
    id: NodeId,
    name: String,
    category: NodeCategory,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    bypassed: bool,
    clip: ClipIndicator,
    state: NodeState,
    sample_rate: f32,
    max_frames: usize,
}

impl NodeCore {
    /// Creates a core with no ports.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            bypassed: false,
            clip: ClipIndicator::default(),
            state: NodeState::Unprepared,
            sample_rate: 0.0,
            max_frames: 0,
        }
    }

    /// Builder form of [`add_input`](Self::add_input).
    pub fn with_input(mut self, name: impl Into<String>, signal_type: SignalType) -> Self {
        self.add_input(name, signal_type);
        self
    }

    /// Builder form of [`add_output`](Self::add_output).
    pub fn with_output(mut self, name: impl Into<String>, signal_type: SignalType) -> Self {
        self.add_output(name, signal_type);
        self
    }

    /// Appends an input port and returns its id.
    ///
    /// Ports added after `prepare()` are allocated immediately.
    pub fn add_input(&mut self, name: impl Into<String>, signal_type: SignalType) -> PortId {
        let id = PortId::new(self.id.clone(), PortDirection::Input, self.inputs.len());
        let mut port = Port::new(id.clone(), name, signal_type);
        if self.is_prepared() {
            port.allocate_buffer(self.max_frames);
        }
        self.inputs.push(port);
        id
    }

    /// Appends an output port and returns its id.
    ///
    /// Ports added after `prepare()` are allocated immediately.
    pub fn add_output(&mut self, name: impl Into<String>, signal_type: SignalType) -> PortId {
        let id = PortId::new(self.id.clone(), PortDirection::Output, self.outputs.len());
        let mut port = Port::new(id.clone(), name, signal_type);
        if self.is_prepared() {
            port.allocate_buffer(self.max_frames);
        }
        self.outputs.push(port);
        id
    }

    /// Node id.
    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the node. The id is unaffected.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Node category.
    #[inline]
    pub fn category(&self) -> NodeCategory {
        self.category
    }

    /// Input ports in declaration order.
    #[inline]
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports in declaration order.
    #[inline]
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Input port by index.
    #[inline]
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Output port by index.
    #[inline]
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Input port by index, mutably.
    #[inline]
    pub fn input_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.inputs.get_mut(index)
    }

    /// Output port by index, mutably.
    #[inline]
    pub fn output_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.outputs.get_mut(index)
    }

    /// Port by direction and index.
    pub fn port(&self, direction: PortDirection, index: usize) -> Option<&Port> {
        match direction {
            PortDirection::Input => self.inputs.get(index),
            PortDirection::Output => self.outputs.get(index),
        }
    }

    pub(crate) fn port_mut(&mut self, direction: PortDirection, index: usize) -> Option<&mut Port> {
        match direction {
            PortDirection::Input => self.inputs.get_mut(index),
            PortDirection::Output => self.outputs.get_mut(index),
        }
    }

    /// Finds a port by display name.
    pub fn find_port(&self, direction: PortDirection, name: &str) -> Option<&Port> {
        let ports = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        ports.iter().find(|p| p.name() == name)
    }

    /// Borrows the inputs for reading and the outputs for writing at once.
    #[inline]
    pub fn io_mut(&mut self) -> (&[Port], &mut [Port]) {
        (&self.inputs, &mut self.outputs)
    }

    /// Returns true if the node is bypassed.
    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Sets the bypass flag. Honoring it is up to the node's `process`.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    /// Clip indicator.
    #[inline]
    pub fn clip_indicator(&self) -> &ClipIndicator {
        &self.clip
    }

    /// Clip indicator, mutably.
    #[inline]
    pub fn clip_indicator_mut(&mut self) -> &mut ClipIndicator {
        &mut self.clip
    }

    /// Returns true while a recent over is within the hold window.
    pub fn is_clipping(&self) -> bool {
        self.clip.is_clipping()
    }

    /// Scans the first `frames` frames of every output for overs.
    pub fn scan_for_clipping(&mut self, frames: usize) -> bool {
        let mut clipped = false;
        for port in &self.outputs {
            clipped |= self.clip.scan(port.samples(frames));
        }
        clipped
    }

    /// Lifecycle state.
    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Returns true once prepared and not yet released.
    #[inline]
    pub fn is_prepared(&self) -> bool {
        matches!(self.state, NodeState::Prepared | NodeState::Processing)
    }

    /// Sample rate from the last `prepare()`.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Maximum block size from the last `prepare()`.
    #[inline]
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Allocates every port buffer for `max_frames` frames.
    ///
    /// Has no effect on a released node. Returns true if the node is prepared
    /// afterwards.
    pub fn prepare(&mut self, sample_rate: f32, max_frames: usize) -> bool {
        if self.state == NodeState::Released {
            return false;
        }
        self.sample_rate = sample_rate;
        self.max_frames = max_frames;
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.allocate_buffer(max_frames);
        }
        self.state = NodeState::Prepared;
        true
    }

    /// Moves a prepared node into the processing state.
    pub fn mark_processing(&mut self) {
        if self.state == NodeState::Prepared {
            self.state = NodeState::Processing;
        }
    }

    /// Clears buffer contents and the clip latch without releasing anything.
    pub fn reset(&mut self) {
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.clear();
        }
        self.clip.clear();
        if self.state == NodeState::Processing {
            self.state = NodeState::Prepared;
        }
    }

    /// Frees port buffers and enters the terminal released state.
    ///
    /// Returns false if the node was already released.
    pub fn release(&mut self) -> bool {
        if self.state == NodeState::Released {
            return false;
        }
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.free_buffer();
        }
        self.state = NodeState::Released;
        true
    }

    /// Writes silence to the first `frames` frames of every output.
    pub fn silence_outputs(&mut self, frames: usize) {
        for port in &mut self.outputs {
            port.samples_mut(frames).fill(0.0);
        }
    }

    /// Copies input `i` to output `i` unchanged (with layout conversion).
    ///
    /// Outputs without a matching input are silenced. Nodes use this to
    /// implement bypass.
    pub fn pass_through(&mut self, frames: usize) {
        let (inputs, outputs) = (&self.inputs, &mut self.outputs);
        for (i, out) in outputs.iter_mut().enumerate() {
            let out_type = out.signal_type();
            match inputs.get(i) {
                Some(inp) => connection::transfer(
                    inp.signal_type(),
                    out_type,
                    1.0,
                    inp.buffer(),
                    out.buffer_mut(),
                    frames,
                ),
                None => out.samples_mut(frames).fill(0.0),
            }
        }
    }
}

/// Contract implemented by every node placed in a graph.
///
/// Only [`core`](Self::core), [`core_mut`](Self::core_mut) and
/// [`process`](Self::process) are required. Implementations that override
/// [`release`](Self::release) must keep it idempotent, typically by acting only
/// when [`NodeCore::release`] returns true.
///
/// # Example
///
/// ```rust
/// use patchbay_core::{NodeCategory, NodeCore, NodeError, ProcessingNode, SignalType};
///
/// struct Invert {
///     core: NodeCore,
/// }
///
/// impl ProcessingNode for Invert {
///     fn core(&self) -> &NodeCore {
///         &self.core
///     }
///
///     fn core_mut(&mut self) -> &mut NodeCore {
///         &mut self.core
///     }
///
///     fn process(&mut self, frames: usize) -> Result<(), NodeError> {
///         let (inputs, outputs) = self.core.io_mut();
///         let src = inputs[0].samples(frames);
///         for (o, i) in outputs[0].samples_mut(frames).iter_mut().zip(src) {
///             *o = -*i;
///         }
///         Ok(())
///     }
/// }
///
/// let node = Invert {
///     core: NodeCore::new("inv", "Invert", NodeCategory::Effect)
///         .with_input("in", SignalType::Mono)
///         .with_output("out", SignalType::Mono),
/// };
/// assert_eq!(node.core().inputs().len(), 1);
/// ```
pub trait ProcessingNode: Send {
    /// Shared node state.
    fn core(&self) -> &NodeCore;

    /// Shared node state, mutably.
    fn core_mut(&mut self) -> &mut NodeCore;

    /// Processes one block of `frames` frames.
    ///
    /// Inputs are already populated; outputs must be written in place.
    fn process(&mut self, frames: usize) -> Result<(), NodeError>;

    /// Declared relationship between input and output layouts.
    fn signal_behavior(&self) -> SignalBehavior {
        SignalBehavior::MaxOfInputs
    }

    /// Allocates buffers and any node-specific resources.
    fn prepare(&mut self, sample_rate: f32, max_frames: usize) {
        self.core_mut().prepare(sample_rate, max_frames);
    }

    /// Clears transient state without releasing resources.
    fn reset(&mut self) {
        self.core_mut().reset();
    }

    /// Releases resources. Idempotent.
    fn release(&mut self) {
        self.core_mut().release();
    }

    /// Non-fatal device failure text, for device-backed nodes.
    fn device_status(&self) -> Option<&str> {
        None
    }

    /// Node id.
    fn id(&self) -> &NodeId {
        self.core().id()
    }

    /// Display name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Node category.
    fn category(&self) -> NodeCategory {
        self.core().category()
    }

    /// Returns true if the node is bypassed.
    fn is_bypassed(&self) -> bool {
        self.core().is_bypassed()
    }

    /// Returns true while the clip indicator is latched.
    fn is_clipping(&self) -> bool {
        self.core().is_clipping()
    }
}
