//! Typed, directional audio endpoints.
//!
//! A [`Port`] belongs to exactly one node and carries that node's per-block
//! sample buffer for one input or output. Stereo buffers are interleaved
//! (`[L0, R0, L1, R1, ...]`), so a port's buffer holds `frames × channels`
//! samples.
//!
//! Ports never own their node; the owner is recorded by id inside the
//! [`PortId`]. Input ports additionally remember the id of the single
//! connection feeding them.

use core::fmt;

use crate::connection::ConnectionId;
use crate::error::GraphError;
use crate::node::NodeId;

/// Channel layout of a port or external audio block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalType {
    /// One channel.
    Mono,
    /// Two interleaved channels.
    Stereo,
}

impl SignalType {
    /// Number of interleaved channels.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /// Maps a channel count onto a signal type.
    ///
    /// Returns `None` for anything other than 1 or 2 channels.
    pub const fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            _ => None,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => f.write_str("mono"),
            Self::Stereo => f.write_str("stereo"),
        }
    }
}

/// Whether a port receives or produces audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Receives audio from at most one connection.
    Input,
    /// Produces audio; may fan out to any number of connections.
    Output,
}

/// Stable address of a port: owning node, direction and position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortId {
    node: NodeId,
    direction: PortDirection,
    index: usize,
}

impl PortId {
    /// Creates a port id.
    pub fn new(node: NodeId, direction: PortDirection, index: usize) -> Self {
        Self {
            node,
            direction,
            index,
        }
    }

    /// Address of the `index`-th input port of `node`.
    pub fn input(node: impl Into<NodeId>, index: usize) -> Self {
        Self::new(node.into(), PortDirection::Input, index)
    }

    /// Address of the `index`-th output port of `node`.
    pub fn output(node: impl Into<NodeId>, index: usize) -> Self {
        Self::new(node.into(), PortDirection::Output, index)
    }

    /// Owning node.
    #[inline]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Port direction.
    #[inline]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Position within the owner's input or output list.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            PortDirection::Input => "in",
            PortDirection::Output => "out",
        };
        write!(f, "{}.{dir}[{}]", self.node, self.index)
    }
}

/// A typed audio endpoint with its per-block buffer.
#[derive(Debug)]
pub struct Port {
    id: PortId,
    name: String,
    signal_type: SignalType,
    buffer: Vec<f32>,
    connection: Option<ConnectionId>,
}

impl Port {
    /// Creates an unallocated port. Buffers are sized by [`allocate_buffer`](Self::allocate_buffer).
    pub fn new(id: PortId, name: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            id,
            name: name.into(),
            signal_type,
            buffer: Vec::new(),
            connection: None,
        }
    }

    /// Port address.
    #[inline]
    pub fn id(&self) -> &PortId {
        &self.id
    }

    /// Display name, unique among the owner's ports of the same direction.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel layout.
    #[inline]
    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    /// Interleaved channel count.
    #[inline]
    pub fn channels(&self) -> usize {
        self.signal_type.channels()
    }

    /// Port direction.
    #[inline]
    pub fn direction(&self) -> PortDirection {
        self.id.direction
    }

    /// Id of the owning node.
    #[inline]
    pub fn owner(&self) -> &NodeId {
        &self.id.node
    }

    /// Returns true for input ports.
    #[inline]
    pub fn is_input(&self) -> bool {
        self.id.direction == PortDirection::Input
    }

    /// Returns true for output ports.
    #[inline]
    pub fn is_output(&self) -> bool {
        self.id.direction == PortDirection::Output
    }

    /// Connection feeding this port (input ports only).
    #[inline]
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// Returns true if an input port is fed by a connection.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn set_connection(&mut self, connection: Option<ConnectionId>) {
        debug_assert!(self.is_input() || connection.is_none());
        self.connection = connection;
    }

    /// Returns true if a connection between `self` and `other` is allowed.
    ///
    /// See [`check_connect_to`](Self::check_connect_to) for the rules.
    pub fn can_connect_to(&self, other: &Port) -> bool {
        self.check_connect_to(other).is_ok()
    }

    /// Validates a pairing between this port and `other`, in either order.
    ///
    /// Rejects self-connection, ports on the same node, two ports of the same
    /// direction, and an input that is already connected. Signal types never
    /// cause a rejection; conversion happens during transfer.
    pub fn check_connect_to(&self, other: &Port) -> Result<(), GraphError> {
        let invalid = |reason| GraphError::InvalidConnection {
            source_port: self.id.clone(),
            target_port: other.id.clone(),
            reason,
        };

        if self.id == other.id {
            return Err(invalid("a port cannot connect to itself"));
        }
        if self.owner() == other.owner() {
            return Err(invalid("ports belong to the same node"));
        }
        if self.direction() == other.direction() {
            return Err(invalid("ports have the same direction"));
        }

        let input = if self.is_input() { self } else { other };
        if input.is_connected() {
            return Err(GraphError::InputAlreadyConnected(input.id.clone()));
        }
        Ok(())
    }

    /// Sizes the buffer for `frames` frames.
    ///
    /// The buffer is only reallocated when the required length changes.
    /// Returns true if the length changed.
    pub fn allocate_buffer(&mut self, frames: usize) -> bool {
        let len = frames * self.channels();
        if self.buffer.len() == len {
            return false;
        }
        self.buffer.resize(len, 0.0);
        true
    }

    /// Number of frames the buffer currently holds.
    #[inline]
    pub fn frames(&self) -> usize {
        self.buffer.len() / self.channels()
    }

    /// The whole interleaved buffer.
    #[inline]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// The whole interleaved buffer, mutably.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    /// The first `frames` frames of the buffer (clamped to its length).
    #[inline]
    pub fn samples(&self, frames: usize) -> &[f32] {
        let len = (frames * self.channels()).min(self.buffer.len());
        &self.buffer[..len]
    }

    /// The first `frames` frames of the buffer, mutably (clamped to its length).
    #[inline]
    pub fn samples_mut(&mut self, frames: usize) -> &mut [f32] {
        let len = (frames * self.channels()).min(self.buffer.len());
        &mut self.buffer[..len]
    }

    /// Fills the buffer with silence.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    pub(crate) fn free_buffer(&mut self) {
        self.buffer = Vec::new();
    }
}
