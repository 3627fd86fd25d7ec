//! Directed, gain-scaled links between an output port and an input port.
//!
//! A [`Connection`] moves one block of audio from its source port into its
//! target port before the target node runs, converting between mono and
//! stereo on the way:
//!
//! | source → target | rule |
//! |---|---|
//! | same type | `t[i] = s[i] · g` |
//! | mono → stereo | `t[2i] = t[2i+1] = s[i] · g` |
//! | stereo → mono | `t[i] = (s[2i] + s[2i+1]) · 0.5 · g` |
//!
//! Mono → stereo duplication applies no loudness compensation.

use core::fmt;

use crate::error::GraphError;
use crate::port::{Port, PortId, SignalType};

/// Unique identifier for a connection in the graph.
///
/// Connection IDs are assigned sequentially and never reused within a graph instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u32);

impl ConnectionId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    source: PortId,
    target: PortId,
    source_type: SignalType,
    target_type: SignalType,
    gain: f32,
}

impl Connection {
    /// Creates a unity-gain connection from `source` to `target`.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidConnection`] unless `source` is an output and
    /// `target` is an input.
    pub fn new(id: ConnectionId, source: &Port, target: &Port) -> Result<Self, GraphError> {
        if !source.is_output() || !target.is_input() {
            return Err(GraphError::InvalidConnection {
                source_port: source.id().clone(),
                target_port: target.id().clone(),
                reason: "connections run from an output port to an input port",
            });
        }
        Ok(Self {
            id,
            source: source.id().clone(),
            target: target.id().clone(),
            source_type: source.signal_type(),
            target_type: target.signal_type(),
            gain: 1.0,
        })
    }

    /// Sets the gain applied during transfer.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Connection id.
    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Source (output) port.
    #[inline]
    pub fn source(&self) -> &PortId {
        &self.source
    }

    /// Target (input) port.
    #[inline]
    pub fn target(&self) -> &PortId {
        &self.target
    }

    /// Signal type of the source port.
    #[inline]
    pub fn source_type(&self) -> SignalType {
        self.source_type
    }

    /// Signal type of the target port.
    #[inline]
    pub fn target_type(&self) -> SignalType {
        self.target_type
    }

    /// Linear gain applied during transfer.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Sets the linear gain applied during transfer.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Copies one block from `source` into `target` with conversion and gain.
    ///
    /// `source` and `target` are the interleaved buffers of the source and
    /// target ports.
    #[inline]
    pub fn transfer(&self, source: &[f32], target: &mut [f32], frames: usize) {
        transfer(
            self.source_type,
            self.target_type,
            self.gain,
            source,
            target,
            frames,
        );
    }
}

/// Transfers `frames` frames between interleaved buffers of the given types.
///
/// Frames beyond the shorter buffer are not read; any part of the target's
/// first `frames` frames that could not be filled is zeroed.
pub fn transfer(
    source_type: SignalType,
    target_type: SignalType,
    gain: f32,
    source: &[f32],
    target: &mut [f32],
    frames: usize,
) {
    let src_ch = source_type.channels();
    let dst_ch = target_type.channels();
    let n = frames.min(source.len() / src_ch).min(target.len() / dst_ch);

    match (source_type, target_type) {
        (SignalType::Mono, SignalType::Mono) | (SignalType::Stereo, SignalType::Stereo) => {
            let len = n * src_ch;
            for (dst, src) in target[..len].iter_mut().zip(&source[..len]) {
                *dst = *src * gain;
            }
        }
        (SignalType::Mono, SignalType::Stereo) => {
            for (frame, &src) in target[..n * 2].chunks_exact_mut(2).zip(&source[..n]) {
                let v = src * gain;
                frame[0] = v;
                frame[1] = v;
            }
        }
        (SignalType::Stereo, SignalType::Mono) => {
            for (dst, frame) in target[..n].iter_mut().zip(source[..n * 2].chunks_exact(2)) {
                *dst = (frame[0] + frame[1]) * 0.5 * gain;
            }
        }
    }

    let wanted = (frames * dst_ch).min(target.len());
    if n * dst_ch < wanted {
        target[n * dst_ch..wanted].fill(0.0);
    }
}
