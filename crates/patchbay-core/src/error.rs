//! Error types for graph mutation and node processing.
//!
//! Structural problems (missing nodes, invalid port pairings, cycles) surface as
//! [`GraphError`] at the mutating call and leave the graph untouched. Failures
//! inside a node's `process` are reported as [`NodeError`]; the graph catches
//! them per node and never propagates them out of a block.

use thiserror::Error;

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::PortId;

/// Errors returned by graph mutation and topology operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// A node with this id is already part of the graph.
    #[error("node '{0}' already exists")]
    DuplicateNode(NodeId),

    /// The specified node was not found in the graph.
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// The node exists but has no port with this name or index.
    #[error("port '{port}' not found on node '{node}'")]
    PortNotFound {
        /// Node that was searched.
        node: NodeId,
        /// Port name or index that could not be resolved.
        port: String,
    },

    /// The specified connection was not found in the graph.
    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// The two ports cannot be paired (self, same owner, or same direction).
    #[error("invalid connection {source_port} -> {target_port}: {reason}")]
    InvalidConnection {
        /// Proposed source port.
        source_port: PortId,
        /// Proposed target port.
        target_port: PortId,
        /// Why the pairing was rejected.
        reason: &'static str,
    },

    /// No connection links the two ports.
    #[error("{source_port} is not connected to {target_port}")]
    NotConnected {
        /// Output port that was looked up.
        source_port: PortId,
        /// Input port that was looked up.
        target_port: PortId,
    },

    /// The target input port already carries a connection.
    #[error("input port {0} is already connected")]
    InputAlreadyConnected(PortId),

    /// Adding this connection would close a cycle.
    #[error("connecting '{from}' to '{to}' would create a cycle")]
    CycleDetected {
        /// Node owning the source port.
        from: NodeId,
        /// Node owning the target port.
        to: NodeId,
    },

    /// The topological sort did not visit every node.
    ///
    /// Unreachable while connect-time cycle checks hold; reported instead of
    /// executing a partial order.
    #[error("topological order covers {ordered} of {total} nodes")]
    InconsistentTopology {
        /// Nodes placed in the processing order.
        ordered: usize,
        /// Live nodes in the graph.
        total: usize,
    },
}

/// Failure raised by a node while processing one block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// The node could not produce output for this block.
    #[error("processing failed: {0}")]
    Processing(String),

    /// The node was asked to process before `prepare()` or after `release()`.
    #[error("node is not prepared")]
    NotPrepared,

    /// The node's process call panicked; the payload message is kept.
    #[error("node panicked: {0}")]
    Panicked(String),
}
