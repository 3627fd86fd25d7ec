//! Effective channel-count inference for presentation.
//!
//! Port types say what a node *accepts*; what actually flows depends on what
//! is upstream. A stereo effect fed only by a mono source carries mono
//! content, a mixer in mono mode emits identical channels, and so on.
//! [`SignalFlowAnalyzer`] walks the graph in topological order and derives the
//! effective layout of every output port from each node's
//! [`SignalBehavior`]. It never touches sample data and is not meant for the
//! processing thread.

use std::collections::HashMap;

use crate::connection::ConnectionId;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::SignalBehavior;
use crate::port::{Port, PortId, SignalType};

/// Inferred content layout. Ordered `Unknown < Mono < Stereo`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectiveSignal {
    /// Nothing upstream determines the layout.
    #[default]
    Unknown,
    /// One channel of content.
    Mono,
    /// Two distinct channels of content.
    Stereo,
}

impl From<SignalType> for EffectiveSignal {
    fn from(ty: SignalType) -> Self {
        match ty {
            SignalType::Mono => Self::Mono,
            SignalType::Stereo => Self::Stereo,
        }
    }
}

/// Cached per-port and per-connection inference results.
#[derive(Debug, Default)]
pub struct SignalFlowAnalyzer {
    ports: HashMap<PortId, EffectiveSignal>,
    connections: HashMap<ConnectionId, EffectiveSignal>,
}

impl SignalFlowAnalyzer {
    /// Creates an empty analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes every result from the current graph.
    ///
    /// # Errors
    ///
    /// Propagates a failed topological sort.
    pub fn analyze(&mut self, graph: &Graph) -> Result<(), GraphError> {
        self.ports.clear();
        self.connections.clear();

        for id in graph.topological_order()? {
            let Some(node) = graph.node(&id) else {
                continue;
            };
            let core = node.core();
            let inputs: Vec<EffectiveSignal> = core
                .inputs()
                .iter()
                .map(|port| self.incoming(graph, port))
                .collect();
            let widest = inputs.iter().copied().max().unwrap_or_default();

            for (j, port) in core.outputs().iter().enumerate() {
                let effective = match node.signal_behavior() {
                    SignalBehavior::Fixed(ty) | SignalBehavior::Configured(ty) => ty.into(),
                    SignalBehavior::MaxOfInputs => widest,
                    SignalBehavior::PassThrough => {
                        inputs.get(j).or(inputs.first()).copied().unwrap_or_default()
                    }
                };
                self.ports.insert(port.id().clone(), effective);
            }
        }

        for conn in graph.connections() {
            let effective = self.ports.get(conn.source()).copied().unwrap_or_default();
            self.connections.insert(conn.id(), effective);
        }
        Ok(())
    }

    fn incoming(&self, graph: &Graph, port: &Port) -> EffectiveSignal {
        port.connection()
            .and_then(|cid| graph.connection(cid))
            .and_then(|conn| self.ports.get(conn.source()))
            .copied()
            .unwrap_or_default()
    }

    /// Effective layout carried by a connection.
    pub fn signal_for_connection(&self, id: ConnectionId) -> EffectiveSignal {
        self.connections.get(&id).copied().unwrap_or_default()
    }

    /// Effective layout produced at an output port.
    pub fn signal_for_port(&self, id: &PortId) -> EffectiveSignal {
        self.ports.get(id).copied().unwrap_or_default()
    }

    /// Drops all cached results.
    pub fn clear(&mut self) {
        self.ports.clear();
        self.connections.clear();
    }
}
