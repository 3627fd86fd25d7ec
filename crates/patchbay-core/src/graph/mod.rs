//! Graph routing engine.
//!
//! A [`Graph`] owns a set of [`ProcessingNode`](crate::ProcessingNode)s joined
//! by typed [`Connection`](crate::Connection)s, keeps them acyclic, and runs
//! them once per audio block.
//!
//! # Execution
//!
//! Each block proceeds level by level through the cached topological order:
//!
//! 1. the external input block is written into the input tap's first output;
//! 2. for every level, each node's inputs are filled from their connections
//!    (unconnected inputs are zeroed), then the level's nodes run, either
//!    sequentially or as one task per node on the worker pool with the
//!    calling thread waiting for the whole level;
//! 3. the output tap's first input is copied to the external output block;
//! 4. meters, tap listeners and the spectrum listener are updated.
//!
//! Nodes within one level never read each other's buffers, so sequential and
//! parallel runs produce bit-identical output.
//!
//! # Failure isolation
//!
//! A node whose `process` returns an error or panics is logged and left with
//! its previous output; see [`FailurePolicy`] for when it is silenced.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{AudioInputNode, AudioOutputNode, GainNode, Graph, GraphConfig, PortId, SignalType};
//!
//! let mut graph = Graph::new(GraphConfig::default());
//! graph.add_node(AudioInputNode::new("in", SignalType::Mono))?;
//! graph.add_node(GainNode::new("gain", SignalType::Mono, 0.0))?;
//! graph.add_node(AudioOutputNode::new("out", SignalType::Mono))?;
//! graph.set_input_tap("in")?;
//! graph.set_output_tap("out")?;
//! graph.connect(&PortId::output("in", 0), &PortId::input("gain", 0))?;
//! graph.connect(&PortId::output("gain", 0), &PortId::input("out", 0))?;
//!
//! let input = [0.5f32; 128];
//! let mut output = [0.0f32; 128];
//! graph.process(&input, &mut output, 128)?;
//! assert!(output.iter().all(|&s| s == 0.5));
//! # Ok::<(), patchbay_core::GraphError>(())
//! ```

mod config;
mod diagnostics;
mod listener;
mod processing;
mod scheduler;

pub use config::{
    DEFAULT_METER_FLOOR_DB, DEFAULT_SILENCE_AFTER, FailurePolicy, GraphConfig, SpectrumSource,
};
pub use diagnostics::ExecutionSummary;
pub use listener::{AudioTapListener, SpectrumListener};
pub use processing::Graph;
pub use scheduler::{Scheduler, default_worker_threads};
