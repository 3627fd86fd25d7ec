//! Patchbay Core - runtime of a modular audio processing graph
//!
//! This crate provides the graph that hosts audio effect nodes: typed ports,
//! gain-scaled connections with mono/stereo conversion, cycle-safe mutation,
//! level-partitioned topological ordering, and per-block execution with
//! optional intra-level parallelism.
//!
//! # Core Abstractions
//!
//! ## Data Model
//!
//! - [`Port`] - Typed (mono/stereo), directional endpoint with its block buffer
//! - [`Connection`] - Output→input link performing scaled, type-converting transfer
//! - [`ProcessingNode`] / [`NodeCore`] - Node contract and shared node state
//!
//! ## Execution
//!
//! - [`Graph`] - Owns nodes and connections, orders them, runs blocks
//! - [`Scheduler`] - Dedicated worker pool for same-level nodes
//! - [`FailurePolicy`] - What happens to a node that keeps failing
//!
//! ## Instrumentation
//!
//! - [`ClipIndicator`] - Latched clip flag with a hold window
//! - [`MeterHandle`] - Lock-free input/output RMS levels
//! - [`SpectrumTap`] - Hann-windowed 2048-point magnitude spectrum
//! - [`SignalFlowAnalyzer`] - Effective channel count per connection
//!
//! ## Built-in Nodes
//!
//! - [`AudioInputNode`] / [`AudioOutputNode`] - External taps
//! - [`GainNode`], [`Mixer`], [`Splitter`]
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{GainNode, Graph, GraphConfig, GraphError, PortId, SignalType};
//!
//! let mut graph = Graph::new(GraphConfig::default());
//! graph.add_node(GainNode::new("a", SignalType::Mono, 0.0))?;
//! graph.add_node(GainNode::new("b", SignalType::Mono, -6.0))?;
//! graph.connect(&PortId::output("a", 0), &PortId::input("b", 0))?;
//!
//! // Closing the loop is rejected and leaves the graph unchanged.
//! let err = graph.connect(&PortId::output("b", 0), &PortId::input("a", 0));
//! assert!(matches!(err, Err(GraphError::CycleDetected { .. })));
//! assert_eq!(graph.connection_count(), 1);
//! assert_eq!(graph.level_of("b")?, 1);
//! # Ok::<(), patchbay_core::GraphError>(())
//! ```

pub mod analyzer;
pub mod clip;
pub mod connection;
pub mod error;
pub mod graph;
pub mod math;
pub mod metering;
pub mod node;
pub mod nodes;
pub mod port;
pub mod spectrum;

pub use analyzer::{EffectiveSignal, SignalFlowAnalyzer};
pub use clip::{CLIP_THRESHOLD, ClipIndicator, DEFAULT_CLIP_HOLD};
pub use connection::{Connection, ConnectionId, transfer};
pub use error::{GraphError, NodeError};
pub use graph::{
    AudioTapListener, DEFAULT_METER_FLOOR_DB, DEFAULT_SILENCE_AFTER, ExecutionSummary,
    FailurePolicy, Graph, GraphConfig, Scheduler, SpectrumListener, SpectrumSource,
    default_worker_threads,
};
pub use math::{constant_power_pan, db_to_linear, linear_to_db, rms, rms_db};
pub use metering::MeterHandle;
pub use node::{NodeCategory, NodeCore, NodeId, NodeState, ProcessingNode, SignalBehavior};
pub use nodes::{
    AudioInputNode, AudioOutputNode, GAIN_MAX_DB, GAIN_MIN_DB, GainNode, MAX_MIXER_INPUTS,
    MAX_SPLITTER_OUTPUTS, MIN_MIXER_INPUTS, MIN_SPLITTER_OUTPUTS, Mixer, MixerChannel, MixerMode,
    Splitter,
};
pub use port::{Port, PortDirection, PortId, SignalType};
pub use spectrum::{SPECTRUM_BINS, SPECTRUM_SIZE, SpectrumTap};
