//! Graph ownership, mutation, ordering and per-block execution.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::connection::{self, Connection, ConnectionId};
use crate::error::{GraphError, NodeError};
use crate::math::rms_db;
use crate::metering::MeterHandle;
use crate::node::{NodeId, ProcessingNode};
use crate::port::{Port, PortDirection, PortId, SignalType};
use crate::spectrum::SpectrumTap;

use super::config::{FailurePolicy, GraphConfig, SpectrumSource};
use super::diagnostics::ExecutionSummary;
use super::listener::{AudioTapListener, SpectrumListener};
use super::scheduler::Scheduler;

/// Level marker for empty slots.
const NO_LEVEL: usize = usize::MAX;

struct NodeEntry {
    node: Box<dyn ProcessingNode>,
    incoming: Vec<ConnectionId>,
    outgoing: Vec<ConnectionId>,
    failures: u32,
}

struct ConnectionEntry {
    connection: Connection,
    source_slot: usize,
    target_slot: usize,
}

/// A mutable, acyclic graph of processing nodes.
///
/// Nodes live in insertion-ordered slots; removed nodes leave a tombstone so
/// slot indices stay stable. Connection ids are sequential and never reused.
///
/// Any structural mutation marks the processing order dirty; the order and
/// its level partition are recomputed on the next [`process`](Self::process)
/// (or explicit [`rebuild_processing_order`](Self::rebuild_processing_order)).
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add nodes with [`add_node()`](Self::add_node)
/// 3. Designate taps with [`set_input_tap()`](Self::set_input_tap) /
///    [`set_output_tap()`](Self::set_output_tap)
/// 4. Connect ports with [`connect()`](Self::connect) or
///    [`connect_by_name()`](Self::connect_by_name)
/// 5. Process blocks with [`process()`](Self::process)
pub struct Graph {
    config: GraphConfig,
    nodes: Vec<Option<NodeEntry>>,
    index: HashMap<NodeId, usize>,
    connections: Vec<Option<ConnectionEntry>>,
    connection_count: usize,
    dirty: bool,
    order: Vec<usize>,
    levels: Vec<Vec<usize>>,
    level_of: Vec<usize>,
    input_tap: Option<usize>,
    output_tap: Option<usize>,
    scheduler: Scheduler,
    prepared: bool,
    shut_down: bool,
    meters: MeterHandle,
    input_listener: Option<Box<dyn AudioTapListener>>,
    output_listener: Option<Box<dyn AudioTapListener>>,
    spectrum_listener: Option<Box<dyn SpectrumListener>>,
    spectrum: Option<SpectrumTap>,
}

impl Graph {
    /// Creates an empty graph.
    ///
    /// The worker pool is started up front when `config.parallel` is set,
    /// otherwise on the first [`set_parallel(true)`](Self::set_parallel).
    pub fn new(config: GraphConfig) -> Self {
        let scheduler = if config.parallel {
            Scheduler::start(config.worker_threads)
        } else {
            Scheduler::disabled()
        };
        let meters = MeterHandle::new(config.meter_floor_db);
        Self {
            config,
            nodes: Vec::new(),
            index: HashMap::new(),
            connections: Vec::new(),
            connection_count: 0,
            dirty: false,
            order: Vec::new(),
            levels: Vec::new(),
            level_of: Vec::new(),
            input_tap: None,
            output_tap: None,
            scheduler,
            prepared: false,
            shut_down: false,
            meters,
            input_listener: None,
            output_listener: None,
            spectrum_listener: None,
            spectrum: None,
        }
    }

    // --- Node mutations ---

    /// Adds a node and returns its id.
    ///
    /// A node joining an already prepared graph is prepared immediately.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] if the id is taken.
    pub fn add_node(&mut self, node: impl ProcessingNode + 'static) -> Result<NodeId, GraphError> {
        self.add_boxed(Box::new(node))
    }

    /// Boxed form of [`add_node`](Self::add_node).
    pub fn add_boxed(&mut self, mut node: Box<dyn ProcessingNode>) -> Result<NodeId, GraphError> {
        let id = node.id().clone();
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        node.core_mut()
            .clip_indicator_mut()
            .set_hold(self.config.clip_hold);
        if self.prepared {
            node.prepare(self.config.sample_rate, self.config.max_frames);
        }

        let slot = self.nodes.len();
        self.nodes.push(Some(NodeEntry {
            node,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            failures: 0,
        }));
        self.level_of.push(NO_LEVEL);
        self.index.insert(id.clone(), slot);
        self.dirty = true;
        debug!(node = %id, slot, "node added");
        Ok(id)
    }

    /// Removes a node, every connection touching it, and releases it.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no such node exists.
    pub fn remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        let slot = self.slot_of(id)?;
        let touching: Vec<ConnectionId> = self.nodes[slot]
            .as_ref()
            .map(|e| e.incoming.iter().chain(&e.outgoing).copied().collect())
            .unwrap_or_default();
        for cid in touching {
            self.disconnect_internal(cid);
        }

        if let Some(mut entry) = self.nodes[slot].take() {
            entry.node.release();
        }
        self.index.remove(id);
        self.level_of[slot] = NO_LEVEL;
        if self.input_tap == Some(slot) {
            self.input_tap = None;
        }
        if self.output_tap == Some(slot) {
            self.output_tap = None;
        }
        self.dirty = true;
        debug!(node = id, "node removed");
        Ok(())
    }

    // --- Connection mutations ---

    /// Connects an output port to an input port at unity gain.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] / [`GraphError::PortNotFound`] for
    ///   unknown endpoints
    /// - [`GraphError::InvalidConnection`] for self, same-node or
    ///   same-direction pairings, or an input→output pairing
    /// - [`GraphError::InputAlreadyConnected`] if the target is taken
    /// - [`GraphError::CycleDetected`] if the target node already reaches the
    ///   source node
    pub fn connect(&mut self, source: &PortId, target: &PortId) -> Result<ConnectionId, GraphError> {
        self.connect_with_gain(source, target, 1.0)
    }

    /// Connects two ports with the given linear gain.
    ///
    /// See [`connect`](Self::connect) for the error cases.
    pub fn connect_with_gain(
        &mut self,
        source: &PortId,
        target: &PortId,
        gain: f32,
    ) -> Result<ConnectionId, GraphError> {
        let source_slot = self.slot_of(source.node())?;
        let target_slot = self.slot_of(target.node())?;
        let source_port = self.port_at(source_slot, source)?;
        let target_port = self.port_at(target_slot, target)?;
        source_port.check_connect_to(target_port)?;

        let id = ConnectionId(self.connections.len() as u32);
        let connection = Connection::new(id, source_port, target_port)?.with_gain(gain);

        // The new edge closes a cycle iff the target already reaches the source.
        if self.can_reach(target_slot, source_slot) {
            return Err(GraphError::CycleDetected {
                from: source.node().clone(),
                to: target.node().clone(),
            });
        }

        self.connections.push(Some(ConnectionEntry {
            connection,
            source_slot,
            target_slot,
        }));
        if let Some(entry) = self.nodes[source_slot].as_mut() {
            entry.outgoing.push(id);
        }
        if let Some(entry) = self.nodes[target_slot].as_mut() {
            entry.incoming.push(id);
            if let Some(port) = entry
                .node
                .core_mut()
                .port_mut(PortDirection::Input, target.index())
            {
                port.set_connection(Some(id));
            }
        }
        self.connection_count += 1;
        self.dirty = true;
        debug!(%source, %target, gain, connection = %id, "connected");
        Ok(id)
    }

    /// Connects ports addressed by node id and port display name.
    pub fn connect_by_name(
        &mut self,
        source_node: &str,
        source_port: &str,
        target_node: &str,
        target_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        let source = self.port_id(source_node, PortDirection::Output, source_port)?;
        let target = self.port_id(target_node, PortDirection::Input, target_port)?;
        self.connect(&source, &target)
    }

    /// Removes a connection.
    ///
    /// # Errors
    ///
    /// [`GraphError::ConnectionNotFound`] if it does not exist.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        if self.connection_entry(id).is_none() {
            return Err(GraphError::ConnectionNotFound(id));
        }
        self.disconnect_internal(id);
        debug!(connection = %id, "disconnected");
        Ok(())
    }

    /// Removes the connection between two ports.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotConnected`] if the ports are not linked.
    pub fn disconnect_ports(&mut self, source: &PortId, target: &PortId) -> Result<(), GraphError> {
        let id = self
            .find_connection(source, target)
            .ok_or_else(|| GraphError::NotConnected {
                source_port: source.clone(),
                target_port: target.clone(),
            })?;
        self.disconnect(id)
    }

    /// Removes the connection between ports addressed by node id and port name.
    pub fn disconnect_by_name(
        &mut self,
        source_node: &str,
        source_port: &str,
        target_node: &str,
        target_port: &str,
    ) -> Result<(), GraphError> {
        let source = self.port_id(source_node, PortDirection::Output, source_port)?;
        let target = self.port_id(target_node, PortDirection::Input, target_port)?;
        self.disconnect_ports(&source, &target)
    }

    /// Changes a connection's gain. Does not affect the processing order.
    pub fn set_connection_gain(&mut self, id: ConnectionId, gain: f32) -> Result<(), GraphError> {
        let entry = self
            .connections
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::ConnectionNotFound(id))?;
        entry.connection.set_gain(gain);
        Ok(())
    }

    /// Sets a node's bypass flag.
    pub fn set_bypass(&mut self, id: &str, bypassed: bool) -> Result<(), GraphError> {
        let slot = self.slot_of(id)?;
        if let Some(entry) = self.nodes[slot].as_mut() {
            entry.node.core_mut().set_bypassed(bypassed);
        }
        Ok(())
    }

    /// Returns true if the node exists and is bypassed.
    pub fn is_bypassed(&self, id: &str) -> bool {
        self.node(id).is_some_and(|n| n.is_bypassed())
    }

    // --- Taps and listeners ---

    /// Designates the node whose first output receives the external input block.
    pub fn set_input_tap(&mut self, id: &str) -> Result<(), GraphError> {
        let slot = self.slot_of(id)?;
        self.require_port(slot, id, PortDirection::Output)?;
        self.input_tap = Some(slot);
        Ok(())
    }

    /// Designates the node whose first input is copied to the external output block.
    pub fn set_output_tap(&mut self, id: &str) -> Result<(), GraphError> {
        let slot = self.slot_of(id)?;
        self.require_port(slot, id, PortDirection::Input)?;
        self.output_tap = Some(slot);
        Ok(())
    }

    /// Current input tap.
    pub fn input_tap(&self) -> Option<&NodeId> {
        self.input_tap.and_then(|s| self.entry(s)).map(|e| e.node.id())
    }

    /// Current output tap.
    pub fn output_tap(&self) -> Option<&NodeId> {
        self.output_tap.and_then(|s| self.entry(s)).map(|e| e.node.id())
    }

    /// Registers the observer of the raw input-tap block.
    pub fn set_input_listener(&mut self, listener: impl AudioTapListener + 'static) {
        self.input_listener = Some(Box::new(listener));
    }

    /// Registers the observer of the raw output-tap block.
    pub fn set_output_listener(&mut self, listener: impl AudioTapListener + 'static) {
        self.output_listener = Some(Box::new(listener));
    }

    /// Registers the spectrum observer and allocates the analysis buffers.
    pub fn set_spectrum_listener(&mut self, listener: impl SpectrumListener + 'static) {
        self.spectrum_listener = Some(Box::new(listener));
        self.spectrum.get_or_insert_with(SpectrumTap::new).clear();
    }

    /// Removes every listener.
    pub fn clear_listeners(&mut self) {
        self.input_listener = None;
        self.output_listener = None;
        self.spectrum_listener = None;
        self.spectrum = None;
    }

    // --- Topology ---

    /// Returns true if a mutation happened since the last order rebuild.
    #[inline]
    pub fn is_order_dirty(&self) -> bool {
        self.dirty
    }

    /// Recomputes the processing order and level partition.
    ///
    /// Level 0 holds every node without incoming connections; level `k + 1`
    /// holds the nodes whose last dependency sits in level `k`. Within a level
    /// nodes keep insertion order.
    ///
    /// # Errors
    ///
    /// [`GraphError::InconsistentTopology`] if the sort did not place every
    /// node. The previous order is kept and the graph stays dirty.
    pub fn rebuild_processing_order(&mut self) -> Result<(), GraphError> {
        let (order, levels) = self.compute_levels().inspect_err(|err| {
            error!(%err, "processing order could not be rebuilt");
        })?;

        self.level_of.fill(NO_LEVEL);
        for (level, slots) in levels.iter().enumerate() {
            for &slot in slots {
                self.level_of[slot] = level;
            }
        }
        self.order = order;
        self.levels = levels;
        self.dirty = false;
        debug!(
            nodes = self.order.len(),
            levels = self.levels.len(),
            "processing order rebuilt"
        );
        Ok(())
    }

    /// Node ids in processing order, rebuilding the order if stale.
    pub fn processing_order(&mut self) -> Result<Vec<NodeId>, GraphError> {
        self.ensure_order()?;
        Ok(self.ids(&self.order))
    }

    /// Node ids grouped by dependency level, rebuilding the order if stale.
    pub fn levels(&mut self) -> Result<Vec<Vec<NodeId>>, GraphError> {
        self.ensure_order()?;
        Ok(self.levels.iter().map(|slots| self.ids(slots)).collect())
    }

    /// Dependency level of one node, rebuilding the order if stale.
    pub fn level_of(&mut self, id: &str) -> Result<usize, GraphError> {
        let slot = self.slot_of(id)?;
        self.ensure_order()?;
        Ok(self.level_of[slot])
    }

    /// Topological order computed without touching the cache.
    ///
    /// Used by read-only passes such as the
    /// [`SignalFlowAnalyzer`](crate::SignalFlowAnalyzer).
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        if !self.dirty {
            return Ok(self.ids(&self.order));
        }
        let (order, _) = self.compute_levels()?;
        Ok(self.ids(&order))
    }

    // --- Lifecycle ---

    /// Prepares every node for `sample_rate` and blocks of up to `max_frames`.
    pub fn prepare(&mut self, sample_rate: f32, max_frames: usize) {
        if self.shut_down {
            warn!("prepare called on a shut down graph");
            return;
        }
        self.config.sample_rate = sample_rate;
        self.config.max_frames = max_frames;
        for entry in self.nodes.iter_mut().flatten() {
            entry.node.prepare(sample_rate, max_frames);
        }
        self.prepared = true;
        debug!(sample_rate, max_frames, "graph prepared");
    }

    /// Returns true once [`prepare`](Self::prepare) has run.
    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Clears every node's transient state, failure counts and the spectrum frame.
    pub fn reset(&mut self) {
        for entry in self.nodes.iter_mut().flatten() {
            entry.node.reset();
            entry.failures = 0;
        }
        if let Some(tap) = &mut self.spectrum {
            tap.clear();
        }
        let floor = self.config.meter_floor_db;
        self.meters.store(floor, floor);
    }

    /// Releases every node and stops the worker pool. Idempotent.
    ///
    /// Blocks processed afterwards produce silence.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        for entry in self.nodes.iter_mut().flatten() {
            entry.node.release();
        }
        self.scheduler.shutdown();
        self.prepared = false;
        self.shut_down = true;
        debug!("graph shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Enables or disables intra-level parallel dispatch.
    ///
    /// Enabling starts the worker pool if it is not running.
    pub fn set_parallel(&mut self, enabled: bool) {
        self.config.parallel = enabled;
        if enabled && !self.scheduler.is_running() && !self.shut_down {
            self.scheduler = Scheduler::start(self.config.worker_threads);
        }
        debug!(enabled, "parallel dispatch toggled");
    }

    /// Returns true if parallel dispatch is enabled.
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.config.parallel
    }

    /// Running worker threads (0 when the pool is stopped).
    pub fn worker_threads(&self) -> usize {
        self.scheduler.threads()
    }

    // --- Execution ---

    /// Processes one block.
    ///
    /// `input` and `output` are interleaved external blocks laid out like the
    /// tap ports: the input tap's output port and the output tap's input port
    /// set the channel counts (mono without a tap). Only the first `frames`
    /// frames of each buffer are used, whatever their length. Node failures
    /// are isolated per node and never abort the block.
    ///
    /// # Errors
    ///
    /// [`GraphError::InconsistentTopology`] if the order cannot be rebuilt;
    /// the output block is silenced.
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
    ) -> Result<(), GraphError> {
        let in_type = self.input_layout();
        let out_type = self.output_layout();
        self.process_with_layout(input, in_type, output, out_type, frames)
    }

    /// Processes one block whose external layouts are given explicitly.
    ///
    /// Used by hosts that know their device or file channel counts; the
    /// blocks are converted to and from the tap port layouts.
    ///
    /// # Errors
    ///
    /// Same as [`Graph::process`].
    pub fn process_with_layout(
        &mut self,
        input: &[f32],
        in_type: SignalType,
        output: &mut [f32],
        out_type: SignalType,
        frames: usize,
    ) -> Result<(), GraphError> {
        if frames == 0 {
            return Ok(());
        }
        if self.shut_down {
            output.fill(0.0);
            return Ok(());
        }
        if let Err(err) = self.ensure_order() {
            output.fill(0.0);
            return Err(err);
        }
        if !self.prepared || frames > self.config.max_frames {
            let max_frames = frames.max(self.config.max_frames);
            self.prepare(self.config.sample_rate, max_frames);
        }

        self.feed_input_tap(input, in_type, frames);
        for level in 0..self.levels.len() {
            self.pull_inputs(level, frames);
            self.run_level(level, frames);
        }
        self.drain_output_tap(output, out_type, frames);
        self.instrument(input, in_type, output, out_type, frames);
        Ok(())
    }

    /// Layout of the external input block: the input tap's output port type.
    pub fn input_layout(&self) -> SignalType {
        self.input_tap
            .and_then(|s| self.entry(s))
            .and_then(|e| e.node.core().output(0))
            .map_or(SignalType::Mono, Port::signal_type)
    }

    /// Layout of the external output block: the output tap's input port type.
    pub fn output_layout(&self) -> SignalType {
        self.output_tap
            .and_then(|s| self.entry(s))
            .and_then(|e| e.node.core().input(0))
            .map_or(SignalType::Mono, Port::signal_type)
    }

    fn feed_input_tap(&mut self, input: &[f32], in_type: SignalType, frames: usize) {
        let Some(slot) = self.input_tap else {
            return;
        };
        if let Some(port) = self.nodes[slot]
            .as_mut()
            .and_then(|e| e.node.core_mut().output_mut(0))
        {
            let port_type = port.signal_type();
            connection::transfer(in_type, port_type, 1.0, input, port.buffer_mut(), frames);
        }
    }

    fn pull_inputs(&mut self, level: usize, frames: usize) {
        let Self {
            nodes,
            connections,
            levels,
            ..
        } = self;

        for &slot in &levels[level] {
            let input_count = nodes[slot]
                .as_ref()
                .map_or(0, |e| e.node.core().inputs().len());

            for i in 0..input_count {
                let feed = nodes[slot]
                    .as_ref()
                    .and_then(|e| e.node.core().input(i))
                    .and_then(Port::connection)
                    .and_then(|cid| connections.get(cid.0 as usize))
                    .and_then(Option::as_ref);

                match feed {
                    Some(feed) => {
                        let Some((src, dst)) = split_pair(nodes, feed.source_slot, slot) else {
                            continue;
                        };
                        let (Some(src), Some(dst)) = (src.as_ref(), dst.as_mut()) else {
                            continue;
                        };
                        let source_port = src.node.core().output(feed.connection.source().index());
                        let target_port = dst.node.core_mut().input_mut(i);
                        if let (Some(s), Some(t)) = (source_port, target_port) {
                            feed.connection.transfer(s.buffer(), t.buffer_mut(), frames);
                        }
                    }
                    None => {
                        if let Some(port) = nodes[slot]
                            .as_mut()
                            .and_then(|e| e.node.core_mut().input_mut(i))
                        {
                            port.samples_mut(frames).fill(0.0);
                        }
                    }
                }
            }
        }
    }

    fn run_level(&mut self, level: usize, frames: usize) {
        let policy = self.config.failure_policy;
        let parallel = self.config.parallel
            && self.levels[level].len() >= 2
            && self.scheduler.is_running();

        if parallel {
            let Self {
                nodes,
                level_of,
                scheduler,
                ..
            } = self;
            let level_of: &[usize] = level_of;
            scheduler.install(|| {
                nodes
                    .par_iter_mut()
                    .enumerate()
                    .filter(|(slot, _)| level_of[*slot] == level)
                    .for_each(|(_, entry)| {
                        if let Some(entry) = entry {
                            run_node(entry, frames, policy);
                        }
                    });
            });
        } else {
            for &slot in &self.levels[level] {
                if let Some(entry) = self.nodes[slot].as_mut() {
                    run_node(entry, frames, policy);
                }
            }
        }
    }

    fn drain_output_tap(&self, output: &mut [f32], out_type: SignalType, frames: usize) {
        let port = self
            .output_tap
            .and_then(|s| self.entry(s))
            .and_then(|e| e.node.core().input(0));
        match port {
            Some(port) => {
                connection::transfer(port.signal_type(), out_type, 1.0, port.buffer(), output, frames);
            }
            None => {
                let len = (frames * out_type.channels()).min(output.len());
                output[..len].fill(0.0);
            }
        }
    }

    fn instrument(
        &mut self,
        input: &[f32],
        in_type: SignalType,
        output: &[f32],
        out_type: SignalType,
        frames: usize,
    ) {
        let input = &input[..(frames * in_type.channels()).min(input.len())];
        let output = &output[..(frames * out_type.channels()).min(output.len())];

        let floor = self.config.meter_floor_db;
        self.meters
            .store(rms_db(input, floor), rms_db(output, floor));

        if let Some(listener) = &mut self.input_listener {
            listener.on_audio(input, in_type);
        }
        if let Some(listener) = &mut self.output_listener {
            listener.on_audio(output, out_type);
        }
        if let (Some(tap), Some(listener)) = (&mut self.spectrum, &mut self.spectrum_listener) {
            let (samples, signal_type) = match self.config.spectrum_source {
                SpectrumSource::Input => (input, in_type),
                SpectrumSource::Output => (output, out_type),
            };
            tap.push(samples, signal_type, |magnitudes| {
                listener.on_spectrum(magnitudes);
            });
        }
    }

    // --- Queries ---

    /// Looks up a node.
    pub fn node(&self, id: &str) -> Option<&(dyn ProcessingNode + 'static)> {
        let slot = *self.index.get(id)?;
        self.entry(slot).map(|e| &*e.node)
    }

    /// Looks up a node mutably.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut (dyn ProcessingNode + 'static)> {
        let slot = *self.index.get(id)?;
        self.nodes[slot].as_mut().map(|e| &mut *e.node)
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &(dyn ProcessingNode + 'static)> {
        self.nodes.iter().flatten().map(|e| &*e.node)
    }

    /// Ids of the live nodes in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|n| n.id().clone()).collect()
    }

    /// Returns true if a node with this id exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    /// Looks up a connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connection_entry(id).map(|c| &c.connection)
    }

    /// Live connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten().map(|c| &c.connection)
    }

    /// Finds the connection between two ports.
    pub fn find_connection(&self, source: &PortId, target: &PortId) -> Option<ConnectionId> {
        let slot = *self.index.get(target.node().as_str())?;
        let port = self.entry(slot)?.node.core().input(target.index())?;
        let id = port.connection()?;
        (self.connection(id)?.source() == source).then_some(id)
    }

    /// Resolves a port by node id, direction and display name.
    pub fn port_id(
        &self,
        node: &str,
        direction: PortDirection,
        name: &str,
    ) -> Result<PortId, GraphError> {
        let slot = self.slot_of(node)?;
        self.entry(slot)
            .and_then(|e| e.node.core().find_port(direction, name))
            .map(|p| p.id().clone())
            .ok_or_else(|| GraphError::PortNotFound {
                node: NodeId::from(node),
                port: name.to_owned(),
            })
    }

    /// Consecutive failed blocks of a node.
    pub fn failure_count(&self, id: &str) -> Option<u32> {
        let slot = *self.index.get(id)?;
        self.entry(slot).map(|e| e.failures)
    }

    /// Non-fatal device failures reported by device-backed nodes.
    pub fn device_errors(&self) -> Vec<(NodeId, String)> {
        self.nodes()
            .filter_map(|n| n.device_status().map(|s| (n.id().clone(), s.to_owned())))
            .collect()
    }

    /// Shared handle to the input/output level meters.
    pub fn meters(&self) -> MeterHandle {
        self.meters.clone()
    }

    /// Input-tap level of the last block in dB.
    pub fn input_level_db(&self) -> f32 {
        self.meters.input_db()
    }

    /// Output-tap level of the last block in dB.
    pub fn output_level_db(&self) -> f32 {
        self.meters.output_db()
    }

    /// Current configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Summary of levels, parallelism and worker threads.
    ///
    /// Uses the cached order when clean, otherwise computes one without
    /// caching it.
    pub fn diagnostics(&self) -> ExecutionSummary {
        let mut summary = ExecutionSummary {
            node_count: self.node_count(),
            connection_count: self.connection_count,
            level_sizes: Vec::new(),
            parallel: self.config.parallel,
            worker_threads: self.scheduler.threads(),
            topology_error: None,
        };
        if self.dirty {
            match self.compute_levels() {
                Ok((_, levels)) => summary.level_sizes = levels.iter().map(Vec::len).collect(),
                Err(err) => summary.topology_error = Some(err.to_string()),
            }
        } else {
            summary.level_sizes = self.levels.iter().map(Vec::len).collect();
        }
        summary
    }

    // --- Internals ---

    fn ensure_order(&mut self) -> Result<(), GraphError> {
        if self.dirty {
            self.rebuild_processing_order()?;
        }
        Ok(())
    }

    fn entry(&self, slot: usize) -> Option<&NodeEntry> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn connection_entry(&self, id: ConnectionId) -> Option<&ConnectionEntry> {
        self.connections.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn slot_of(&self, id: &str) -> Result<usize, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(NodeId::from(id)))
    }

    fn ids(&self, slots: &[usize]) -> Vec<NodeId> {
        slots
            .iter()
            .filter_map(|&s| self.entry(s))
            .map(|e| e.node.id().clone())
            .collect()
    }

    fn port_at(&self, slot: usize, id: &PortId) -> Result<&Port, GraphError> {
        self.entry(slot)
            .and_then(|e| e.node.core().port(id.direction(), id.index()))
            .ok_or_else(|| GraphError::PortNotFound {
                node: id.node().clone(),
                port: id.to_string(),
            })
    }

    fn require_port(
        &self,
        slot: usize,
        node: &str,
        direction: PortDirection,
    ) -> Result<(), GraphError> {
        let id = PortId::new(NodeId::from(node), direction, 0);
        self.port_at(slot, &id).map(|_| ())
    }

    /// DFS reachability over existing connections.
    fn can_reach(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited[current] {
                continue;
            }
            visited[current] = true;

            if let Some(entry) = self.entry(current) {
                for &cid in &entry.outgoing {
                    if let Some(conn) = self.connection_entry(cid) {
                        stack.push(conn.target_slot);
                    }
                }
            }
        }
        false
    }

    /// Kahn's algorithm, one frontier per level.
    fn compute_levels(&self) -> Result<(Vec<usize>, Vec<Vec<usize>>), GraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut total = 0;
        for (slot, entry) in self.nodes.iter().enumerate() {
            if let Some(entry) = entry {
                total += 1;
                in_degree[slot] = entry.incoming.len();
            }
        }

        let mut frontier: Vec<usize> = (0..n)
            .filter(|&s| self.nodes[s].is_some() && in_degree[s] == 0)
            .collect();
        let mut order = Vec::with_capacity(total);
        let mut levels = Vec::new();

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &slot in &frontier {
                let Some(entry) = self.entry(slot) else {
                    continue;
                };
                for &cid in &entry.outgoing {
                    if let Some(conn) = self.connection_entry(cid) {
                        let t = conn.target_slot;
                        if in_degree[t] > 0 {
                            in_degree[t] -= 1;
                            if in_degree[t] == 0 {
                                next.push(t);
                            }
                        }
                    }
                }
            }
            next.sort_unstable();
            order.extend_from_slice(&frontier);
            levels.push(std::mem::replace(&mut frontier, next));
        }

        if order.len() != total {
            return Err(GraphError::InconsistentTopology {
                ordered: order.len(),
                total,
            });
        }
        Ok((order, levels))
    }

    /// Removes a connection without error checking.
    fn disconnect_internal(&mut self, id: ConnectionId) {
        let Some(entry) = self
            .connections
            .get_mut(id.0 as usize)
            .and_then(Option::take)
        else {
            return;
        };
        if let Some(source) = self.nodes[entry.source_slot].as_mut() {
            source.outgoing.retain(|c| *c != id);
        }
        if let Some(target) = self.nodes[entry.target_slot].as_mut() {
            target.incoming.retain(|c| *c != id);
            if let Some(port) = target
                .node
                .core_mut()
                .port_mut(PortDirection::Input, entry.connection.target().index())
            {
                port.set_connection(None);
            }
        }
        self.connection_count -= 1;
        self.dirty = true;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.node_count())
            .field("connections", &self.connection_count)
            .field("dirty", &self.dirty)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Runs one node for one block with panic and failure isolation.
fn run_node(entry: &mut NodeEntry, frames: usize, policy: FailurePolicy) {
    let node = &mut entry.node;
    if !node.core().is_prepared() {
        return;
    }
    node.core_mut().mark_processing();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| node.process(frames)))
        .unwrap_or_else(|payload| Err(NodeError::Panicked(panic_message(&*payload))));

    match outcome {
        Ok(()) => {
            if entry.failures > 0 {
                debug!(node = %node.id(), after = entry.failures, "node recovered");
            }
            entry.failures = 0;
            node.core_mut().scan_for_clipping(frames);
        }
        Err(err) => {
            entry.failures = entry.failures.saturating_add(1);
            if entry.failures == 1 {
                warn!(node = %node.id(), %err, "node failed, keeping previous output");
            }
            if policy.should_silence(entry.failures) {
                if entry.failures == policy.silence_after {
                    warn!(node = %node.id(), failures = entry.failures, "node silenced");
                }
                node.core_mut().silence_outputs(frames);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Borrows `items[read]` immutably and `items[write]` mutably.
fn split_pair<T>(items: &mut [T], read: usize, write: usize) -> Option<(&T, &mut T)> {
    if read == write || read >= items.len() || write >= items.len() {
        return None;
    }
    if read < write {
        let (lo, hi) = items.split_at_mut(write);
        Some((&lo[read], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(read);
        Some((&hi[0], &mut lo[write]))
    }
}
