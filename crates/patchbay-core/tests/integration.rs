//! Integration tests for the patchbay graph runtime.
//!
//! Builds small graphs from the built-in nodes plus a few test nodes and checks
//! end-to-end block output, topology bookkeeping, failure isolation,
//! parallel/sequential equivalence and instrumentation.

use std::sync::{Arc, Mutex};

use patchbay_core::{
    AudioInputNode, AudioOutputNode, EffectiveSignal, FailurePolicy, GainNode, Graph, GraphConfig,
    GraphError, Mixer, MixerMode, NodeCategory, NodeCore, NodeError, NodeState, PortDirection,
    PortId, ProcessingNode, SPECTRUM_BINS, SignalFlowAnalyzer, SignalType, Splitter,
};

const FRAMES: usize = 128;

// ============================================================================
// Test nodes
// ============================================================================

/// One-pole lowpass with internal state, so block order matters.
struct Smoother {
    core: NodeCore,
    coeff: f32,
    state: f32,
}

impl Smoother {
    fn new(id: &str, coeff: f32) -> Self {
        Self {
            core: NodeCore::new(id, "Smoother", NodeCategory::Effect)
                .with_input("in", SignalType::Mono)
                .with_output("out", SignalType::Mono),
            coeff,
            state: 0.0,
        }
    }
}

impl ProcessingNode for Smoother {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        let (inputs, outputs) = self.core.io_mut();
        let input = inputs[0].samples(frames);
        for (o, &x) in outputs[0].samples_mut(frames).iter_mut().zip(input) {
            self.state += self.coeff * (x - self.state);
            *o = self.state.sin() * 0.9 + x * 0.1;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.core.reset();
        self.state = 0.0;
    }
}

/// Writes a constant on its first `good_blocks` blocks, then fails.
struct Flaky {
    core: NodeCore,
    good_blocks: usize,
    calls: usize,
    panic: bool,
}

impl Flaky {
    fn new(id: &str, good_blocks: usize, panic: bool) -> Self {
        Self {
            core: NodeCore::new(id, "Flaky", NodeCategory::Effect)
                .with_input("in", SignalType::Mono)
                .with_output("out", SignalType::Mono),
            good_blocks,
            calls: 0,
            panic,
        }
    }
}

impl ProcessingNode for Flaky {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        self.calls += 1;
        if self.calls > self.good_blocks {
            if self.panic {
                panic!("flaky node exploded");
            }
            return Err(NodeError::Processing("flaky node failed".into()));
        }
        self.core.output_mut(0).unwrap().samples_mut(frames).fill(0.7);
        Ok(())
    }
}

/// Source that reports a device problem.
struct BrokenDevice {
    core: NodeCore,
}

impl ProcessingNode for BrokenDevice {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        self.core.silence_outputs(frames);
        Ok(())
    }

    fn device_status(&self) -> Option<&str> {
        Some("device 'hw:9' not found")
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn out(node: &str, index: usize) -> PortId {
    PortId::output(node, index)
}

fn inp(node: &str, index: usize) -> PortId {
    PortId::input(node, index)
}

/// `in → gain → out`, all mono.
fn unity_chain(config: GraphConfig) -> Graph {
    let mut graph = Graph::new(config);
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(GainNode::new("gain", SignalType::Mono, 0.0)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Mono)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph.connect(&out("in", 0), &inp("gain", 0)).unwrap();
    graph.connect(&out("gain", 0), &inp("out", 0)).unwrap();
    graph
}

/// Input fanned out to `width` smoothers, mixed back to stereo.
fn wide_graph(config: GraphConfig, width: usize) -> Graph {
    let mut graph = Graph::new(config);
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(Splitter::new("split", width)).unwrap();
    let mut mixer = Mixer::new("mix", width);
    for ch in 0..width {
        mixer.set_pan(ch, -1.0 + 2.0 * ch as f32 / (width - 1) as f32);
    }
    graph.add_node(mixer).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph.connect(&out("in", 0), &inp("split", 0)).unwrap();
    for ch in 0..width {
        let id = format!("fx{ch}");
        graph
            .add_node(Smoother::new(&id, 0.05 + 0.1 * ch as f32))
            .unwrap();
        graph.connect(&out("split", ch), &inp(&id, 0)).unwrap();
        graph.connect(&out(&id, 0), &inp("mix", ch)).unwrap();
    }
    graph.connect(&out("mix", 0), &inp("out", 0)).unwrap();
    graph
}

fn test_signal(block: usize) -> Vec<f32> {
    (0..FRAMES)
        .map(|i| ((block * FRAMES + i) as f32 * 0.013).sin() * 0.8)
        .collect()
}

// ============================================================================
// 1. End-to-end scenarios
// ============================================================================

#[test]
fn unity_gain_chain_passes_signal() {
    let mut graph = unity_chain(GraphConfig::default());
    let input = [0.5f32; FRAMES];
    let mut output = [0.0f32; FRAMES];
    graph.process(&input, &mut output, FRAMES).unwrap();
    assert!(output.iter().all(|&s| s == 0.5));
}

#[test]
fn mono_source_into_stereo_output_duplicates() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph
        .connect_with_gain(&out("in", 0), &inp("out", 0), 0.5)
        .unwrap();

    let input: Vec<f32> = (0..4).map(|i| i as f32).collect();
    let mut output = [0.0f32; 8];
    graph.process(&input, &mut output, 4).unwrap();
    assert_eq!(output, [0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.5, 1.5]);
}

#[test]
fn stereo_input_downmixes_into_mono_chain() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Stereo)).unwrap();
    graph.add_node(GainNode::new("gain", SignalType::Mono, 0.0)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Mono)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph.connect(&out("in", 0), &inp("gain", 0)).unwrap();
    graph.connect(&out("gain", 0), &inp("out", 0)).unwrap();

    let input = [1.0, 0.0, 0.25, 0.75];
    let mut output = [0.0f32; 2];
    graph.process(&input, &mut output, 2).unwrap();
    assert_eq!(output, [0.5, 0.5]);
}

#[test]
fn oversized_mono_buffers_stay_mono() {
    let mut graph = unity_chain(GraphConfig::default());
    let input: Vec<f32> = (0..512).map(|i| i as f32).collect();
    let mut output = vec![-1.0f32; 512];
    graph.process(&input, &mut output, FRAMES).unwrap();

    assert_eq!(graph.input_layout(), SignalType::Mono);
    assert_eq!(&output[..FRAMES], &input[..FRAMES]);
    assert!(output[FRAMES..].iter().all(|&s| s == -1.0));
}

#[test]
fn explicit_layout_overrides_tap_layout() {
    let mut graph = unity_chain(GraphConfig::default());
    let input = [1.0, 0.0, 0.25, 0.75, 0.5, 0.5];
    let mut output = [0.0f32; 6];
    graph
        .process_with_layout(&input, SignalType::Stereo, &mut output, SignalType::Stereo, 3)
        .unwrap();
    assert_eq!(output, [0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
}

#[test]
fn splitter_outputs_match_ramp() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(Splitter::new("split", 3)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.connect(&out("in", 0), &inp("split", 0)).unwrap();

    let ramp: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
    let mut output = [0.0f32; 64];
    graph.process(&ramp, &mut output, 64).unwrap();

    let split = graph.node("split").unwrap();
    assert_eq!(split.core().outputs().len(), 3);
    for port in split.core().outputs() {
        assert_eq!(port.samples(64), ramp.as_slice());
    }
    // No output tap: silence.
    assert!(output.iter().all(|&s| s == 0.0));
}

#[test]
fn connection_gain_can_change_between_blocks() {
    let mut graph = unity_chain(GraphConfig::default());
    let id = graph
        .find_connection(&out("gain", 0), &inp("out", 0))
        .unwrap();
    graph.rebuild_processing_order().unwrap();
    graph.set_connection_gain(id, 0.25).unwrap();
    assert!(!graph.is_order_dirty());

    let input = [1.0f32; 16];
    let mut output = [0.0f32; 16];
    graph.process(&input, &mut output, 16).unwrap();
    assert!(output.iter().all(|&s| s == 0.25));
}

#[test]
fn block_larger_than_prepared_grows_buffers() {
    let config = GraphConfig {
        max_frames: 32,
        ..GraphConfig::default()
    };
    let mut graph = unity_chain(config);
    let input = vec![0.5f32; 256];
    let mut output = vec![0.0f32; 256];
    graph.process(&input, &mut output, 256).unwrap();
    assert_eq!(graph.config().max_frames, 256);
    assert!(output.iter().all(|&s| s == 0.5));
}

// ============================================================================
// 2. Mutation and topology
// ============================================================================

#[test]
fn remove_node_cascades_connections() {
    let mut graph = unity_chain(GraphConfig::default());
    assert_eq!(graph.connection_count(), 2);

    graph.remove_node("gain").unwrap();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.connection_count(), 0);
    assert!(!graph.node("out").unwrap().core().inputs()[0].is_connected());

    let err = graph.connect(&out("in", 0), &inp("gain", 0)).unwrap_err();
    assert_eq!(err, GraphError::NodeNotFound("gain".into()));

    graph.add_node(GainNode::new("gain", SignalType::Mono, 0.0)).unwrap();
    graph.connect(&out("in", 0), &inp("gain", 0)).unwrap();
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn duplicate_node_rejected() {
    let mut graph = unity_chain(GraphConfig::default());
    let err = graph
        .add_node(GainNode::new("gain", SignalType::Stereo, 3.0))
        .unwrap_err();
    assert_eq!(err, GraphError::DuplicateNode("gain".into()));
    assert_eq!(graph.node_count(), 3);
}

#[test]
fn connected_input_rejects_second_connection() {
    let mut graph = unity_chain(GraphConfig::default());
    graph.add_node(AudioInputNode::new("in2", SignalType::Mono)).unwrap();
    let err = graph.connect(&out("in2", 0), &inp("gain", 0)).unwrap_err();
    assert!(matches!(err, GraphError::InputAlreadyConnected(_)));
    assert_eq!(graph.connection_count(), 2);
}

#[test]
fn output_fans_out_to_many_inputs() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    for i in 0..4 {
        let id = format!("g{i}");
        graph.add_node(GainNode::new(id.as_str(), SignalType::Mono, 0.0)).unwrap();
        graph.connect(&out("in", 0), &inp(&id, 0)).unwrap();
    }
    assert_eq!(graph.connection_count(), 4);
    assert_eq!(graph.levels().unwrap()[1].len(), 4);
}

#[test]
fn reversed_or_missing_ports_rejected() {
    let mut graph = unity_chain(GraphConfig::default());
    graph.add_node(GainNode::new("spare", SignalType::Mono, 0.0)).unwrap();

    let err = graph.connect(&inp("spare", 0), &out("gain", 0)).unwrap_err();
    assert!(matches!(err, GraphError::InvalidConnection { .. }));

    let err = graph.connect(&out("gain", 3), &inp("spare", 0)).unwrap_err();
    assert!(matches!(err, GraphError::PortNotFound { .. }));

    let err = graph.connect(&out("spare", 0), &inp("spare", 0)).unwrap_err();
    assert!(matches!(err, GraphError::InvalidConnection { .. }));
}

#[test]
fn cycle_rejected_and_graph_unchanged() {
    let mut graph = Graph::default();
    for id in ["a", "b", "c"] {
        graph.add_node(GainNode::new(id, SignalType::Mono, 0.0)).unwrap();
    }
    graph.connect(&out("a", 0), &inp("b", 0)).unwrap();
    graph.connect(&out("b", 0), &inp("c", 0)).unwrap();
    let before = graph.processing_order().unwrap();

    let err = graph.connect(&out("c", 0), &inp("a", 0)).unwrap_err();
    assert_eq!(
        err,
        GraphError::CycleDetected {
            from: "c".into(),
            to: "a".into()
        }
    );
    assert_eq!(graph.connection_count(), 2);
    assert!(!graph.is_order_dirty());
    assert_eq!(graph.processing_order().unwrap(), before);
}

#[test]
fn diamond_levels() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(Splitter::new("split", 2)).unwrap();
    graph.add_node(GainNode::new("a", SignalType::Mono, -3.0)).unwrap();
    graph.add_node(GainNode::new("b", SignalType::Mono, -6.0)).unwrap();
    graph.add_node(Mixer::new("mix", 2)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo)).unwrap();
    graph.connect(&out("in", 0), &inp("split", 0)).unwrap();
    graph.connect(&out("split", 0), &inp("a", 0)).unwrap();
    graph.connect(&out("split", 1), &inp("b", 0)).unwrap();
    graph.connect(&out("a", 0), &inp("mix", 0)).unwrap();
    graph.connect(&out("b", 0), &inp("mix", 1)).unwrap();
    graph.connect(&out("mix", 0), &inp("out", 0)).unwrap();

    let levels = graph.levels().unwrap();
    let names: Vec<Vec<&str>> = levels
        .iter()
        .map(|l| l.iter().map(|id| id.as_str()).collect())
        .collect();
    assert_eq!(
        names,
        vec![vec!["in"], vec!["split"], vec!["a", "b"], vec!["mix"], vec!["out"]]
    );
    assert_eq!(graph.level_of("mix").unwrap(), 3);

    let summary = graph.diagnostics();
    assert_eq!(summary.level_count(), 5);
    assert_eq!(summary.max_level_width(), 2);
}

#[test]
fn order_is_recomputed_lazily() {
    let mut graph = unity_chain(GraphConfig::default());
    assert!(graph.is_order_dirty());
    graph.rebuild_processing_order().unwrap();
    assert!(!graph.is_order_dirty());

    graph.set_bypass("gain", true).unwrap();
    assert!(!graph.is_order_dirty());

    graph.disconnect_by_name("gain", "out", "out", "in").unwrap();
    assert!(graph.is_order_dirty());
    let mut output = [1.0f32; 8];
    graph.process(&[0.5; 8], &mut output, 8).unwrap();
    assert!(!graph.is_order_dirty());
    assert!(output.iter().all(|&s| s == 0.0));
}

#[test]
fn connect_and_disconnect_by_name() {
    let mut graph = Graph::default();
    graph.add_node(Splitter::new("split", 2)).unwrap();
    graph.add_node(Mixer::new("mix", 2)).unwrap();
    let id = graph.connect_by_name("split", "out2", "mix", "in1").unwrap();
    assert_eq!(graph.connection(id).unwrap().source(), &out("split", 1));

    let err = graph
        .connect_by_name("split", "out9", "mix", "in2")
        .unwrap_err();
    assert!(matches!(err, GraphError::PortNotFound { .. }));

    assert!(matches!(
        graph.disconnect_by_name("split", "out1", "mix", "in1"),
        Err(GraphError::NotConnected { .. })
    ));
    graph.disconnect_by_name("split", "out2", "mix", "in1").unwrap();
    assert_eq!(graph.connection_count(), 0);
    assert!(matches!(
        graph.disconnect(id),
        Err(GraphError::ConnectionNotFound(_))
    ));
    assert_eq!(
        graph
            .port_id("mix", PortDirection::Input, "in2")
            .unwrap()
            .index(),
        1
    );
}

// ============================================================================
// 3. Lifecycle
// ============================================================================

#[test]
fn late_join_is_prepared() {
    let mut graph = unity_chain(GraphConfig::default());
    graph.prepare(44100.0, 64);
    graph.add_node(GainNode::new("late", SignalType::Stereo, 0.0)).unwrap();
    let late = graph.node("late").unwrap();
    assert_eq!(late.core().state(), NodeState::Prepared);
    assert_eq!(late.core().sample_rate(), 44100.0);
    assert_eq!(late.core().outputs()[0].buffer().len(), 128);
}

#[test]
fn shutdown_releases_and_silences() {
    let mut graph = unity_chain(GraphConfig {
        parallel: true,
        worker_threads: 2,
        ..GraphConfig::default()
    });
    assert_eq!(graph.worker_threads(), 2);
    let mut output = [0.0f32; 8];
    graph.process(&[0.5; 8], &mut output, 8).unwrap();
    assert_eq!(graph.node("gain").unwrap().core().state(), NodeState::Processing);

    graph.shutdown();
    graph.shutdown();
    assert!(graph.is_shut_down());
    assert_eq!(graph.worker_threads(), 0);
    assert_eq!(graph.node("gain").unwrap().core().state(), NodeState::Released);

    graph.process(&[0.5; 8], &mut output, 8).unwrap();
    assert!(output.iter().all(|&s| s == 0.0));
}

#[test]
fn reset_restores_prepared_state() {
    let mut graph = wide_graph(GraphConfig::default(), 2);
    let mut first = vec![0.0f32; FRAMES * 2];
    graph.process(&test_signal(0), &mut first, FRAMES).unwrap();
    let mut warm = vec![0.0f32; FRAMES * 2];
    graph.process(&test_signal(0), &mut warm, FRAMES).unwrap();
    assert_ne!(first, warm);

    graph.reset();
    assert_eq!(graph.node("fx0").unwrap().core().state(), NodeState::Prepared);
    let mut again = vec![0.0f32; FRAMES * 2];
    graph.process(&test_signal(0), &mut again, FRAMES).unwrap();
    assert_eq!(first, again);
}

// ============================================================================
// 4. Parallel execution
// ============================================================================

#[test]
fn parallel_matches_sequential_bit_for_bit() {
    let mut sequential = wide_graph(GraphConfig::default(), 6);
    let mut parallel = wide_graph(
        GraphConfig {
            parallel: true,
            worker_threads: 3,
            ..GraphConfig::default()
        },
        6,
    );
    assert!(parallel.diagnostics().parallel_levels() >= 1);

    for block in 0..32 {
        let input = test_signal(block);
        let mut a = vec![0.0f32; FRAMES * 2];
        let mut b = vec![0.0f32; FRAMES * 2];
        sequential.process(&input, &mut a, FRAMES).unwrap();
        parallel.process(&input, &mut b, FRAMES).unwrap();
        let a_bits: Vec<u32> = a.iter().map(|s| s.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|s| s.to_bits()).collect();
        assert_eq!(a_bits, b_bits, "block {block} differs");
    }
}

#[test]
fn parallel_toggle_starts_pool() {
    let mut graph = wide_graph(GraphConfig::default(), 3);
    assert_eq!(graph.worker_threads(), 0);
    graph.set_parallel(true);
    assert!(graph.is_parallel());
    assert!(graph.worker_threads() >= 1);
    let text = graph.diagnostics().to_string();
    assert!(text.contains("execution: parallel"));
}

// ============================================================================
// 5. Failure isolation
// ============================================================================

fn flaky_graph(policy: FailurePolicy, panic: bool, parallel: bool) -> Graph {
    let mut graph = Graph::new(GraphConfig {
        failure_policy: policy,
        parallel,
        worker_threads: 2,
        ..GraphConfig::default()
    });
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(Flaky::new("flaky", 1, panic)).unwrap();
    graph.add_node(GainNode::new("steady", SignalType::Mono, 0.0)).unwrap();
    graph.add_node(Mixer::new("mix", 2).with_mode(MixerMode::Mono)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph.connect(&out("in", 0), &inp("flaky", 0)).unwrap();
    graph.connect(&out("in", 0), &inp("steady", 0)).unwrap();
    graph.connect(&out("flaky", 0), &inp("mix", 0)).unwrap();
    graph.connect(&out("steady", 0), &inp("mix", 1)).unwrap();
    graph.connect(&out("mix", 0), &inp("out", 0)).unwrap();
    graph
}

fn flaky_output(graph: &Graph) -> f32 {
    graph.node("flaky").unwrap().core().outputs()[0].samples(4)[0]
}

#[test]
fn failing_node_keeps_stale_output_then_silences() {
    let mut graph = flaky_graph(FailurePolicy { silence_after: 3 }, false, false);
    let mut output = [0.0f32; 8];

    graph.process(&[0.0; 4], &mut output, 4).unwrap();
    assert_eq!(flaky_output(&graph), 0.7);

    for expected_failures in 1..=2 {
        graph.process(&[0.0; 4], &mut output, 4).unwrap();
        assert_eq!(graph.failure_count("flaky"), Some(expected_failures));
        assert_eq!(flaky_output(&graph), 0.7);
    }

    graph.process(&[0.0; 4], &mut output, 4).unwrap();
    assert_eq!(graph.failure_count("flaky"), Some(3));
    assert_eq!(flaky_output(&graph), 0.0);
}

#[test]
fn retain_policy_never_silences() {
    let mut graph = flaky_graph(FailurePolicy::RETAIN, false, false);
    let mut output = [0.0f32; 8];
    for _ in 0..20 {
        graph.process(&[0.0; 4], &mut output, 4).unwrap();
    }
    assert_eq!(graph.failure_count("flaky"), Some(19));
    assert_eq!(flaky_output(&graph), 0.7);
}

#[test]
fn panicking_node_is_isolated_in_parallel_level() {
    let mut graph = flaky_graph(FailurePolicy::default(), true, true);
    let mut output = [0.0f32; 8];
    for _ in 0..3 {
        graph.process(&[0.5; 4], &mut output, 4).unwrap();
    }
    assert_eq!(graph.failure_count("flaky"), Some(2));
    assert_eq!(graph.failure_count("steady"), Some(0));

    // Mono mix: (0.7 + 0.5) · cos(π/4) on both sides.
    let expected = 1.2 * core::f32::consts::FRAC_PI_4.cos();
    for &s in &output {
        assert!((s - expected).abs() < 1e-6);
    }
}

// ============================================================================
// 6. Instrumentation
// ============================================================================

#[test]
fn meters_report_rms_in_db() {
    let mut graph = unity_chain(GraphConfig::default());
    let meters = graph.meters();
    assert_eq!(meters.output_db(), -100.0);

    let mut output = [0.0f32; FRAMES];
    graph.process(&[0.5; FRAMES], &mut output, FRAMES).unwrap();
    assert!((graph.input_level_db() - (-6.0206)).abs() < 1e-3);
    assert!((meters.output_db() - (-6.0206)).abs() < 1e-3);

    graph.process(&[0.0; FRAMES], &mut output, FRAMES).unwrap();
    assert_eq!(graph.output_level_db(), -100.0);
}

#[test]
fn clipping_node_latches_indicator() {
    let mut graph = unity_chain(GraphConfig::default());
    graph.remove_node("gain").unwrap();
    graph.add_node(GainNode::new("gain", SignalType::Mono, 12.0)).unwrap();
    graph.connect(&out("in", 0), &inp("gain", 0)).unwrap();
    graph.connect(&out("gain", 0), &inp("out", 0)).unwrap();

    let mut output = [0.0f32; 16];
    graph.process(&[0.5; 16], &mut output, 16).unwrap();
    assert!(graph.node("gain").unwrap().is_clipping());
    assert!(!graph.node("in").unwrap().is_clipping());
}

#[test]
fn tap_listeners_see_each_block() {
    let mut graph = unity_chain(GraphConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    graph.set_output_listener(move |samples: &[f32], ty: SignalType| {
        sink.lock().unwrap().push((samples.len(), ty));
    });

    let mut output = [0.0f32; 32];
    graph.process(&[0.1; 32], &mut output, 32).unwrap();
    graph.process(&[0.1; 32], &mut output, 32).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(32, SignalType::Mono), (32, SignalType::Mono)]
    );
}

#[test]
fn spectrum_listener_fires_per_2048_samples() {
    let mut graph = unity_chain(GraphConfig::default());
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&frames);
    graph.set_spectrum_listener(move |mags: &[f32]| {
        sink.lock().unwrap().push(mags.len());
    });

    let mut output = [0.0f32; FRAMES];
    for block in 0..15 {
        graph.process(&test_signal(block), &mut output, FRAMES).unwrap();
    }
    assert!(frames.lock().unwrap().is_empty());
    graph.process(&test_signal(15), &mut output, FRAMES).unwrap();
    assert_eq!(*frames.lock().unwrap(), vec![SPECTRUM_BINS]);
}

#[test]
fn device_errors_are_collected() {
    let mut graph = unity_chain(GraphConfig::default());
    assert!(graph.device_errors().is_empty());
    graph
        .add_node(BrokenDevice {
            core: NodeCore::new("dev", "Device", NodeCategory::Source)
                .with_output("out", SignalType::Stereo),
        })
        .unwrap();
    let errors = graph.device_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0.as_str(), "dev");
    assert!(errors[0].1.contains("hw:9"));
}

// ============================================================================
// 7. Signal flow analysis
// ============================================================================

#[test]
fn analyzer_infers_effective_layouts() {
    let mut graph = Graph::default();
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(GainNode::new("wide", SignalType::Stereo, 0.0)).unwrap();
    graph.add_node(Splitter::new("split", 2)).unwrap();
    graph.add_node(Mixer::new("mix", 2)).unwrap();
    graph.add_node(Mixer::new("mono_mix", 2).with_mode(MixerMode::Mono)).unwrap();
    graph.add_node(GainNode::new("orphan", SignalType::Stereo, 0.0)).unwrap();

    let c_in_wide = graph.connect(&out("in", 0), &inp("wide", 0)).unwrap();
    let c_wide_split = graph.connect(&out("wide", 0), &inp("split", 0)).unwrap();
    let c_split_mix = graph.connect(&out("split", 0), &inp("mix", 0)).unwrap();
    let c_mix_mono = graph.connect(&out("mix", 0), &inp("mono_mix", 0)).unwrap();

    let mut analyzer = SignalFlowAnalyzer::new();
    analyzer.analyze(&graph).unwrap();

    assert_eq!(analyzer.signal_for_connection(c_in_wide), EffectiveSignal::Mono);
    // A stereo-typed effect fed only mono content stays mono.
    assert_eq!(analyzer.signal_for_connection(c_wide_split), EffectiveSignal::Mono);
    assert_eq!(analyzer.signal_for_connection(c_split_mix), EffectiveSignal::Mono);
    assert_eq!(analyzer.signal_for_connection(c_mix_mono), EffectiveSignal::Stereo);
    assert_eq!(
        analyzer.signal_for_port(&out("mono_mix", 0)),
        EffectiveSignal::Mono
    );
    assert_eq!(
        analyzer.signal_for_port(&out("split", 1)),
        EffectiveSignal::Mono
    );
    assert_eq!(
        analyzer.signal_for_port(&out("orphan", 0)),
        EffectiveSignal::Unknown
    );
}
