//! The processing patch used by `process` and `info`.
//!
//! ```text
//! in ─▶ gain ─▶ split ─┬─▶ mix.in1 ─▶ out (stereo)
//!                      ├─▶ mix.in2
//!                      └─▶ ...
//! ```
//!
//! Splitter branches are panned evenly from hard left to hard right and
//! scaled by `1 / branches`.

use patchbay_core::{
    AudioInputNode, AudioOutputNode, GainNode, Graph, GraphConfig, GraphError, MAX_SPLITTER_OUTPUTS,
    MIN_SPLITTER_OUTPUTS, Mixer, SignalType, Splitter,
};

/// Settings of the patch.
#[derive(Clone, Copy, Debug)]
pub struct PatchSpec {
    /// Layout of the input tap.
    pub input: SignalType,
    /// Gain stage setting in dB.
    pub gain_db: f32,
    /// Splitter branches.
    pub branches: usize,
}

impl Default for PatchSpec {
    fn default() -> Self {
        Self {
            input: SignalType::Stereo,
            gain_db: 0.0,
            branches: MIN_SPLITTER_OUTPUTS,
        }
    }
}

/// Pan position of branch `i` of `n`.
fn branch_pan(i: usize, n: usize) -> f32 {
    if n <= 1 {
        return 0.0;
    }
    -1.0 + 2.0 * i as f32 / (n - 1) as f32
}

/// Builds the patch and sets its taps.
pub fn build_patch(config: GraphConfig, spec: PatchSpec) -> Result<Graph, GraphError> {
    let branches = spec.branches.clamp(MIN_SPLITTER_OUTPUTS, MAX_SPLITTER_OUTPUTS);
    let mut graph = Graph::new(config);

    graph.add_node(AudioInputNode::new("in", spec.input))?;
    graph.add_node(GainNode::new("gain", SignalType::Mono, spec.gain_db))?;
    graph.add_node(Splitter::new("split", branches))?;
    let mut mixer = Mixer::new("mix", branches);
    for i in 0..branches {
        mixer.set_pan(i, branch_pan(i, branches));
        mixer.set_level(i, 1.0 / branches as f32);
    }
    graph.add_node(mixer)?;
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo))?;
    graph.set_input_tap("in")?;
    graph.set_output_tap("out")?;

    graph.connect_by_name("in", "out", "gain", "in")?;
    graph.connect_by_name("gain", "out", "split", "in")?;
    for i in 1..=branches {
        graph.connect_by_name("split", &format!("out{i}"), "mix", &format!("in{i}"))?;
    }
    graph.connect_by_name("mix", "out", "out", "in")?;
    Ok(graph)
}
