//! Parallel mix demo: splitter fan-out, per-branch gain, stereo mixdown.
//!
//! Run with: cargo run -p patchbay-core --example parallel_mix_demo

use patchbay_core::{
    AudioInputNode, AudioOutputNode, GainNode, Graph, GraphConfig, GraphError, Mixer,
    SignalFlowAnalyzer, SignalType, Splitter,
};

const BRANCHES: usize = 4;
const FRAMES: usize = 256;

fn main() -> Result<(), GraphError> {
    let mut graph = Graph::new(GraphConfig {
        parallel: true,
        worker_threads: 2,
        max_frames: FRAMES,
        ..GraphConfig::default()
    });

    graph.add_node(AudioInputNode::new("in", SignalType::Mono))?;
    graph.add_node(Splitter::new("split", BRANCHES))?;
    let mut mixer = Mixer::new("mix", BRANCHES);
    for i in 0..BRANCHES {
        graph.add_node(GainNode::new(
            format!("fx{i}"),
            SignalType::Mono,
            -3.0 * i as f32,
        ))?;
        mixer.set_pan(i, -1.0 + 2.0 * i as f32 / (BRANCHES - 1) as f32);
    }
    graph.add_node(mixer)?;
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo))?;
    graph.set_input_tap("in")?;
    graph.set_output_tap("out")?;

    graph.connect_by_name("in", "out", "split", "in")?;
    for i in 0..BRANCHES {
        let fx = format!("fx{i}");
        graph.connect_by_name("split", &format!("out{}", i + 1), &fx, "in")?;
        graph.connect_by_name(&fx, "out", "mix", &format!("in{}", i + 1))?;
    }
    graph.connect_by_name("mix", "out", "out", "in")?;

    println!("=== Dependency levels ===\n");
    for (i, level) in graph.levels()?.iter().enumerate() {
        let names: Vec<&str> = level.iter().map(|id| id.as_str()).collect();
        println!("L{i}: {}", names.join(", "));
    }

    let mut analyzer = SignalFlowAnalyzer::new();
    analyzer.analyze(&graph)?;
    println!("\n=== Signal flow ===\n");
    for connection in graph.connections() {
        println!(
            "{:<14} -> {:<14} {:?}",
            connection.source().to_string(),
            connection.target().to_string(),
            analyzer.signal_for_connection(connection.id())
        );
    }

    let input: Vec<f32> = (0..FRAMES)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin() * 0.5)
        .collect();
    let mut output = vec![0.0; FRAMES * 2];
    for _ in 0..8 {
        graph.process(&input, &mut output, FRAMES)?;
    }

    println!("\n=== Levels ===\n");
    println!("input:  {:.2} dB", graph.input_level_db());
    println!("output: {:.2} dB", graph.output_level_db());

    println!("\n=== Execution ===\n");
    println!("{}", graph.diagnostics());
    Ok(())
}
