//! Criterion benchmarks for the graph runtime (`patchbay-core::graph`).
//!
//! Measures graph overhead with cheap gain nodes so scheduling cost dominates.
//! Three axes:
//!
//! - **Order** - topological sort and level partition
//! - **Execute** - `process()` throughput, sequential vs parallel levels
//! - **Block sweep** - a wide graph across standard block sizes
//!
//! Run with: `cargo bench -p patchbay-core -- graph/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchbay_core::{
    AudioInputNode, AudioOutputNode, GainNode, Graph, GraphConfig, Mixer, PortId, SignalType,
    Splitter,
};

const BLOCK_SIZE: usize = 256;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

// ---------------------------------------------------------------------------
// Graph constructors
// ---------------------------------------------------------------------------

fn config(parallel: bool) -> GraphConfig {
    GraphConfig {
        parallel,
        max_frames: 1024,
        ..GraphConfig::default()
    }
}

/// `in → g0 → … → g{n-1} → out`, mono.
fn make_linear(n: usize, parallel: bool) -> Graph {
    let mut graph = Graph::new(config(parallel));
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Mono)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();

    let mut prev = String::from("in");
    for i in 0..n {
        let id = format!("g{i}");
        graph.add_node(GainNode::new(id.as_str(), SignalType::Mono, -0.5)).unwrap();
        graph
            .connect(&PortId::output(prev.as_str(), 0), &PortId::input(id.as_str(), 0))
            .unwrap();
        prev = id;
    }
    graph
        .connect(&PortId::output(prev.as_str(), 0), &PortId::input("out", 0))
        .unwrap();
    graph
}

/// `in → splitter(width) → width gain chains of `depth` → mixer → out`.
fn make_wide(width: usize, depth: usize, parallel: bool) -> Graph {
    let mut graph = Graph::new(config(parallel));
    graph.add_node(AudioInputNode::new("in", SignalType::Mono)).unwrap();
    graph.add_node(Splitter::new("split", width)).unwrap();
    graph.add_node(Mixer::new("mix", width)).unwrap();
    graph.add_node(AudioOutputNode::new("out", SignalType::Stereo)).unwrap();
    graph.set_input_tap("in").unwrap();
    graph.set_output_tap("out").unwrap();
    graph
        .connect(&PortId::output("in", 0), &PortId::input("split", 0))
        .unwrap();

    for ch in 0..width {
        let mut prev = PortId::output("split", ch);
        for d in 0..depth {
            let id = format!("g{ch}_{d}");
            graph.add_node(GainNode::new(id.as_str(), SignalType::Mono, -1.0)).unwrap();
            graph.connect(&prev, &PortId::input(id.as_str(), 0)).unwrap();
            prev = PortId::output(id.as_str(), 0);
        }
        graph.connect(&prev, &PortId::input("mix", ch)).unwrap();
    }
    graph
        .connect(&PortId::output("mix", 0), &PortId::input("out", 0))
        .unwrap();
    graph
}

// ---------------------------------------------------------------------------
// Order benchmarks
// ---------------------------------------------------------------------------

fn bench_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/order");

    for (name, mut graph) in [
        ("linear_20", make_linear(20, false)),
        ("wide_8x4", make_wide(8, 4, false)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                graph.rebuild_processing_order().unwrap();
                black_box(graph.diagnostics());
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Execute benchmarks - fixed block size 256
// ---------------------------------------------------------------------------

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/execute");

    let input = vec![0.5f32; BLOCK_SIZE];
    let mut mono_out = vec![0.0f32; BLOCK_SIZE];
    let mut stereo_out = vec![0.0f32; BLOCK_SIZE * 2];

    {
        let mut graph = make_linear(20, false);
        group.bench_function("linear_20_block256", |b| {
            b.iter(|| {
                graph
                    .process(black_box(&input), &mut mono_out, BLOCK_SIZE)
                    .unwrap();
                black_box(&mono_out);
            });
        });
    }

    for parallel in [false, true] {
        let mut graph = make_wide(8, 4, parallel);
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(format!("wide_8x4_{label}"), |b| {
            b.iter(|| {
                graph
                    .process(black_box(&input), &mut stereo_out, BLOCK_SIZE)
                    .unwrap();
                black_box(&stereo_out);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Block size sweep
// ---------------------------------------------------------------------------

fn bench_block_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/block_sweep");

    for &block_size in BLOCK_SIZES {
        let input = vec![0.5f32; block_size];
        let mut output = vec![0.0f32; block_size * 2];

        for parallel in [false, true] {
            let mut graph = make_wide(8, 2, parallel);
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, block_size), &block_size, |b, &n| {
                b.iter(|| {
                    graph.process(black_box(&input), &mut output, n).unwrap();
                    black_box(&output);
                });
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_order, bench_execute, bench_block_sweep);
criterion_main!(benches);
