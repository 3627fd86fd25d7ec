//! File-based graph rendering command.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use patchbay_core::{NodeId, SPECTRUM_SIZE, SignalType, linear_to_db, rms_db};
use patchbay_io::{BlockEngine, WavSpec, read_wav, write_wav};
use tracing::{info, warn};

use crate::patch::{PatchSpec, build_patch};

/// Blocks rendered between progress updates.
const BLOCKS_PER_STEP: usize = 64;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file (mono or stereo)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file (always stereo)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Gain stage setting in dB
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    gain: f32,

    /// Number of parallel branches between splitter and mixer (2-8)
    #[arg(long, default_value_t = 2)]
    split: usize,

    /// Run independent branches on the worker pool
    #[arg(long)]
    parallel: bool,

    /// Processing block size (overrides the config file)
    #[arg(long)]
    block_size: Option<usize>,

    /// Engine config file (defaults to the user config file if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value_t = 32)]
    bit_depth: u16,
}

/// Spectrum frames seen during the render.
#[derive(Default)]
struct SpectrumStats {
    frames: usize,
    last: Vec<f32>,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("unsupported bit depth {} (use 16, 24 or 32)", args.bit_depth);
    }

    let mut config = super::load_config(args.config.as_deref())?;
    if args.parallel {
        config.parallel = true;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }

    println!("Reading {}...", args.input.display());
    let (samples, spec) = read_wav(&args.input)?;
    let in_channels = usize::from(spec.channels);
    config.sample_rate = spec.sample_rate;
    config.validate()?;

    let total_frames = samples.len() / in_channels;
    println!(
        "  {} frames, {} channel(s), {} Hz, {:.2}s",
        total_frames,
        in_channels,
        spec.sample_rate,
        total_frames as f32 / spec.sample_rate as f32
    );

    let patch = PatchSpec {
        input: if in_channels == 2 {
            SignalType::Stereo
        } else {
            SignalType::Mono
        },
        gain_db: args.gain,
        branches: args.split,
    };
    let mut graph = build_patch(config.to_graph_config(), patch)?;

    let spectrum = Arc::new(Mutex::new(SpectrumStats::default()));
    let sink = Arc::clone(&spectrum);
    graph.set_spectrum_listener(move |magnitudes: &[f32]| {
        let mut stats = sink.lock();
        stats.frames += 1;
        stats.last.clear();
        stats.last.extend_from_slice(magnitudes);
    });

    let block_size = config.block_size;
    let mut engine = BlockEngine::new(graph, spec.sample_rate as f32, block_size);
    info!(
        block_size,
        branches = args.split,
        parallel = config.parallel,
        "rendering"
    );

    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let step = block_size * BLOCKS_PER_STEP * in_channels;
    let mut output = Vec::with_capacity(total_frames * 2);
    let mut clipped: BTreeSet<NodeId> = BTreeSet::new();
    for chunk in samples[..total_frames * in_channels].chunks(step) {
        output.extend(engine.render_offline(chunk, in_channels, 2)?);
        clipped.extend(
            engine
                .graph()
                .nodes()
                .filter(|n| n.core().is_clipping())
                .map(|n| n.id().clone()),
        );
        pb.inc((chunk.len() / in_channels) as u64);
    }
    pb.finish_with_message("done");

    let graph = engine.into_graph();
    let floor = config.meter_floor_db;

    println!("\nLevels:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        rms_db(&samples, floor),
        linear_to_db(peak(&samples)).max(floor)
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        rms_db(&output, floor),
        linear_to_db(peak(&output)).max(floor)
    );
    println!(
        "  Last block: in {:.1} dB, out {:.1} dB",
        graph.input_level_db(),
        graph.output_level_db()
    );

    if clipped.is_empty() {
        println!("Clipping: none");
    } else {
        let names: Vec<&str> = clipped.iter().map(NodeId::as_str).collect();
        println!("Clipping: {}", names.join(", "));
    }

    let stats = spectrum.lock();
    if let Some((bin, _)) = stats
        .last
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        let hz = bin as f32 * spec.sample_rate as f32 / SPECTRUM_SIZE as f32;
        println!(
            "Spectrum: {} frame(s), strongest bin ~{:.0} Hz",
            stats.frames, hz
        );
    }
    drop(stats);

    for id in graph.node_ids() {
        if let Some(failures) = graph.failure_count(id.as_str())
            && failures > 0
        {
            warn!(node = %id, failures, "node failed during render");
        }
    }

    println!("\nExecution:");
    println!("{}", graph.diagnostics());

    let out_spec = WavSpec {
        channels: 2,
        sample_rate: spec.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, out_spec)?;
    println!("Done!");

    Ok(())
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
