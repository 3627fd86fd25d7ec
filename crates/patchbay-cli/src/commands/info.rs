//! Execution layout of the processing patch.

use std::path::PathBuf;

use clap::Args;
use patchbay_core::{SignalFlowAnalyzer, SignalType};
use patchbay_io::{WavFormat, read_wav_info};

use crate::patch::{PatchSpec, build_patch};

/// Show how the patch would execute.
#[derive(Args)]
pub struct InfoArgs {
    /// Engine config file (defaults to the user config file if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of splitter branches (2-8)
    #[arg(long, default_value_t = 2)]
    split: usize,

    /// Treat the input as mono
    #[arg(long)]
    mono: bool,

    /// WAV file to describe; its channel count sets the input layout
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let mut input = if args.mono {
        SignalType::Mono
    } else {
        SignalType::Stereo
    };

    if let Some(path) = &args.wav {
        let info = read_wav_info(path)?;
        let format = match info.format {
            WavFormat::Pcm => "PCM",
            WavFormat::IeeeFloat => "IEEE Float",
        };
        println!("File:        {}", path.display());
        println!("Format:      {} {}-bit", format, info.bits_per_sample);
        println!("Channels:    {}", info.channels);
        println!("Sample Rate: {} Hz", info.sample_rate);
        println!(
            "Duration:    {:.3}s ({} frames)\n",
            info.duration_secs, info.num_frames
        );
        input = if info.channels >= 2 {
            SignalType::Stereo
        } else {
            SignalType::Mono
        };
    }

    let spec = PatchSpec {
        input,
        gain_db: 0.0,
        branches: args.split,
    };
    let mut graph = build_patch(config.to_graph_config(), spec)?;
    graph.rebuild_processing_order()?;

    println!(
        "Engine: {} Hz, block {} frames, {}",
        config.sample_rate,
        config.block_size,
        if config.parallel {
            "parallel"
        } else {
            "sequential"
        }
    );
    println!("\n{}\n", graph.diagnostics());

    for (i, level) in graph.levels()?.iter().enumerate() {
        let names: Vec<&str> = level.iter().map(|id| id.as_str()).collect();
        println!("L{i}: {}", names.join(", "));
    }

    let mut analyzer = SignalFlowAnalyzer::new();
    analyzer.analyze(&graph)?;
    println!("\nSignal flow:");
    for connection in graph.connections() {
        println!(
            "  {} -> {}: {:?} ({} port)",
            connection.source(),
            connection.target(),
            analyzer.signal_for_connection(connection.id()),
            connection.target_type()
        );
    }

    Ok(())
}
