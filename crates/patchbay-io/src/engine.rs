//! Drives a graph from block devices or from whole buffers.

use patchbay_core::{Graph, GraphError, SignalType};
use tracing::{debug, warn};

use crate::device::BlockDevice;
use crate::{Error, Result};

/// Owns a [`Graph`] plus optional input and output devices.
///
/// Device blocks enter through the graph's input tap and leave through its
/// output tap; their interleaved layout follows each device's channel count.
pub struct BlockEngine {
    graph: Graph,
    sample_rate: f32,
    frames: usize,
    input: Option<Box<dyn BlockDevice>>,
    output: Option<Box<dyn BlockDevice>>,
    in_buf: Vec<f32>,
    out_buf: Vec<f32>,
    in_type: SignalType,
    out_type: SignalType,
    running: bool,
}

impl BlockEngine {
    /// Wraps `graph` for blocks of `frames` frames at `sample_rate`.
    pub fn new(graph: Graph, sample_rate: f32, frames: usize) -> Self {
        Self {
            graph,
            sample_rate,
            frames: frames.max(1),
            input: None,
            output: None,
            in_buf: Vec::new(),
            out_buf: Vec::new(),
            in_type: SignalType::Mono,
            out_type: SignalType::Stereo,
            running: false,
        }
    }

    /// Sets the capture device.
    pub fn with_input(mut self, device: impl BlockDevice + 'static) -> Self {
        self.input = Some(Box::new(device));
        self
    }

    /// Sets the playback device.
    pub fn with_output(mut self, device: impl BlockDevice + 'static) -> Self {
        self.output = Some(Box::new(device));
        self
    }

    /// The hosted graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The hosted graph, mutably.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Frames per block.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Returns true between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Prepares the graph and opens both devices.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.graph.prepare(self.sample_rate, self.frames);
        let in_channels = self.input.as_ref().map_or(1, |d| d.channels());
        let out_channels = self.output.as_ref().map_or(2, |d| d.channels());
        self.in_type = block_layout(in_channels);
        self.out_type = block_layout(out_channels);
        self.in_buf = vec![0.0; self.frames * self.in_type.channels()];
        self.out_buf = vec![0.0; self.frames * self.out_type.channels()];
        for device in self.input.iter_mut().chain(self.output.iter_mut()) {
            device.start(self.sample_rate, self.frames);
            if let Some(err) = device.error() {
                warn!(device = device.name(), err, "device failed to start");
            }
        }
        self.running = true;
        debug!(
            sample_rate = self.sample_rate,
            frames = self.frames,
            "block engine started"
        );
    }

    /// Reads one input block, processes it and writes the output block.
    ///
    /// Starts the engine on first use.
    ///
    /// # Errors
    ///
    /// Propagates a topology failure from [`Graph::process`]; the output
    /// device then receives silence.
    pub fn run_block(&mut self) -> std::result::Result<(), GraphError> {
        if !self.running {
            self.start();
        }
        match &mut self.input {
            Some(device) => {
                device.read_block(&mut self.in_buf);
            }
            None => self.in_buf.fill(0.0),
        }
        let result = self.graph.process_with_layout(
            &self.in_buf,
            self.in_type,
            &mut self.out_buf,
            self.out_type,
            self.frames,
        );
        if let Some(device) = &mut self.output {
            device.write_block(&self.out_buf);
        }
        result
    }

    /// Renders a whole interleaved buffer through the graph, block by block.
    ///
    /// Devices are not touched. The last block may be short. Returns
    /// `frames × out_channels` interleaved samples.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedChannels`] for channel counts other than 1 or 2,
    /// or a graph topology error.
    pub fn render_offline(
        &mut self,
        input: &[f32],
        in_channels: usize,
        out_channels: usize,
    ) -> Result<Vec<f32>> {
        let layout = |channels: usize| {
            SignalType::from_channels(channels).ok_or(Error::UnsupportedChannels(channels as u16))
        };
        let in_type = layout(in_channels)?;
        let out_type = layout(out_channels)?;
        if !self.graph.is_prepared() {
            self.graph.prepare(self.sample_rate, self.frames);
        }

        let total_frames = input.len() / in_channels;
        let mut output = vec![0.0; total_frames * out_channels];
        let in_chunks = input[..total_frames * in_channels].chunks(self.frames * in_channels);
        let out_chunks = output.chunks_mut(self.frames * out_channels);
        for (block_in, block_out) in in_chunks.zip(out_chunks) {
            let frames = block_in.len() / in_channels;
            self.graph
                .process_with_layout(block_in, in_type, block_out, out_type, frames)?;
        }
        Ok(output)
    }

    /// Device failures followed by node-reported device failures.
    pub fn device_errors(&self) -> Vec<(String, String)> {
        let devices = self
            .input
            .iter()
            .chain(self.output.iter())
            .filter_map(|d| d.error().map(|e| (d.name().to_owned(), e.to_owned())));
        let nodes = self
            .graph
            .device_errors()
            .into_iter()
            .map(|(id, e)| (id.to_string(), e));
        devices.chain(nodes).collect()
    }

    /// Stops both devices. The graph stays prepared.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        for device in self.input.iter_mut().chain(self.output.iter_mut()) {
            device.stop();
        }
        self.running = false;
        debug!("block engine stopped");
    }

    /// Stops the devices and returns the graph.
    pub fn into_graph(mut self) -> Graph {
        self.stop();
        std::mem::take(&mut self.graph)
    }
}

impl Drop for BlockEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BlockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockEngine")
            .field("graph", &self.graph)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

/// Block layout for a device with `channels` channels; wider devices are
/// driven as stereo.
fn block_layout(channels: usize) -> SignalType {
    SignalType::from_channels(channels).unwrap_or_else(|| {
        warn!(channels, "unsupported device layout, using stereo");
        SignalType::Stereo
    })
}
