//! WAV files as interleaved `f32` blocks.
//!
//! Patches take mono or stereo input, so [`read_wav`] keeps the first two
//! channels of anything wider. A 32-bit [`WavSpec`] is stored as IEEE float,
//! narrower depths as integer PCM scaled to `[-1, 1)`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};

use crate::{Error, Result};

type Reader = WavReader<BufReader<File>>;

/// Sample encoding of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Integer PCM.
    Pcm,
    /// 32-bit IEEE float.
    IeeeFloat,
}

/// Channel count, rate and bit depth of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per stored sample.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    /// Mono, 48 kHz, 32-bit float.
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl WavSpec {
    /// Same spec with a different channel count.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Encoding [`write_wav`] uses for this spec.
    pub fn format(&self) -> WavFormat {
        if self.bits_per_sample == 32 {
            WavFormat::IeeeFloat
        } else {
            WavFormat::Pcm
        }
    }

    fn header(self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: match self.format() {
                WavFormat::IeeeFloat => SampleFormat::Float,
                WavFormat::Pcm => SampleFormat::Int,
            },
        }
    }

    /// Integer value of full scale at this depth.
    fn pcm_scale(&self) -> f32 {
        (1i64 << self.bits_per_sample.saturating_sub(1)) as f32
    }
}

/// Header summary of a WAV file.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Channels stored in the file, before any narrowing by [`read_wav`].
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per stored sample.
    pub bits_per_sample: u16,
    /// Frames in the file.
    pub num_frames: u64,
    /// Length in seconds.
    pub duration_secs: f64,
    /// Sample encoding.
    pub format: WavFormat,
}

/// Opens `path`, rejecting headers without channels.
fn open(path: &Path) -> Result<(Reader, WavSpec, WavFormat)> {
    let reader = WavReader::open(path)?;
    let header = reader.spec();
    if header.channels == 0 {
        return Err(Error::UnsupportedChannels(0));
    }
    let spec = WavSpec {
        channels: header.channels,
        sample_rate: header.sample_rate,
        bits_per_sample: header.bits_per_sample,
    };
    let format = match header.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };
    Ok((reader, spec, format))
}

/// Reads only the header of `path`.
pub fn read_wav_info(path: impl AsRef<Path>) -> Result<WavInfo> {
    let (reader, spec, format) = open(path.as_ref())?;
    let num_frames = u64::from(reader.duration());
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate.max(1)),
        format,
    })
}

/// Reads `path` as interleaved samples plus the spec they are laid out in.
///
/// Files with more than two channels come back as their first two; the
/// returned spec then says stereo.
pub fn read_wav(path: impl AsRef<Path>) -> Result<(Vec<f32>, WavSpec)> {
    let (reader, mut spec, format) = open(path.as_ref())?;
    let samples: Vec<f32> = match format {
        WavFormat::IeeeFloat => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        WavFormat::Pcm => {
            let scale = spec.pcm_scale();
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels);
    if channels <= 2 {
        return Ok((samples, spec));
    }
    spec.channels = 2;
    let front = samples
        .chunks_exact(channels)
        .flat_map(|frame| [frame[0], frame[1]])
        .collect();
    Ok((front, spec))
}

/// Writes interleaved `samples` in the encoding [`WavSpec::format`] names.
///
/// PCM output is clipped to the integer range.
pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], spec: WavSpec) -> Result<()> {
    if spec.channels == 0 {
        return Err(Error::UnsupportedChannels(0));
    }
    let mut writer = WavWriter::create(path, spec.header())?;
    match spec.format() {
        WavFormat::IeeeFloat => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        WavFormat::Pcm => {
            let scale = spec.pcm_scale();
            for &sample in samples {
                writer.write_sample((sample * scale).clamp(-scale, scale - 1.0) as i32)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}
