//! Graph construction settings.

use std::time::Duration;

use crate::clip::DEFAULT_CLIP_HOLD;

/// Lowest level reported by the meters, in dB.
pub const DEFAULT_METER_FLOOR_DB: f32 = -100.0;

/// Consecutive failures after which a failing node is silenced.
pub const DEFAULT_SILENCE_AFTER: u32 = 8;

/// How the graph treats a node whose `process` keeps failing.
///
/// A failed block always leaves the node's previous output in place. Once
/// `silence_after` consecutive blocks have failed, the node's outputs are
/// zeroed instead, so a stuck node stops repeating a stale buffer. Any
/// successful block resets the count. `silence_after == 0` never silences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Consecutive failures before outputs are forced to silence.
    pub silence_after: u32,
}

impl FailurePolicy {
    /// Keeps stale output forever.
    pub const RETAIN: Self = Self { silence_after: 0 };

    /// Returns true if a node with `consecutive` failures should be silenced.
    #[inline]
    pub fn should_silence(self, consecutive: u32) -> bool {
        self.silence_after != 0 && consecutive >= self.silence_after
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            silence_after: DEFAULT_SILENCE_AFTER,
        }
    }
}

/// Which external block feeds the spectrum listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpectrumSource {
    /// The block handed to `process` as input.
    Input,
    /// The block written back as output.
    #[default]
    Output,
}

/// Settings for a [`Graph`](crate::Graph).
#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
    /// Sample rate passed to `prepare`, in Hz.
    pub sample_rate: f32,
    /// Largest block the graph is prepared for.
    pub max_frames: usize,
    /// Dispatch independent nodes of a level on the worker pool.
    pub parallel: bool,
    /// Worker threads; `0` picks hardware threads minus one.
    pub worker_threads: usize,
    /// Hold window of every node's clip indicator.
    pub clip_hold: Duration,
    /// Floor for the input/output level meters, in dB.
    pub meter_floor_db: f32,
    /// Treatment of repeatedly failing nodes.
    pub failure_policy: FailurePolicy,
    /// Tap analysed by the spectrum listener.
    pub spectrum_source: SpectrumSource,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_frames: 512,
            parallel: false,
            worker_threads: 0,
            clip_hold: DEFAULT_CLIP_HOLD,
            meter_floor_db: DEFAULT_METER_FLOOR_DB,
            failure_policy: FailurePolicy::default(),
            spectrum_source: SpectrumSource::default(),
        }
    }
}
