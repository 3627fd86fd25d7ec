//! Multi-input mixer with per-channel level, pan and mute.
//!
//! Each mono input `ch` contributes `x · gainL` to the left and `x · gainR` to
//! the right output channel:
//!
//! | mode | `gainL` | `gainR` |
//! |---|---|---|
//! | [`MixerMode::Mono`] | `level · cos(π/4)` | `level · cos(π/4)` |
//! | [`MixerMode::Stereo`] | `level · cos(θ)` | `level · sin(θ)` |
//!
//! with `θ = (pan + 1) · π/4`. Muted channels contribute nothing. The summed
//! bus is scaled by the master level.

use core::f32::consts::FRAC_PI_4;

use crate::error::NodeError;
use crate::math::constant_power_pan;
use crate::node::{NodeCategory, NodeCore, NodeId, ProcessingNode, SignalBehavior};
use crate::port::SignalType;

/// Fewest inputs a mixer can have.
pub const MIN_MIXER_INPUTS: usize = 2;

/// Most inputs a mixer can have.
pub const MAX_MIXER_INPUTS: usize = 8;

/// Largest channel or master level.
const MAX_LEVEL: f32 = 2.0;

/// Mixing law.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MixerMode {
    /// Pan ignored; every channel lands equally on both sides.
    Mono,
    /// Constant-power panning.
    #[default]
    Stereo,
}

/// Settings of one mixer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixerChannel {
    /// Linear level in `[0, 2]`.
    pub level: f32,
    /// Pan in `[-1, 1]`, left to right.
    pub pan: f32,
    /// Silences the channel.
    pub mute: bool,
}

impl Default for MixerChannel {
    fn default() -> Self {
        Self {
            level: 1.0,
            pan: 0.0,
            mute: false,
        }
    }
}

/// Sums 2–8 mono inputs into one stereo output.
#[derive(Debug)]
pub struct Mixer {
    core: NodeCore,
    channels: Vec<MixerChannel>,
    master: f32,
    mode: MixerMode,
}

impl Mixer {
    /// Creates a stereo-mode mixer; `inputs` is clamped to
    /// [`MIN_MIXER_INPUTS`]..=[`MAX_MIXER_INPUTS`].
    ///
    /// Inputs are named `"in1"`, `"in2"`, ...; the output is `"out"`.
    pub fn new(id: impl Into<NodeId>, inputs: usize) -> Self {
        let inputs = inputs.clamp(MIN_MIXER_INPUTS, MAX_MIXER_INPUTS);
        let mut core = NodeCore::new(id, "Mixer", NodeCategory::Mixer);
        for i in 1..=inputs {
            core.add_input(format!("in{i}"), SignalType::Mono);
        }
        core.add_output("out", SignalType::Stereo);
        Self {
            core,
            channels: vec![MixerChannel::default(); inputs],
            master: 1.0,
            mode: MixerMode::default(),
        }
    }

    /// Builder form of [`set_mode`](Self::set_mode).
    pub fn with_mode(mut self, mode: MixerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.channels.len()
    }

    /// Mixing law.
    pub fn mode(&self) -> MixerMode {
        self.mode
    }

    /// Changes the mixing law.
    pub fn set_mode(&mut self, mode: MixerMode) {
        self.mode = mode;
    }

    /// Settings of input `channel`.
    pub fn channel(&self, channel: usize) -> Option<&MixerChannel> {
        self.channels.get(channel)
    }

    /// Sets a channel level, clamped to `[0, 2]`. Out-of-range channels are ignored.
    pub fn set_level(&mut self, channel: usize, level: f32) {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.level = level.clamp(0.0, MAX_LEVEL);
        }
    }

    /// Sets a channel pan, clamped to `[-1, 1]`.
    pub fn set_pan(&mut self, channel: usize, pan: f32) {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.pan = pan.clamp(-1.0, 1.0);
        }
    }

    /// Mutes or unmutes a channel.
    pub fn set_mute(&mut self, channel: usize, mute: bool) {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.mute = mute;
        }
    }

    /// Master level.
    pub fn master(&self) -> f32 {
        self.master
    }

    /// Sets the master level, clamped to `[0, 2]`.
    pub fn set_master(&mut self, level: f32) {
        self.master = level.clamp(0.0, MAX_LEVEL);
    }

    /// `(left, right)` gains applied to input `channel`, before the master.
    ///
    /// `(0, 0)` for muted or nonexistent channels.
    pub fn channel_gains(&self, channel: usize) -> (f32, f32) {
        let Some(ch) = self.channels.get(channel) else {
            return (0.0, 0.0);
        };
        if ch.mute {
            return (0.0, 0.0);
        }
        match self.mode {
            MixerMode::Mono => {
                let g = ch.level * FRAC_PI_4.cos();
                (g, g)
            }
            MixerMode::Stereo => {
                let (l, r) = constant_power_pan(ch.pan);
                (ch.level * l, ch.level * r)
            }
        }
    }
}

impl ProcessingNode for Mixer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn process(&mut self, frames: usize) -> Result<(), NodeError> {
        if self.core.is_bypassed() {
            self.core.pass_through(frames);
            return Ok(());
        }

        let gains: [(f32, f32); MAX_MIXER_INPUTS] =
            core::array::from_fn(|ch| self.channel_gains(ch));
        let master = self.master;
        let (inputs, outputs) = self.core.io_mut();
        let Some(out) = outputs.first_mut() else {
            return Err(NodeError::Processing("mixer has no output".into()));
        };

        let bus = out.samples_mut(frames);
        bus.fill(0.0);
        for (input, &(gl, gr)) in inputs.iter().zip(&gains) {
            if gl == 0.0 && gr == 0.0 {
                continue;
            }
            for (frame, &x) in bus.chunks_exact_mut(2).zip(input.samples(frames)) {
                frame[0] += x * gl;
                frame[1] += x * gr;
            }
        }
        for s in bus.iter_mut() {
            *s *= master;
        }
        Ok(())
    }

    fn signal_behavior(&self) -> SignalBehavior {
        match self.mode {
            MixerMode::Mono => SignalBehavior::Configured(SignalType::Mono),
            MixerMode::Stereo => SignalBehavior::Configured(SignalType::Stereo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(mixer: &mut Mixer, values: &[f32], frames: usize) {
        mixer.prepare(48000.0, frames);
        for (i, &v) in values.iter().enumerate() {
            mixer.core_mut().input_mut(i).unwrap().buffer_mut().fill(v);
        }
    }

    #[test]
    fn test_inputs_clamped() {
        assert_eq!(Mixer::new("m", 1).input_count(), 2);
        assert_eq!(Mixer::new("m", 12).input_count(), 8);
        assert_eq!(Mixer::new("m", 4).core().inputs().len(), 4);
    }

    #[test]
    fn test_stereo_centre_is_equal_power() {
        let mixer = Mixer::new("m", 2);
        let (l, r) = mixer.channel_gains(0);
        assert!((l - FRAC_PI_4.cos()).abs() < 1e-6);
        assert!((r - FRAC_PI_4.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_mono_mode_ignores_pan() {
        let mut mixer = Mixer::new("m", 2).with_mode(MixerMode::Mono);
        mixer.set_pan(0, -1.0);
        mixer.set_level(0, 2.0);
        let (l, r) = mixer.channel_gains(0);
        assert_eq!(l, r);
        assert!((l - 2.0 * FRAC_PI_4.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_hard_pan() {
        let mut mixer = Mixer::new("m", 2);
        mixer.set_pan(1, 1.0);
        let (l, r) = mixer.channel_gains(1);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mute_contributes_nothing() {
        let mut mixer = Mixer::new("m", 2);
        mixer.set_pan(0, -1.0);
        mixer.set_pan(1, 1.0);
        mixer.set_mute(1, true);
        feed(&mut mixer, &[0.5, 0.9], 4);
        mixer.process(4).unwrap();
        let out = mixer.core().output(0).unwrap().buffer();
        for frame in out.chunks_exact(2) {
            assert!((frame[0] - 0.5).abs() < 1e-6);
            assert!(frame[1].abs() < 1e-6);
        }
    }

    #[test]
    fn test_master_applied_after_sum() {
        let mut mixer = Mixer::new("m", 2).with_mode(MixerMode::Mono);
        mixer.set_master(0.5);
        feed(&mut mixer, &[1.0, 1.0], 2);
        mixer.process(2).unwrap();
        let expected = 2.0 * FRAC_PI_4.cos() * 0.5;
        for &s in mixer.core().output(0).unwrap().buffer() {
            assert!((s - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_signal_behavior_follows_mode() {
        let mut mixer = Mixer::new("m", 2);
        assert_eq!(
            mixer.signal_behavior(),
            SignalBehavior::Configured(SignalType::Stereo)
        );
        mixer.set_mode(MixerMode::Mono);
        assert_eq!(
            mixer.signal_behavior(),
            SignalBehavior::Configured(SignalType::Mono)
        );
    }
}
