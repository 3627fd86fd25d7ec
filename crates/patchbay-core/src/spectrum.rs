//! Running spectrum analysis of a tap.
//!
//! [`SpectrumTap`] accumulates mono samples (stereo is averaged) into a
//! [`SPECTRUM_SIZE`]-sample frame. Each time the frame fills it is Hann
//! windowed, transformed, reduced to the magnitudes of the first
//! `SPECTRUM_SIZE / 2` bins, normalised to the window's peak magnitude and
//! handed to the caller. Frames do not overlap.
//!
//! The window's peak magnitude is the response of a full-scale sine centred
//! on a bin (`Σw / 2`), so levels stay absolute: a full-scale sine reads 1.0
//! at its bin and a sine at amplitude 0.001 reads 0.001. Readings are clamped
//! to `[0, 1]`.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::port::SignalType;

/// Analysis frame length in samples.
pub const SPECTRUM_SIZE: usize = 2048;

/// Number of magnitude bins delivered per frame.
pub const SPECTRUM_BINS: usize = SPECTRUM_SIZE / 2;

/// Bin magnitude of a full-scale sine under a Hann window of
/// [`SPECTRUM_SIZE`] samples.
const WINDOW_PEAK: f32 = SPECTRUM_SIZE as f32 / 4.0;

/// Fixed-size FFT accumulator.
pub struct SpectrumTap {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    filled: usize,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumTap {
    /// Plans the transform and allocates every buffer up front.
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(SPECTRUM_SIZE);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let window = (0..SPECTRUM_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / SPECTRUM_SIZE as f32).cos()))
            .collect();
        Self {
            fft,
            window,
            frame: vec![0.0; SPECTRUM_SIZE],
            filled: 0,
            spectrum: vec![Complex::new(0.0, 0.0); SPECTRUM_SIZE],
            scratch,
            magnitudes: vec![0.0; SPECTRUM_BINS],
        }
    }

    /// Samples collected towards the next frame.
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Drops any partially collected frame.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Feeds one interleaved block.
    ///
    /// `on_frame` runs synchronously once per completed frame with
    /// [`SPECTRUM_BINS`] normalised magnitudes.
    pub fn push(
        &mut self,
        samples: &[f32],
        signal_type: SignalType,
        mut on_frame: impl FnMut(&[f32]),
    ) {
        let channels = signal_type.channels();
        for frame in samples.chunks_exact(channels) {
            let mono = if channels == 2 {
                (frame[0] + frame[1]) * 0.5
            } else {
                frame[0]
            };
            self.frame[self.filled] = mono;
            self.filled += 1;
            if self.filled == SPECTRUM_SIZE {
                self.analyze();
                on_frame(&self.magnitudes);
                self.filled = 0;
            }
        }
    }

    fn analyze(&mut self) {
        for ((bin, &x), &w) in self.spectrum.iter_mut().zip(&self.frame).zip(&self.window) {
            *bin = Complex::new(x * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        for (mag, bin) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *mag = (bin.norm() / WINDOW_PEAK).min(1.0);
        }
    }
}

impl Default for SpectrumTap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpectrumTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumTap")
            .field("filled", &self.filled)
            .finish_non_exhaustive()
    }
}
