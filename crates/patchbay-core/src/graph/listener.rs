//! Push-style observers invoked on the processing thread.
//!
//! Listeners run synchronously inside [`Graph::process`](crate::Graph::process)
//! and must not block. Closures with a matching signature implement the
//! traits directly.

use crate::port::SignalType;

/// Receives the raw interleaved audio of the input or output tap each block.
pub trait AudioTapListener: Send {
    /// Called once per block.
    fn on_audio(&mut self, samples: &[f32], signal_type: SignalType);
}

impl<F> AudioTapListener for F
where
    F: FnMut(&[f32], SignalType) + Send,
{
    fn on_audio(&mut self, samples: &[f32], signal_type: SignalType) {
        self(samples, signal_type);
    }
}

/// Receives magnitudes, scaled so a full-scale sine reads 1.0, each time a
/// spectrum frame completes.
pub trait SpectrumListener: Send {
    /// Called with [`SPECTRUM_BINS`](crate::SPECTRUM_BINS) magnitudes in `[0, 1]`.
    fn on_spectrum(&mut self, magnitudes: &[f32]);
}

impl<F> SpectrumListener for F
where
    F: FnMut(&[f32]) + Send,
{
    fn on_spectrum(&mut self, magnitudes: &[f32]) {
        self(magnitudes);
    }
}
