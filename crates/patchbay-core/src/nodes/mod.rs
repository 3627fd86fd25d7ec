//! Built-in nodes.
//!
//! | node | category | ports | signal behavior |
//! |---|---|---|---|
//! | [`AudioInputNode`] | source | 1 out | fixed |
//! | [`AudioOutputNode`] | sink | 1 in | fixed |
//! | [`GainNode`] | utility | 1 in, 1 out | max of inputs |
//! | [`Mixer`] | mixer | 2–8 mono in, 1 stereo out | configured |
//! | [`Splitter`] | splitter | 1 mono in, 2–8 mono out | pass-through |

mod gain;
mod io;
mod mixer;
mod splitter;

pub use gain::{GAIN_MAX_DB, GAIN_MIN_DB, GainNode};
pub use io::{AudioInputNode, AudioOutputNode};
pub use mixer::{MAX_MIXER_INPUTS, MIN_MIXER_INPUTS, Mixer, MixerChannel, MixerMode};
pub use splitter::{MAX_SPLITTER_OUTPUTS, MIN_SPLITTER_OUTPUTS, Splitter};
