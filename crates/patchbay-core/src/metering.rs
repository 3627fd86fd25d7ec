//! Input/output level meters shared with other threads.
//!
//! The processing thread stores each block's RMS level; readers (UI, CLI
//! progress output) load it through a cloned [`MeterHandle`] without locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
struct Levels {
    input_db: AtomicU32,
    output_db: AtomicU32,
}

/// Cloneable, lock-free view of the latest input and output levels in dB.
#[derive(Clone, Debug)]
pub struct MeterHandle {
    levels: Arc<Levels>,
}

impl MeterHandle {
    /// Creates meters reading `floor_db` on both taps.
    pub fn new(floor_db: f32) -> Self {
        Self {
            levels: Arc::new(Levels {
                input_db: AtomicU32::new(floor_db.to_bits()),
                output_db: AtomicU32::new(floor_db.to_bits()),
            }),
        }
    }

    /// Latest input-tap level in dB.
    pub fn input_db(&self) -> f32 {
        f32::from_bits(self.levels.input_db.load(Ordering::Relaxed))
    }

    /// Latest output-tap level in dB.
    pub fn output_db(&self) -> f32 {
        f32::from_bits(self.levels.output_db.load(Ordering::Relaxed))
    }

    pub(crate) fn store(&self, input_db: f32, output_db: f32) {
        self.levels
            .input_db
            .store(input_db.to_bits(), Ordering::Relaxed);
        self.levels
            .output_db
            .store(output_db.to_bits(), Ordering::Relaxed);
    }
}
