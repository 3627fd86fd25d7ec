//! Level and panning math shared by nodes and instrumentation.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`rms`] / [`rms_db`] - Block level measurement
//!
//! # Panning
//!
//! - [`constant_power_pan`] - `(cos θ, sin θ)` with `θ = (pan + 1)·π/4`

use core::f32::consts::{FRAC_PI_4, LN_10};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use patchbay_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = LN_10 / 20.0;
    (db * FACTOR).exp()
}

/// Convert linear gain to decibels.
///
/// Inputs at or below zero are treated as `1e-10` (-200 dB).
///
/// # Example
/// ```rust
/// use patchbay_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / LN_10;
    linear.max(1e-10).ln() * FACTOR
}

/// Root mean square of `samples`. Zero for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// RMS level of `samples` in dB, never below `floor_db`.
pub fn rms_db(samples: &[f32], floor_db: f32) -> f32 {
    let level = rms(samples);
    if level <= 0.0 {
        return floor_db;
    }
    linear_to_db(level).max(floor_db)
}

/// Constant-power pan gains `(left, right)` for `pan` in `[-1, 1]`.
///
/// `pan` is clamped. Centre yields `cos(π/4)` on both sides.
#[inline]
pub fn constant_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}
