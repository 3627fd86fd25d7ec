//! Clip detection with a hold window.
//!
//! Peaks above full scale are short and bursty; an indicator that only
//! reflected the current block would flicker. [`ClipIndicator`] records the
//! time of the latest over and reports clipping until the hold window has
//! elapsed.

use std::time::{Duration, Instant};

/// Default time a clip stays visible after the most recent over.
pub const DEFAULT_CLIP_HOLD: Duration = Duration::from_millis(500);

/// Absolute sample value above which a sample counts as clipped.
pub const CLIP_THRESHOLD: f32 = 1.0;

/// Latched clip flag with automatic release.
#[derive(Debug, Clone)]
pub struct ClipIndicator {
    last_clip: Option<Instant>,
    hold: Duration,
}

impl ClipIndicator {
    /// Creates an indicator with the given hold window.
    pub fn new(hold: Duration) -> Self {
        Self {
            last_clip: None,
            hold,
        }
    }

    /// Hold window.
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Changes the hold window.
    pub fn set_hold(&mut self, hold: Duration) {
        self.hold = hold;
    }

    /// Scans `samples` and records `now` if any exceeds full scale.
    ///
    /// Returns true if this block clipped.
    pub fn scan_at(&mut self, samples: &[f32], now: Instant) -> bool {
        let clipped = samples.iter().any(|s| s.abs() > CLIP_THRESHOLD);
        if clipped {
            self.last_clip = Some(now);
        }
        clipped
    }

    /// Scans `samples` against the current time.
    pub fn scan(&mut self, samples: &[f32]) -> bool {
        self.scan_at(samples, Instant::now())
    }

    /// Time of the most recent over, if any.
    pub fn last_clip(&self) -> Option<Instant> {
        self.last_clip
    }

    /// Returns true if the most recent over is within the hold window of `now`.
    pub fn is_clipping_at(&self, now: Instant) -> bool {
        self.last_clip
            .is_some_and(|t| now.saturating_duration_since(t) < self.hold)
    }

    /// Returns true if the most recent over is within the hold window.
    pub fn is_clipping(&self) -> bool {
        self.is_clipping_at(Instant::now())
    }

    /// Forgets any recorded over.
    pub fn clear(&mut self) {
        self.last_clip = None;
    }
}

impl Default for ClipIndicator {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_HOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_is_not_a_clip() {
        let mut clip = ClipIndicator::default();
        assert!(!clip.scan(&[1.0, -1.0, 0.3]));
        assert!(!clip.is_clipping());
    }

    #[test]
    fn test_over_latches_for_hold_window() {
        let mut clip = ClipIndicator::new(Duration::from_millis(500));
        let t0 = Instant::now();
        assert!(clip.scan_at(&[0.0, -1.2], t0));
        assert!(clip.is_clipping_at(t0 + Duration::from_millis(499)));
        assert!(!clip.is_clipping_at(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_new_over_extends_hold() {
        let mut clip = ClipIndicator::new(Duration::from_millis(100));
        let t0 = Instant::now();
        clip.scan_at(&[2.0], t0);
        clip.scan_at(&[2.0], t0 + Duration::from_millis(80));
        assert!(clip.is_clipping_at(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_clean_block_does_not_clear() {
        let mut clip = ClipIndicator::new(Duration::from_millis(100));
        let t0 = Instant::now();
        clip.scan_at(&[1.5], t0);
        clip.scan_at(&[0.1], t0 + Duration::from_millis(10));
        assert!(clip.is_clipping_at(t0 + Duration::from_millis(20)));
    }
}
