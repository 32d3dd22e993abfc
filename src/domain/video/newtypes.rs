// SPDX-License-Identifier: MPL-2.0
//! Video playback newtypes.
//!
//! This module provides type-safe wrappers for video playback values,
//! ensuring they are always within valid ranges.

use std::time::Duration;

// =============================================================================
// PlaybackSpeed
// =============================================================================

/// Playback speed bounds (0.25x to 4.0x).
pub mod speed_bounds {
    /// Minimum playback speed (0.25x = four times slower).
    pub const MIN: f64 = 0.25;
    /// Maximum playback speed (4x = four times faster).
    pub const MAX: f64 = 4.0;
    /// Default playback speed (1.0 = normal speed).
    pub const DEFAULT: f64 = 1.0;
}

/// Playback speed value, guaranteed to be within valid range (0.25x - 4.0x).
///
/// This newtype enforces validity at the type level, making it impossible
/// to create an invalid playback speed value. Non-finite input falls back
/// to normal speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    /// Creates a new playback speed, clamping to valid range.
    #[must_use]
    pub fn new(speed: f64) -> Self {
        if speed.is_nan() {
            return Self::default();
        }
        Self(speed.clamp(speed_bounds::MIN, speed_bounds::MAX))
    }

    /// Returns the speed value as f64.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns true if this is normal (1.0x) speed.
    #[must_use]
    pub fn is_normal(self) -> bool {
        (self.0 - speed_bounds::DEFAULT).abs() < 0.001
    }

    /// Scales a wall-clock duration into media time at this speed.
    #[must_use]
    pub fn scale_elapsed(self, wall: Duration) -> f64 {
        wall.as_secs_f64() * self.0
    }

    /// Divides a base delay by this speed.
    ///
    /// Used for decode-side throttling: faster playback sleeps less.
    #[must_use]
    pub fn divide(self, base: Duration) -> Duration {
        base.div_f64(self.0)
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(speed_bounds::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_speed_clamps_to_valid_range() {
        assert_eq!(PlaybackSpeed::new(10.0).value(), speed_bounds::MAX);
        assert_eq!(PlaybackSpeed::new(0.01).value(), speed_bounds::MIN);
        assert_eq!(PlaybackSpeed::new(-3.0).value(), speed_bounds::MIN);
        assert_eq!(PlaybackSpeed::new(f64::INFINITY).value(), speed_bounds::MAX);
    }

    #[test]
    fn playback_speed_nan_falls_back_to_default() {
        assert_eq!(PlaybackSpeed::new(f64::NAN), PlaybackSpeed::default());
    }

    #[test]
    fn playback_speed_accepts_values_in_range() {
        assert_eq!(PlaybackSpeed::new(1.5).value(), 1.5);
        assert!(PlaybackSpeed::new(1.0).is_normal());
        assert!(!PlaybackSpeed::new(1.5).is_normal());
    }

    #[test]
    fn divide_shortens_delay_at_higher_speed() {
        let base = Duration::from_millis(10);
        assert_eq!(PlaybackSpeed::new(2.0).divide(base), Duration::from_millis(5));
        assert_eq!(PlaybackSpeed::new(0.5).divide(base), Duration::from_millis(20));
    }

    #[test]
    fn scale_elapsed_applies_speed_factor() {
        let speed = PlaybackSpeed::new(2.0);
        let media = speed.scale_elapsed(Duration::from_millis(500));
        assert!((media - 1.0).abs() < 1e-9);
    }
}
