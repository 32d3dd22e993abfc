// SPDX-License-Identifier: MPL-2.0
//! Time unit conversion utilities for video playback.
//!
//! Provides conversion functions between seconds and the units FFmpeg uses:
//! - `AV_TIME_BASE` microseconds for container-level seeks
//! - Stream time base ticks for presentation timestamps
//!
//! # Constants
//!
//! - `MICROS_PER_SECOND`: 1,000,000 (f64 for calculations)

/// Microseconds per second as f64 for calculations.
///
/// Equal to `AV_TIME_BASE`, the unit of container-level timestamps.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Converts seconds to a container timestamp in `AV_TIME_BASE` units.
///
/// # Examples
///
/// ```
/// use paced_player::video_player::time_units::secs_to_av_time;
///
/// assert_eq!(secs_to_av_time(1.0), 1_000_000);
/// assert_eq!(secs_to_av_time(0.5), 500_000);
/// ```
#[inline]
pub fn secs_to_av_time(secs: f64) -> i64 {
    (secs * MICROS_PER_SECOND) as i64
}

/// Converts a container timestamp in `AV_TIME_BASE` units to seconds.
///
/// # Examples
///
/// ```
/// use paced_player::video_player::time_units::av_time_to_secs;
///
/// assert_eq!(av_time_to_secs(1_000_000), 1.0);
/// assert_eq!(av_time_to_secs(500_000), 0.5);
/// ```
#[inline]
pub fn av_time_to_secs(ts: i64) -> f64 {
    ts as f64 / MICROS_PER_SECOND
}

/// Converts a stream presentation timestamp to seconds.
///
/// A missing timestamp maps to 0. A degenerate time base also maps to 0.
///
/// # Examples
///
/// ```
/// use paced_player::video_player::time_units::pts_to_secs;
///
/// assert_eq!(pts_to_secs(Some(50), 1, 25), 2.0);
/// assert_eq!(pts_to_secs(None, 1, 25), 0.0);
/// ```
#[inline]
pub fn pts_to_secs(pts: Option<i64>, numerator: i32, denominator: i32) -> f64 {
    match pts {
        Some(ticks) if denominator != 0 => {
            ticks as f64 * f64::from(numerator) / f64::from(denominator)
        }
        _ => 0.0,
    }
}

/// Encodes seconds for storage in an `AtomicU64`.
#[inline]
pub(crate) fn secs_to_bits(secs: f64) -> u64 {
    secs.to_bits()
}

/// Decodes seconds stored with [`secs_to_bits`].
#[inline]
pub(crate) fn bits_to_secs(bits: u64) -> f64 {
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_to_av_time_converts_correctly() {
        assert_eq!(secs_to_av_time(1.0), 1_000_000);
        assert_eq!(secs_to_av_time(0.5), 500_000);
        assert_eq!(secs_to_av_time(0.0), 0);
        assert_eq!(secs_to_av_time(2.5), 2_500_000);
    }

    #[test]
    fn av_time_to_secs_converts_correctly() {
        assert_eq!(av_time_to_secs(1_000_000), 1.0);
        assert_eq!(av_time_to_secs(500_000), 0.5);
        assert_eq!(av_time_to_secs(0), 0.0);
    }

    #[test]
    fn av_time_round_trip_preserves_value_within_microsecond() {
        let secs = 1.234567;
        let back = av_time_to_secs(secs_to_av_time(secs));
        assert!((secs - back).abs() < 0.000001);
    }

    #[test]
    fn pts_to_secs_applies_time_base() {
        assert_eq!(pts_to_secs(Some(90_000), 1, 90_000), 1.0);
        assert_eq!(pts_to_secs(Some(1001), 1001, 30_000), 1001.0 * 1001.0 / 30_000.0);
        assert_eq!(pts_to_secs(Some(0), 1, 1000), 0.0);
    }

    #[test]
    fn pts_to_secs_handles_missing_values() {
        assert_eq!(pts_to_secs(None, 1, 1000), 0.0);
        assert_eq!(pts_to_secs(Some(42), 1, 0), 0.0);
    }

    #[test]
    fn bits_round_trip_is_exact() {
        for secs in [0.0, 0.04, 9.96, 12345.678] {
            assert_eq!(bits_to_secs(secs_to_bits(secs)), secs);
        }
    }

    #[test]
    fn micros_per_second_constant() {
        assert_eq!(MICROS_PER_SECOND, f64::from(ffmpeg_next::ffi::AV_TIME_BASE));
    }

    #[test]
    fn handles_large_durations() {
        // 24 hours in seconds
        let day_secs = 24.0 * 60.0 * 60.0;
        assert_eq!(secs_to_av_time(day_secs), 86_400_000_000);
        assert_eq!(av_time_to_secs(86_400_000_000), day_secs);
    }
}
