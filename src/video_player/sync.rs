// SPDX-License-Identifier: MPL-2.0
//! Presentation pacing for video playback.
//!
//! The playback clock maps wall time to media time at the current speed.
//! Video is the only stream, so the clock is anchored to frame timestamps
//! rather than to an audio position.
//!
//! # Pacing Strategy
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Frame Queue │────▶│ head pts     │────▶│ PlaybackClock │──▶ Present / Wait / Resync
//! └─────────────┘     └──────────────┘     └───────────────┘
//!                                                 ▲
//!                                       wall time × speed
//! ```
//!
//! The first frame after play or seek anchors the clock. Frames that are far
//! off the clock in either direction re-anchor it instead of stalling or
//! racing the display. Frames are never dropped by the pacer.

use crate::config::{PRESENT_TOLERANCE_SECS, RESYNC_EARLY_SECS, RESYNC_LATE_SECS};
use crate::domain::video::PlaybackSpeed;
use std::time::Instant;

/// What the presentation pump should do with the head frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncAction {
    /// Display the frame now.
    Present,

    /// Leave the frame queued; it is not due yet.
    Wait,

    /// Display the frame now and re-anchor the clock to its timestamp.
    Resync,
}

impl SyncAction {
    /// Returns true if the frame should leave the queue.
    #[must_use]
    pub fn presents(self) -> bool {
        matches!(self, SyncAction::Present | SyncAction::Resync)
    }
}

/// Calculates the pacing action for a frame `diff_secs` ahead of the clock.
///
/// Negative values mean the frame is late.
#[must_use]
pub fn calculate_sync_action(diff_secs: f64) -> SyncAction {
    if diff_secs > RESYNC_EARLY_SECS || diff_secs < -RESYNC_LATE_SECS {
        SyncAction::Resync
    } else if diff_secs > PRESENT_TOLERANCE_SECS {
        SyncAction::Wait
    } else {
        SyncAction::Present
    }
}

/// Media-time clock driven by wall time and the playback speed.
///
/// Owned by the consumer; every method takes the current instant so callers
/// sample `Instant::now()` once per tick.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Wall instant and media time of the last anchor. `None` until the
    /// first frame after play or seek.
    anchor: Option<(Instant, f64)>,
    speed: PlaybackSpeed,
    /// Wall instant of the last presented frame (frame-interval pacing).
    last_present: Option<Instant>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(PlaybackSpeed::default())
    }
}

impl PlaybackClock {
    #[must_use]
    pub fn new(speed: PlaybackSpeed) -> Self {
        Self {
            anchor: None,
            speed,
            last_present: None,
        }
    }

    /// Forgets the anchor. The next paced frame re-anchors the clock.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.last_present = None;
    }

    /// Pins media time `pts_secs` to wall instant `now`.
    pub fn anchor(&mut self, pts_secs: f64, now: Instant) {
        self.anchor = Some((now, pts_secs));
    }

    /// Changes the rate without a jump in media time.
    pub fn set_speed(&mut self, speed: PlaybackSpeed, now: Instant) {
        if let Some(position) = self.media_time(now) {
            self.anchor = Some((now, position));
        }
        self.speed = speed;
    }

    /// Current media time, if anchored.
    #[must_use]
    pub fn media_time(&self, now: Instant) -> Option<f64> {
        self.anchor.map(|(wall, pts)| {
            pts + self
                .speed
                .scale_elapsed(now.saturating_duration_since(wall))
        })
    }

    /// Decides whether a frame with timestamp `pts_secs` is due.
    ///
    /// Anchors the clock on the first frame and on resync.
    pub fn pace(&mut self, pts_secs: f64, now: Instant) -> SyncAction {
        let Some(clock) = self.media_time(now) else {
            self.anchor(pts_secs, now);
            return SyncAction::Present;
        };
        let action = calculate_sync_action(pts_secs - clock);
        if action == SyncAction::Resync {
            log::debug!(
                "Re-anchoring playback clock: frame {:.3}s, clock {:.3}s",
                pts_secs,
                clock
            );
            self.anchor(pts_secs, now);
        }
        action
    }

    /// Returns true if a full frame interval has elapsed since the last
    /// presented frame, at the current speed.
    #[must_use]
    pub fn interval_elapsed(&self, fps: f64, now: Instant) -> bool {
        let Some(last) = self.last_present else {
            return true;
        };
        let interval = 1.0 / fps / self.speed.value();
        now.saturating_duration_since(last).as_secs_f64() >= interval
    }

    /// Records that a frame was handed to the sink at `now`.
    pub fn mark_presented(&mut self, now: Instant) {
        self.last_present = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_abs_diff_eq;
    use std::time::Duration;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn unanchored_clock_presents_and_anchors() {
        let mut clock = PlaybackClock::default();
        let now = Instant::now();
        assert!(clock.media_time(now).is_none());

        assert_eq!(clock.pace(3.0, now), SyncAction::Present);
        assert_abs_diff_eq!(clock.media_time(now).unwrap_or_default(), 3.0);
    }

    #[test]
    fn early_frame_waits() {
        let mut clock = PlaybackClock::default();
        let start = Instant::now();
        clock.anchor(0.0, start);

        assert_eq!(clock.pace(0.04, start + ms(10)), SyncAction::Wait);
    }

    #[test]
    fn due_frame_presents_within_tolerance() {
        let mut clock = PlaybackClock::default();
        let start = Instant::now();
        clock.anchor(0.0, start);

        assert_eq!(clock.pace(0.04, start + ms(37)), SyncAction::Present);
        assert_eq!(clock.pace(0.08, start + ms(100)), SyncAction::Present);
    }

    #[test]
    fn very_late_frame_resyncs() {
        let mut clock = PlaybackClock::default();
        let start = Instant::now();
        clock.anchor(0.0, start);

        let now = start + ms(1000);
        assert_eq!(clock.pace(0.5, now), SyncAction::Resync);
        assert_abs_diff_eq!(clock.media_time(now).unwrap_or_default(), 0.5);
    }

    #[test]
    fn timestamp_discontinuity_resyncs() {
        let mut clock = PlaybackClock::default();
        let start = Instant::now();
        clock.anchor(1.0, start);

        assert_eq!(clock.pace(60.0, start + ms(40)), SyncAction::Resync);
    }

    #[test]
    fn speed_scales_media_time() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(PlaybackSpeed::new(2.0));
        clock.anchor(10.0, start);

        let media = clock.media_time(start + ms(500)).unwrap_or_default();
        assert_abs_diff_eq!(media, 11.0, epsilon = 1e-9);
    }

    #[test]
    fn set_speed_keeps_position_continuous() {
        let start = Instant::now();
        let mut clock = PlaybackClock::default();
        clock.anchor(0.0, start);

        let switch = start + ms(1000);
        clock.set_speed(PlaybackSpeed::new(0.5), switch);
        assert_abs_diff_eq!(clock.media_time(switch).unwrap_or_default(), 1.0, epsilon = 1e-9);

        let later = switch + ms(1000);
        assert_abs_diff_eq!(clock.media_time(later).unwrap_or_default(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn sync_action_thresholds() {
        assert_eq!(calculate_sync_action(0.004), SyncAction::Present);
        assert_eq!(calculate_sync_action(-0.2), SyncAction::Present);
        assert_eq!(calculate_sync_action(0.2), SyncAction::Wait);
        assert_eq!(calculate_sync_action(-0.3), SyncAction::Resync);
        assert_eq!(calculate_sync_action(2.5), SyncAction::Resync);
    }

    #[test]
    fn reset_forgets_anchor() {
        let mut clock = PlaybackClock::default();
        let now = Instant::now();
        clock.anchor(5.0, now);
        clock.mark_presented(now);

        clock.reset();
        assert!(clock.media_time(now).is_none());
        assert!(clock.interval_elapsed(25.0, now));
    }

    #[test]
    fn interval_pacing_waits_one_frame() {
        let mut clock = PlaybackClock::default();
        let start = Instant::now();
        assert!(clock.interval_elapsed(25.0, start));

        clock.mark_presented(start);
        assert!(!clock.interval_elapsed(25.0, start + ms(20)));
        assert!(clock.interval_elapsed(25.0, start + ms(41)));
    }

    #[test]
    fn interval_pacing_shrinks_with_speed() {
        let mut clock = PlaybackClock::new(PlaybackSpeed::new(4.0));
        let start = Instant::now();
        clock.mark_presented(start);

        assert!(clock.interval_elapsed(25.0, start + ms(11)));
    }

    #[test]
    fn presents_covers_present_and_resync() {
        assert!(SyncAction::Present.presents());
        assert!(SyncAction::Resync.presents());
        assert!(!SyncAction::Wait.presents());
    }
}
