// SPDX-License-Identifier: MPL-2.0
//! Video playback state machine.
//!
//! This module defines the transport states for the video player.

/// Represents the current transport state of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No decode task is running, or it has been torn down.
    #[default]
    Stopped,
    /// Frames are being decoded and presented.
    Playing,
    /// Video is paused at current position.
    Paused,
}

impl PlaybackState {
    /// Returns true if the video is currently playing.
    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// State reached by a pause toggle.
    ///
    /// `Stopped` is left unchanged.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Playing => Self::Paused,
            Self::Paused => Self::Playing,
            Self::Stopped => Self::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
    }

    #[test]
    fn test_state_checks() {
        assert!(PlaybackState::Playing.is_playing());
        assert!(!PlaybackState::Paused.is_playing());
        assert!(!PlaybackState::Stopped.is_playing());
    }

    #[test]
    fn test_toggle_round_trips() {
        assert_eq!(PlaybackState::Playing.toggled(), PlaybackState::Paused);
        assert_eq!(PlaybackState::Paused.toggled(), PlaybackState::Playing);
        assert_eq!(
            PlaybackState::Playing.toggled().toggled(),
            PlaybackState::Playing
        );
    }

    #[test]
    fn test_toggle_from_stopped_is_noop() {
        assert_eq!(PlaybackState::Stopped.toggled(), PlaybackState::Stopped);
    }
}
