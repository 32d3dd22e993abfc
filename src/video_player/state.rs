// SPDX-License-Identifier: MPL-2.0
//! Playback controller for the video player.
//!
//! Manages the lifecycle of video playback with clear state transitions:
//! - Stopped: No frames are presented; the decode thread may be idle or torn down
//! - Playing: Frames are decoded and paced against the playback clock
//! - Paused: Presentation is frozen at the current position
//!
//! The controller is driven by the caller: [`VideoPlayer::update`] must be
//! invoked once per render tick and never blocks.

use super::decoder::DecoderSession;
use super::frame_queue::DecodedFrame;
use super::sink::PresentationSink;
use super::sync::PlaybackClock;
use crate::config::{PacingMode, PlayerConfig};
use crate::domain::video::{PlaybackSpeed, PlaybackState};
use crate::error::{Error, Result, VideoError};
use crate::media::VideoMetadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Video player that manages transport state and frame presentation.
#[derive(Debug)]
pub struct VideoPlayer {
    path: PathBuf,
    config: PlayerConfig,

    /// Current transport state.
    state: PlaybackState,

    speed: PlaybackSpeed,

    /// Media-time clock used for timestamp pacing.
    clock: PlaybackClock,

    /// Running decode thread, `None` after `stop()` or when inert.
    session: Option<DecoderSession>,

    /// Stream properties, `None` for an inert player.
    info: Option<VideoMetadata>,

    /// Timestamp of the last presented frame, or the last seek target.
    current_time: f64,

    /// A seek happened while not playing; the next update presents one frame.
    preview_pending: bool,

    /// Failure raised by the controller itself (open or re-open).
    failure: Option<VideoError>,
}

impl VideoPlayer {
    /// Opens `path` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the container, codec or scaler cannot be set up.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PlayerConfig::default())
    }

    /// Opens `path` and starts a paused decode thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the container, codec or scaler cannot be set up.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PlayerConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = config.sanitized();
        let speed = PlaybackSpeed::new(config.default_speed);
        let session = DecoderSession::spawn(&path, &config, speed)?;
        let info = *session.info();

        Ok(Self {
            path,
            config,
            state: PlaybackState::Stopped,
            speed,
            clock: PlaybackClock::new(speed),
            session: Some(session),
            info: Some(info),
            current_time: 0.0,
            preview_pending: false,
            failure: None,
        })
    }

    /// Opens `path`, or returns an inert player if that fails.
    ///
    /// An inert player reports a zero duration, ignores transport operations
    /// and exposes the open failure through [`health`](Self::health).
    pub fn open_or_inert<P: AsRef<Path>>(path: P, config: PlayerConfig) -> Self {
        let path = path.as_ref();
        match Self::open_with_config(path, config.clone()) {
            Ok(player) => player,
            Err(err) => {
                log::warn!("Playback disabled for {}: {}", path.display(), err);
                let failure = match err {
                    Error::Video(video_err) => video_err,
                    other => VideoError::Open(other.to_string()),
                };
                let config = config.sanitized();
                let speed = PlaybackSpeed::new(config.default_speed);
                Self {
                    path: path.to_path_buf(),
                    config,
                    state: PlaybackState::Stopped,
                    speed,
                    clock: PlaybackClock::new(speed),
                    session: None,
                    info: None,
                    current_time: 0.0,
                    preview_pending: false,
                    failure: Some(failure),
                }
            }
        }
    }

    /// Returns true if opening failed and every operation is a no-op.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.info.is_none()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Returns the current transport state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Starts or resumes playback.
    ///
    /// From `Stopped`, a decode thread torn down by [`stop`](Self::stop) is
    /// re-opened and playback restarts from the beginning.
    pub fn play(&mut self) {
        if self.is_inert() || self.state.is_playing() {
            return;
        }
        let Some(session) = self.ensure_session() else {
            return;
        };
        session.set_playing(true);
        self.clock.reset();
        self.preview_pending = false;
        self.state = PlaybackState::Playing;
        log::debug!("Playing {} from {:.3}s", self.path.display(), self.current_time);
    }

    /// Pauses playback, keeping the current position.
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        if let Some(session) = &self.session {
            session.set_playing(false);
        }
        self.clock.reset();
        self.state = PlaybackState::Paused;
        log::debug!("Paused at {:.3}s", self.current_time);
    }

    /// Toggles between playing and paused. Does nothing when stopped.
    pub fn toggle_pause(&mut self) {
        match self.state.toggled() {
            PlaybackState::Playing => self.play(),
            PlaybackState::Paused => self.pause(),
            PlaybackState::Stopped => {}
        }
    }

    /// Stops playback, joins the decode thread and releases queued frames.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
            log::info!("Stopped playback of {}", self.path.display());
        }
        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
        self.clock.reset();
        self.preview_pending = false;
    }

    /// Seeks to `target_secs`, clamped to the stream duration.
    ///
    /// Queued frames are dropped immediately; no frame decoded before the
    /// seek is presented afterwards. While not playing, one frame at the
    /// target is decoded and shown by the next [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`VideoError::Seek`] for a non-finite target and
    /// [`VideoError::SessionClosed`] if the player is inert or its decode
    /// thread has exited.
    pub fn seek(&mut self, target_secs: f64) -> Result<()> {
        if self.is_inert() {
            return Err(VideoError::SessionClosed.into());
        }
        if !target_secs.is_finite() {
            return Err(VideoError::Seek(format!("Invalid seek target: {target_secs}")).into());
        }

        let target = self.clamp_to_duration(target_secs);
        let session = self.ensure_session().ok_or(VideoError::SessionClosed)?;
        session.seek(target)?;

        self.clock.reset();
        self.current_time = target;
        self.preview_pending = !self.state.is_playing();
        log::debug!("Seek to {:.3}s requested", target);
        Ok(())
    }

    /// Sets the playback speed, clamped to the supported range.
    pub fn set_playback_speed(&mut self, speed: f64) {
        self.speed = PlaybackSpeed::new(speed);
        self.clock.set_speed(self.speed, Instant::now());
        if let Some(session) = &self.session {
            if let Err(err) = session.set_speed(self.speed) {
                log::debug!("Speed change not delivered: {}", err);
            }
        }
    }

    #[must_use]
    pub fn playback_speed(&self) -> f64 {
        self.speed.value()
    }

    /// Stream duration in seconds, 0 when unknown or inert.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.info.map_or(0.0, |info| info.duration_secs)
    }

    /// Timestamp of the last presented frame, or of the last seek target.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Timestamp of the most recently decoded frame.
    #[must_use]
    pub fn decoded_time(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(self.current_time, |s| s.shared().decoded_secs())
    }

    #[must_use]
    pub fn video_info(&self) -> Option<&VideoMetadata> {
        self.info.as_ref()
    }

    /// Number of decoded frames waiting for presentation.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.queue().len())
    }

    /// True once decoding has ended (stream drained, stopped, or failed) and
    /// every queued frame has been presented.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        match &self.session {
            None => true,
            Some(session) => session.shared().reached_end() && session.queue().is_empty(),
        }
    }

    /// Blocks up to `timeout` until a frame is queued.
    ///
    /// For callers without a render loop; the pump itself never waits.
    pub fn wait_for_frame(&self, timeout: Duration) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.queue().wait_for_frame(timeout))
    }

    /// Ok while the session can make progress; the fatal error otherwise.
    ///
    /// # Errors
    ///
    /// Returns the open failure of an inert player, or the read/decode error
    /// that ended the decode thread.
    pub fn health(&self) -> std::result::Result<(), VideoError> {
        match self.last_error() {
            Some(err) if err.is_fatal() => Err(err),
            _ => Ok(()),
        }
    }

    /// Most recent error, including recoverable seek failures.
    #[must_use]
    pub fn last_error(&self) -> Option<VideoError> {
        self.session
            .as_ref()
            .and_then(|s| s.shared().health())
            .or_else(|| self.failure.clone())
    }

    /// Presentation step, invoked once per render tick.
    ///
    /// Pops at most one frame when it is due and hands it to `sink`. Returns
    /// true if a frame was presented.
    pub fn update<S: PresentationSink>(&mut self, sink: &mut S) -> bool {
        let now = Instant::now();
        let frame = {
            let Some(session) = self.session.as_ref() else {
                return false;
            };
            let queue = session.queue();

            if self.preview_pending {
                queue.try_pop()
            } else if !self.state.is_playing() {
                None
            } else {
                match self.config.pacing {
                    PacingMode::Timestamp => {
                        let clock = &mut self.clock;
                        queue.pop_front_if(|frame| clock.pace(frame.pts_secs, now).presents())
                    }
                    PacingMode::FrameInterval => {
                        if self.clock.interval_elapsed(session.info().fps, now) {
                            queue.try_pop()
                        } else {
                            None
                        }
                    }
                }
            }
        };

        match frame {
            Some(frame) => {
                self.present(frame, sink, now);
                true
            }
            None => false,
        }
    }

    fn present<S: PresentationSink>(&mut self, frame: DecodedFrame, sink: &mut S, now: Instant) {
        sink.upload_frame(frame.rgba(), frame.width, frame.height);
        self.current_time = frame.pts_secs;
        self.clock.mark_presented(now);
        self.preview_pending = false;
    }

    fn clamp_to_duration(&self, target_secs: f64) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            target_secs.clamp(0.0, duration)
        } else {
            target_secs.max(0.0)
        }
    }

    /// Returns the running session, re-opening it after a stop.
    fn ensure_session(&mut self) -> Option<&DecoderSession> {
        if self.session.is_none() {
            match DecoderSession::spawn(&self.path, &self.config, self.speed) {
                Ok(session) => {
                    log::info!("Re-opened decode thread for {}", self.path.display());
                    self.failure = None;
                    self.session = Some(session);
                }
                Err(err) => {
                    log::error!("Failed to re-open {}: {}", self.path.display(), err);
                    self.failure = Some(err);
                    return None;
                }
            }
        }
        self.session.as_ref()
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video_player::sink::MemorySink;

    const MISSING: &str = "/nonexistent/path/clip.mkv";

    fn inert_player() -> VideoPlayer {
        VideoPlayer::open_or_inert(MISSING, PlayerConfig::default())
    }

    #[test]
    fn open_missing_file_fails_with_open_error() {
        let result = VideoPlayer::open(MISSING);
        assert!(matches!(result, Err(Error::Video(VideoError::Open(_)))));
    }

    #[test]
    fn inert_player_reports_zero_duration() {
        let player = inert_player();
        assert!(player.is_inert());
        assert_eq!(player.duration(), 0.0);
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.queue_depth(), 0);
        assert!(player.video_info().is_none());
    }

    #[test]
    fn inert_player_reports_open_failure_as_health() {
        let player = inert_player();
        assert!(matches!(player.health(), Err(VideoError::Open(_))));
        assert!(matches!(player.last_error(), Some(VideoError::Open(_))));
    }

    #[test]
    fn inert_player_ignores_transport() {
        let mut player = inert_player();
        player.play();
        assert_eq!(player.state(), PlaybackState::Stopped);
        player.toggle_pause();
        assert_eq!(player.state(), PlaybackState::Stopped);
        player.pause();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn inert_player_rejects_seek() {
        let mut player = inert_player();
        let err = player.seek(1.0).expect_err("inert seek must fail");
        assert!(matches!(err, Error::Video(VideoError::SessionClosed)));
    }

    #[test]
    fn inert_player_update_presents_nothing() {
        let mut player = inert_player();
        let mut sink = MemorySink::new();
        assert!(!player.update(&mut sink));
        assert_eq!(sink.frames_received(), 0);
        assert!(player.is_end_of_stream());
        assert!(!player.wait_for_frame(Duration::from_millis(1)));
    }

    #[test]
    fn playback_speed_is_clamped() {
        let mut player = inert_player();
        player.set_playback_speed(10.0);
        assert_eq!(player.playback_speed(), 4.0);
        player.set_playback_speed(0.01);
        assert_eq!(player.playback_speed(), 0.25);
        player.set_playback_speed(1.5);
        assert_eq!(player.playback_speed(), 1.5);
    }

    #[test]
    fn configured_default_speed_is_applied() {
        let config = PlayerConfig {
            default_speed: 2.0,
            ..PlayerConfig::default()
        };
        let player = VideoPlayer::open_or_inert(MISSING, config);
        assert_eq!(player.playback_speed(), 2.0);
    }
}
