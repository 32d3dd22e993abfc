// SPDX-License-Identifier: MPL-2.0
//! FFmpeg bootstrap and video stream helpers.

use crate::config::FALLBACK_FRAME_RATE;
use crate::error::{Error, Result, VideoError};
use crate::video_player::time_units::av_time_to_secs;
use std::sync::Once;

/// Static flag to ensure FFmpeg is initialized only once.
static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg with appropriate log level.
///
/// This function is safe to call multiple times - initialization will only
/// happen once thanks to `std::sync::Once`. It sets the FFmpeg log level
/// to ERROR so container warnings do not end up on stderr.
pub fn init_ffmpeg() -> Result<()> {
    let mut init_result: Result<()> = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(Error::Io(format!("FFmpeg initialization failed: {e}")));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// Static properties of the video stream a session decodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    /// Index of the selected stream in the container.
    pub stream_index: usize,
    /// Video width in pixels
    pub width: u32,
    /// Video height in pixels
    pub height: u32,
    /// Container duration in seconds, 0 when unknown
    pub duration_secs: f64,
    /// Average frame rate, or the fallback rate when the container omits it
    pub fps: f64,
}

impl VideoMetadata {
    /// Nominal wall time between two frames at normal speed.
    #[must_use]
    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / self.fps
    }
}

/// Opens `path` as a demuxer input, mapping failure to [`VideoError::Open`].
pub(crate) fn open_input(
    path: &std::path::Path,
) -> std::result::Result<ffmpeg_next::format::context::Input, VideoError> {
    init_ffmpeg().map_err(|e| VideoError::Open(e.to_string()))?;
    ffmpeg_next::format::input(&path)
        .map_err(|e| VideoError::Open(format!("{}: {e}", path.display())))
}

/// Returns the index of the first video stream in declaration order.
///
/// Unlike `streams().best()`, this never prefers a later stream because of
/// its resolution or disposition.
pub(crate) fn first_video_stream(input: &ffmpeg_next::format::context::Input) -> Option<usize> {
    input
        .streams()
        .find(|stream| stream.parameters().medium() == ffmpeg_next::media::Type::Video)
        .map(|stream| stream.index())
}

/// Converts a container duration in `AV_TIME_BASE` units to seconds.
#[must_use]
pub fn container_duration_secs(raw: i64) -> f64 {
    if raw > 0 {
        av_time_to_secs(raw)
    } else {
        0.0
    }
}

/// Resolves a frame rate, falling back when it is missing or degenerate.
#[must_use]
pub fn frame_rate_or_fallback(numerator: i32, denominator: i32) -> f64 {
    if numerator > 0 && denominator > 0 {
        f64::from(numerator) / f64::from(denominator)
    } else {
        FALLBACK_FRAME_RATE
    }
}

/// Builds the metadata of an opened video stream.
pub(crate) fn describe_stream(
    input: &ffmpeg_next::format::context::Input,
    stream: &ffmpeg_next::format::stream::Stream,
    width: u32,
    height: u32,
) -> VideoMetadata {
    let avg = stream.avg_frame_rate();
    let fps = if avg.numerator() > 0 && avg.denominator() > 0 {
        frame_rate_or_fallback(avg.numerator(), avg.denominator())
    } else {
        let real = stream.rate();
        frame_rate_or_fallback(real.numerator(), real.denominator())
    };

    VideoMetadata {
        stream_index: stream.index(),
        width,
        height,
        duration_secs: container_duration_secs(input.duration()),
        fps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_abs_diff_eq, F64_EPSILON};

    #[test]
    fn init_ffmpeg_is_idempotent() {
        assert!(init_ffmpeg().is_ok());
        assert!(init_ffmpeg().is_ok());
    }

    #[test]
    fn container_duration_converts_microseconds() {
        assert_abs_diff_eq!(container_duration_secs(10_000_000), 10.0, epsilon = F64_EPSILON);
        assert_abs_diff_eq!(container_duration_secs(1_500_000), 1.5, epsilon = F64_EPSILON);
    }

    #[test]
    fn unknown_container_duration_is_zero() {
        assert_eq!(container_duration_secs(0), 0.0);
        assert_eq!(container_duration_secs(i64::MIN), 0.0);
    }

    #[test]
    fn frame_rate_uses_declared_ratio() {
        assert_abs_diff_eq!(frame_rate_or_fallback(25, 1), 25.0, epsilon = F64_EPSILON);
        assert_abs_diff_eq!(frame_rate_or_fallback(30_000, 1001), 29.97, epsilon = 0.001);
    }

    #[test]
    fn frame_rate_falls_back_when_missing() {
        assert_eq!(frame_rate_or_fallback(0, 1), FALLBACK_FRAME_RATE);
        assert_eq!(frame_rate_or_fallback(25, 0), FALLBACK_FRAME_RATE);
    }

    #[test]
    fn metadata_frame_interval() {
        let meta = VideoMetadata {
            stream_index: 0,
            width: 160,
            height: 120,
            duration_secs: 10.0,
            fps: 25.0,
        };
        assert_abs_diff_eq!(meta.frame_interval_secs(), 0.04, epsilon = F64_EPSILON);
    }

    #[test]
    fn open_input_reports_missing_file() {
        let err = open_input(std::path::Path::new("/nonexistent/clip.mkv"))
            .expect_err("missing file must fail");
        assert!(matches!(err, VideoError::Open(_)));
    }
}
