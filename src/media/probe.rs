// SPDX-License-Identifier: MPL-2.0
//! One-shot container probing.
//!
//! [`probe`] opens a file, walks every elementary stream once and returns an
//! immutable [`MediaDescriptor`]. Nothing is decoded.

use crate::error::{Result, VideoError};
use crate::media::video::{container_duration_secs, open_input};
use ffmpeg_next::ffi;
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

/// Profile value FFmpeg uses when a stream does not declare one.
const PROFILE_UNKNOWN: i32 = -99;

/// Buffer size for the channel layout label, large enough for any named layout.
const CHANNEL_LAYOUT_LABEL_LEN: usize = 128;

/// Category of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

/// Kind-specific stream properties.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDetails {
    Video {
        width: u32,
        height: u32,
        /// Pixel aspect ratio; 1.0 when neither stream nor codec declares one.
        sample_aspect_ratio: f64,
        /// `sample_aspect_ratio * width / height`, 0 when height is 0.
        display_aspect_ratio: f64,
    },
    Audio {
        sample_rate: u32,
        channels: u32,
        /// Human-readable layout such as `stereo` or `5.1(side)`.
        channel_layout: String,
        bits_per_sample: u32,
    },
    Subtitle,
}

/// Summary of one elementary stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Position of the stream in the container.
    pub index: usize,
    /// Short decoder name, empty if no decoder is registered for the codec.
    pub codec_name: String,
    pub codec_long_name: String,
    /// Codec profile name, when the codec declares a known profile.
    pub profile: Option<String>,
    pub details: StreamDetails,
}

impl StreamDescriptor {
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        match self.details {
            StreamDetails::Video { .. } => StreamKind::Video,
            StreamDetails::Audio { .. } => StreamKind::Audio,
            StreamDetails::Subtitle => StreamKind::Subtitle,
        }
    }
}

/// Immutable summary of a media file.
///
/// Streams keep container declaration order. Data and attachment streams
/// are not listed.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    /// Path as given by the caller.
    pub path: PathBuf,
    pub absolute_path: PathBuf,
    /// Duration in seconds, 0 when the container does not declare one.
    pub duration_secs: f64,
    /// Overall bitrate in bits per second, 0 when unknown.
    pub bitrate_bps: i64,
    /// Container-level tags.
    pub metadata: BTreeMap<String, String>,
    pub streams: Vec<StreamDescriptor>,
}

impl MediaDescriptor {
    /// Iterates over streams of one kind, in container order.
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(move |s| s.kind() == kind)
    }

    /// First video stream, the one a playback session decodes.
    #[must_use]
    pub fn primary_video(&self) -> Option<&StreamDescriptor> {
        self.streams_of(StreamKind::Video).next()
    }
}

/// Probes a media file.
///
/// # Errors
///
/// Returns [`VideoError::Open`] if the file is missing, unreadable, or not a
/// container FFmpeg understands.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaDescriptor> {
    let path = path.as_ref();
    let input = open_input(path)?;

    let metadata = input
        .metadata()
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let streams = input.streams().filter_map(|s| describe(&s)).collect();

    let absolute_path = std::path::absolute(path)
        .map_err(|e| VideoError::Open(format!("{}: {e}", path.display())))?;

    Ok(MediaDescriptor {
        path: path.to_path_buf(),
        absolute_path,
        duration_secs: container_duration_secs(input.duration()),
        bitrate_bps: input.bit_rate().max(0),
        metadata,
        streams,
    })
}

fn describe(stream: &ffmpeg_next::format::stream::Stream) -> Option<StreamDescriptor> {
    let parameters = stream.parameters();
    let codec_id = parameters.id();

    let (codec_name, codec_long_name) = ffmpeg_next::decoder::find(codec_id)
        .map(|codec| (codec.name().to_string(), codec.description().to_string()))
        .unwrap_or_default();

    // SAFETY: the parameters belong to a stream of the still-open input and
    // are only read here.
    let par = unsafe { &*parameters.as_ptr() };

    let details = match parameters.medium() {
        ffmpeg_next::media::Type::Video => {
            // SAFETY: as above, the stream pointer is valid for the input's lifetime.
            let stream_sar = unsafe { (*stream.as_ptr()).sample_aspect_ratio };
            let width = par.width.max(0) as u32;
            let height = par.height.max(0) as u32;
            let sample_aspect_ratio = resolve_sample_aspect_ratio(
                (stream_sar.num, stream_sar.den),
                (par.sample_aspect_ratio.num, par.sample_aspect_ratio.den),
            );
            StreamDetails::Video {
                width,
                height,
                sample_aspect_ratio,
                display_aspect_ratio: display_aspect_ratio(sample_aspect_ratio, width, height),
            }
        }
        ffmpeg_next::media::Type::Audio => StreamDetails::Audio {
            sample_rate: par.sample_rate.max(0) as u32,
            channels: par.ch_layout.nb_channels.max(0) as u32,
            channel_layout: channel_layout_label(&par.ch_layout),
            bits_per_sample: par.bits_per_coded_sample.max(0) as u32,
        },
        ffmpeg_next::media::Type::Subtitle => StreamDetails::Subtitle,
        _ => return None,
    };

    Some(StreamDescriptor {
        index: stream.index(),
        codec_name,
        codec_long_name,
        profile: profile_name(codec_id, par.profile),
        details,
    })
}

/// Picks the first valid ratio among stream and codec, else square pixels.
fn resolve_sample_aspect_ratio(stream: (i32, i32), codec: (i32, i32)) -> f64 {
    [stream, codec]
        .into_iter()
        .find(|&(num, den)| num > 0 && den > 0)
        .map_or(1.0, |(num, den)| f64::from(num) / f64::from(den))
}

fn display_aspect_ratio(sample_aspect_ratio: f64, width: u32, height: u32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    sample_aspect_ratio * f64::from(width) / f64::from(height)
}

fn profile_name(codec_id: ffmpeg_next::codec::Id, profile: i32) -> Option<String> {
    if profile == PROFILE_UNKNOWN {
        return None;
    }
    // SAFETY: avcodec_profile_name returns a static string or null.
    let name = unsafe { ffi::avcodec_profile_name(codec_id.into(), profile) };
    c_str_to_string(name)
}

fn channel_layout_label(layout: &ffi::AVChannelLayout) -> String {
    let mut buf = [0 as c_char; CHANNEL_LAYOUT_LABEL_LEN];
    // SAFETY: buf outlives the call and its length is passed along.
    let written = unsafe { ffi::av_channel_layout_describe(layout, buf.as_mut_ptr(), buf.len()) };
    if written <= 0 {
        return String::new();
    }
    c_str_to_string(buf.as_ptr()).unwrap_or_default()
}

fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: FFmpeg returns NUL-terminated strings.
    let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::{assert_abs_diff_eq, F64_EPSILON};

    #[test]
    fn sample_aspect_ratio_prefers_stream_value() {
        assert_abs_diff_eq!(
            resolve_sample_aspect_ratio((4, 3), (1, 1)),
            4.0 / 3.0,
            epsilon = F64_EPSILON
        );
    }

    #[test]
    fn sample_aspect_ratio_falls_back_to_codec_value() {
        assert_abs_diff_eq!(
            resolve_sample_aspect_ratio((0, 1), (16, 15)),
            16.0 / 15.0,
            epsilon = F64_EPSILON
        );
    }

    #[test]
    fn sample_aspect_ratio_defaults_to_square_pixels() {
        assert_eq!(resolve_sample_aspect_ratio((0, 0), (0, 1)), 1.0);
    }

    #[test]
    fn display_aspect_ratio_combines_sar_and_dimensions() {
        assert_abs_diff_eq!(
            display_aspect_ratio(1.0, 1920, 1080),
            16.0 / 9.0,
            epsilon = F64_EPSILON
        );
        assert_abs_diff_eq!(
            display_aspect_ratio(4.0 / 3.0, 720, 720),
            4.0 / 3.0,
            epsilon = F64_EPSILON
        );
    }

    #[test]
    fn display_aspect_ratio_is_zero_without_height() {
        assert_eq!(display_aspect_ratio(1.0, 640, 0), 0.0);
    }

    #[test]
    fn unknown_profile_has_no_name() {
        assert_eq!(profile_name(ffmpeg_next::codec::Id::H264, PROFILE_UNKNOWN), None);
    }

    #[test]
    fn known_profile_is_named() {
        crate::media::init_ffmpeg().expect("ffmpeg init");
        // FF_PROFILE_H264_HIGH
        let name = profile_name(ffmpeg_next::codec::Id::H264, 100);
        assert_eq!(name.as_deref(), Some("High"));
    }

    #[test]
    fn null_c_string_maps_to_none() {
        assert_eq!(c_str_to_string(std::ptr::null()), None);
    }

    #[test]
    fn probe_missing_file_is_open_error() {
        let err = probe("/nonexistent/clip.mkv").expect_err("missing file must fail");
        assert!(matches!(err, Error::Video(VideoError::Open(_))));
    }

    #[test]
    fn stream_kind_follows_details() {
        let stream = StreamDescriptor {
            index: 2,
            codec_name: "subrip".into(),
            codec_long_name: "SubRip subtitle".into(),
            profile: None,
            details: StreamDetails::Subtitle,
        };
        assert_eq!(stream.kind(), StreamKind::Subtitle);
    }
}
