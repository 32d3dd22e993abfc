// SPDX-License-Identifier: MPL-2.0
//! Container-level media handling.
//!
//! [`probe`] summarises a file once, before playback starts. [`video`] holds
//! the FFmpeg bootstrap and the stream helpers shared with the decoder.

pub mod probe;
pub mod video;

// Re-export commonly used types
pub use probe::{probe, MediaDescriptor, StreamDescriptor, StreamDetails, StreamKind};
pub use video::{init_ffmpeg, VideoMetadata};
