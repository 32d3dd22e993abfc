// SPDX-License-Identifier: MPL-2.0
//! Error types shared by probing, decoding and playback control.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("I/O Error: {0}")]
    Io(String),
    #[error("Config Error: {0}")]
    Config(String),
    #[error("Video Error: {0}")]
    Video(#[from] VideoError),
}

/// Specific failures of a video playback session.
///
/// Open-time variants (`Open`, `NoVideoStream`, `Codec`, `Allocation`, `Scale`)
/// leave the session unusable. `Read` and `Decode` end a running session.
/// `Seek` is recoverable: decoding continues from the previous position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoError {
    /// Missing or unreadable file, or an unsupported container.
    #[error("Failed to open media: {0}")]
    Open(String),

    /// The container holds no video stream.
    #[error("No video stream found")]
    NoVideoStream,

    /// No decoder for the stream's codec, or the codec context failed to open.
    #[error("Unsupported or unusable codec: {0}")]
    Codec(String),

    /// A frame, packet or context could not be allocated.
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// Demuxing failed for a reason other than end of file.
    #[error("Read failed: {0}")]
    Read(String),

    /// The decoder reported an unrecoverable error.
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// The container rejected a seek request.
    #[error("Seek failed: {0}")]
    Seek(String),

    /// Pixel-format conversion could not be set up.
    #[error("Scaler setup failed: {0}")]
    Scale(String),

    /// The operation needs a running decoder but the session is closed.
    #[error("Playback session is closed")]
    SessionClosed,
}

impl VideoError {
    /// Returns true if this error ends the decode task.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VideoError::Seek(_))
    }

    /// Short machine-readable category name, used in log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            VideoError::Open(_) => "open",
            VideoError::NoVideoStream => "stream-selection",
            VideoError::Codec(_) => "codec",
            VideoError::Allocation(_) => "allocation",
            VideoError::Read(_) => "read",
            VideoError::Decode(_) => "decode",
            VideoError::Seek(_) => "seek",
            VideoError::Scale(_) => "scale",
            VideoError::SessionClosed => "session-closed",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_io_error() {
        let err = Error::Io("disk failure".to_string());
        assert_eq!(format!("{}", err), "I/O Error: disk failure");
    }

    #[test]
    fn from_io_error_produces_io_variant() {
        let io_error = std::io::Error::other("boom");
        let err: Error = io_error.into();
        match err {
            Error::Io(message) => assert!(message.contains("boom")),
            _ => panic!("expected Io variant"),
        }
    }

    #[test]
    fn config_error_formats_properly() {
        let err = Error::Config("bad field".into());
        assert_eq!(format!("{}", err), "Config Error: bad field");
    }

    #[test]
    fn video_error_wraps_into_error() {
        let err: Error = VideoError::NoVideoStream.into();
        assert_eq!(format!("{}", err), "Video Error: No video stream found");
    }

    #[test]
    fn only_seek_errors_are_recoverable() {
        assert!(!VideoError::Seek("rejected".into()).is_fatal());
        assert!(VideoError::Read("eio".into()).is_fatal());
        assert!(VideoError::Decode("bad".into()).is_fatal());
        assert!(VideoError::Open("missing".into()).is_fatal());
    }

    #[test]
    fn kinds_are_distinct_per_taxonomy_entry() {
        let kinds = [
            VideoError::Open(String::new()).kind(),
            VideoError::NoVideoStream.kind(),
            VideoError::Codec(String::new()).kind(),
            VideoError::Allocation(String::new()).kind(),
            VideoError::Read(String::new()).kind(),
            VideoError::Decode(String::new()).kind(),
            VideoError::Seek(String::new()).kind(),
            VideoError::Scale(String::new()).kind(),
            VideoError::SessionClosed.kind(),
        ];
        let mut unique = kinds.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), kinds.len());
    }
}
