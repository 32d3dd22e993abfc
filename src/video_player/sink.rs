// SPDX-License-Identifier: MPL-2.0
//! Presentation sinks.
//!
//! A sink receives the RGBA buffer of each presented frame and makes it
//! displayable. Rendering surfaces live outside this crate; [`MemorySink`]
//! keeps the latest frame in memory and can export it as an image file
//! using the `image` crate.

use crate::error::{Error, Result};
use image_rs::{ImageBuffer, ImageFormat, Rgba};
use std::path::Path;

/// Receiver of presented frames.
///
/// Implementations never decode; they only take ownership of, or copy, the
/// pixels they are handed.
pub trait PresentationSink {
    /// Opaque reference to whatever the sink currently displays.
    type Handle;

    /// Makes `rgba` (width × height × 4 bytes, no row padding) the current frame.
    fn upload_frame(&mut self, rgba: &[u8], width: u32, height: u32);

    fn current_frame_handle(&self) -> Self::Handle;
}

/// Identifies one uploaded frame of a [`MemorySink`].
///
/// Handles increase with every upload; `FrameHandle(0)` means nothing has
/// been uploaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameHandle(pub u64);

/// Supported export formats for frame snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG format (lossless, best quality).
    #[default]
    Png,
    /// JPEG format (lossy, smaller file size).
    Jpeg,
    /// WebP format (modern, good compression).
    WebP,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Detects format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<ExportFormat> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::WebP),
            _ => None,
        }
    }

    /// Detects format from file path extension.
    pub fn from_path(path: &Path) -> Option<ExportFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Sink that keeps the most recent frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    uploads: u64,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames uploaded so far.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.uploads
    }

    /// Pixels and dimensions of the current frame, if any.
    #[must_use]
    pub fn current_frame(&self) -> Option<(&[u8], u32, u32)> {
        (self.uploads > 0).then_some((self.rgba.as_slice(), self.width, self.height))
    }

    /// Writes the current frame to `path`.
    ///
    /// The format follows the file extension and defaults to PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame was uploaded yet, or if the image cannot
    /// be encoded or written to disk.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = ExportFormat::from_path(path).unwrap_or_default();

        let (rgba, width, height) = self
            .current_frame()
            .ok_or_else(|| Error::Io("No frame has been presented yet".to_string()))?;

        let img: ImageBuffer<Rgba<u8>, _> = ImageBuffer::from_raw(width, height, rgba.to_vec())
            .ok_or_else(|| Error::Io("Failed to create image buffer from frame data".to_string()))?;

        // JPEG has no alpha channel.
        if format == ExportFormat::Jpeg {
            let rgb_img = image_rs::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img
                .save_with_format(path, format.image_format())
                .map_err(|e| Error::Io(format!("Failed to save frame: {e}")))?;
        } else {
            img.save_with_format(path, format.image_format())
                .map_err(|e| Error::Io(format!("Failed to save frame: {e}")))?;
        }

        log::info!("Saved snapshot {}x{} to {}", width, height, path.display());
        Ok(())
    }
}

impl PresentationSink for MemorySink {
    type Handle = FrameHandle;

    fn upload_frame(&mut self, rgba: &[u8], width: u32, height: u32) {
        self.rgba.clear();
        self.rgba.extend_from_slice(rgba);
        self.width = width;
        self.height = height;
        self.uploads += 1;
    }

    fn current_frame_handle(&self) -> FrameHandle {
        FrameHandle(self.uploads)
    }
}

/// Generates a default filename for a snapshot.
///
/// Format: `{video_name}_frame_{MM-SS-mmm}.{ext}`
#[must_use]
pub fn generate_default_filename(
    video_path: &Path,
    position_secs: f64,
    format: ExportFormat,
) -> String {
    let video_name = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_ms = (position_secs.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60000;
    let seconds = (total_ms % 60000) / 1000;
    let millis = total_ms % 1000;

    format!(
        "{}_frame_{:02}-{:02}-{:03}.{}",
        video_name,
        minutes,
        seconds,
        millis,
        format.extension()
    )
}
