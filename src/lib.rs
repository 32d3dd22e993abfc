// SPDX-License-Identifier: MPL-2.0
//! `paced_player` is a headless video playback engine.
//!
//! A background thread decodes a container with FFmpeg into a bounded queue
//! of RGBA frames; [`VideoPlayer`](video_player::VideoPlayer) paces those
//! frames against a playback clock and hands them to a
//! [`PresentationSink`](video_player::PresentationSink) once per render tick.
//!
//! # Example
//!
//! ```no_run
//! use paced_player::video_player::{MemorySink, VideoPlayer};
//! use std::time::Duration;
//!
//! let mut player = VideoPlayer::open("clip.mkv")?;
//! let mut sink = MemorySink::new();
//! player.play();
//! while !player.is_end_of_stream() {
//!     player.update(&mut sink);
//!     std::thread::sleep(Duration::from_millis(5));
//! }
//! # Ok::<(), paced_player::error::Error>(())
//! ```

#![doc(html_root_url = "https://docs.rs/paced_player/0.1.0")]

pub mod config;
pub mod domain;
pub mod error;
pub mod media;
pub mod video_player;

#[cfg(test)]
pub(crate) mod test_utils;
