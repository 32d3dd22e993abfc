// SPDX-License-Identifier: MPL-2.0
//! Video playback engine.
//!
//! This module provides video playback using FFmpeg for decoding on a
//! dedicated thread, a bounded frame queue for backpressure, and a
//! caller-driven presentation pump paced against a playback clock.

mod decoder;
pub mod frame_queue;
pub mod sink;
mod state;
pub mod sync;
pub mod time_units;

pub use decoder::{DecoderCommand, DecoderSession, SessionShared};
pub use frame_queue::{DecodedFrame, FrameQueue, PushOutcome};
pub use sink::{ExportFormat, FrameHandle, MemorySink, PresentationSink};
pub use state::VideoPlayer;
pub use sync::{calculate_sync_action, PlaybackClock, SyncAction};

pub use crate::domain::video::{PlaybackSpeed, PlaybackState};
