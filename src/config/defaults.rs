// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module serves as the single source of truth for default values
//! used across the crate. Constants are organized by category.
//!
//! # Categories
//!
//! - **Frame Queue**: Capacity of the decoded-frame buffer
//! - **Playback Speed**: Speed factor bounds
//! - **Decoder**: Decode-side throttling
//! - **Pacing**: Presentation clock tolerances

use crate::domain::video::newtypes::speed_bounds;

// ==========================================================================
// Frame Queue Defaults
// ==========================================================================

/// Default number of decoded frames buffered between decoder and presenter.
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// Minimum queue capacity.
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Maximum queue capacity (8 seconds at 30 fps).
pub const MAX_QUEUE_CAPACITY: usize = 240;

// ==========================================================================
// Playback Speed Defaults
// ==========================================================================

/// Normal playback speed.
pub const DEFAULT_PLAYBACK_SPEED: f64 = speed_bounds::DEFAULT;

/// Slowest supported playback speed.
pub const MIN_PLAYBACK_SPEED: f64 = speed_bounds::MIN;

/// Fastest supported playback speed.
pub const MAX_PLAYBACK_SPEED: f64 = speed_bounds::MAX;

// ==========================================================================
// Decoder Defaults
// ==========================================================================

/// Base delay inserted after each decoded frame when speed differs from 1.0.
/// The actual delay is `base / speed`.
pub const DEFAULT_SPEED_THROTTLE_MS: u64 = 10;

/// Upper bound for the throttle base delay.
pub const MAX_SPEED_THROTTLE_MS: u64 = 100;

/// Frame rate assumed when the container does not declare one.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

// ==========================================================================
// Pacing Defaults
// ==========================================================================

/// A frame due within this many seconds is presented now.
pub const PRESENT_TOLERANCE_SECS: f64 = 0.005;

/// A frame this late re-anchors the clock instead of dragging it along.
pub const RESYNC_LATE_SECS: f64 = 0.25;

/// A frame this far in the future is treated as a timestamp discontinuity.
pub const RESYNC_EARLY_SECS: f64 = 2.0;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    assert!(MIN_QUEUE_CAPACITY > 0);
    assert!(DEFAULT_QUEUE_CAPACITY >= MIN_QUEUE_CAPACITY);
    assert!(DEFAULT_QUEUE_CAPACITY <= MAX_QUEUE_CAPACITY);

    assert!(MIN_PLAYBACK_SPEED > 0.0);
    assert!(MIN_PLAYBACK_SPEED < DEFAULT_PLAYBACK_SPEED);
    assert!(MAX_PLAYBACK_SPEED > DEFAULT_PLAYBACK_SPEED);

    assert!(DEFAULT_SPEED_THROTTLE_MS <= MAX_SPEED_THROTTLE_MS);
    assert!(FALLBACK_FRAME_RATE > 0.0);

    assert!(PRESENT_TOLERANCE_SECS < RESYNC_LATE_SECS);
    assert!(RESYNC_LATE_SECS < RESYNC_EARLY_SECS);
};
