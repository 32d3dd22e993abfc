// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Core playback types with ZERO external dependencies.
//!
//! This module contains pure value objects and state enums. It depends on
//! nothing but `std` so the rules it encodes can be tested in isolation.
//!
//! # Modules
//!
//! - [`video`]: Video playback types ([`PlaybackState`](video::PlaybackState),
//!   [`PlaybackSpeed`](video::PlaybackSpeed))

pub mod video;
