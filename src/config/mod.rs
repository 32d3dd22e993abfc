// SPDX-License-Identifier: MPL-2.0
//! This module handles the player configuration, including loading and saving
//! preferences to a `settings.toml` file.
//!
//! # Examples
//!
//! ```no_run
//! use paced_player::config::{self, PacingMode};
//! use std::path::PathBuf;
//!
//! // Load existing configuration
//! let mut config = config::load().unwrap_or_default();
//!
//! // Modify a setting
//! config.pacing = PacingMode::FrameInterval;
//!
//! // Save the modified configuration
//! config::save(&config).expect("Failed to save config");
//!
//! // To load/save from a specific path (e.g., for testing)
//! let temp_dir = PathBuf::from("./temp_config_dir");
//! std::fs::create_dir_all(&temp_dir).unwrap();
//! let temp_file = temp_dir.join("test_settings.toml");
//! config::save_to_path(&config, &temp_file).expect("Failed to save to path");
//! let loaded = config::load_from_path(&temp_file).expect("Failed to load from path");
//! assert_eq!(loaded.pacing, PacingMode::FrameInterval);
//! std::fs::remove_dir_all(&temp_dir).unwrap();
//! ```

pub mod defaults;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use defaults::*;

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "PacedPlayer";

/// How the presentation pump decides that the next frame is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Compare the head frame's timestamp with the playback clock.
    #[default]
    Timestamp,
    /// Present one frame every `1 / fps / speed` seconds of wall time.
    FrameInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Number of decoded frames buffered ahead of presentation.
    pub queue_capacity: usize,
    /// Keep decoding into the queue while paused.
    pub prebuffer_while_paused: bool,
    pub pacing: PacingMode,
    /// Decode-side delay base in milliseconds, divided by the speed factor.
    pub speed_throttle_ms: u64,
    /// Speed applied when a session opens.
    pub default_speed: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prebuffer_while_paused: false,
            pacing: PacingMode::Timestamp,
            speed_throttle_ms: DEFAULT_SPEED_THROTTLE_MS,
            default_speed: DEFAULT_PLAYBACK_SPEED,
        }
    }
}

impl PlayerConfig {
    /// Returns a copy with every field forced into its valid range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let default_speed = if self.default_speed.is_finite() {
            self.default_speed
                .clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
        } else {
            DEFAULT_PLAYBACK_SPEED
        };
        Self {
            queue_capacity: self
                .queue_capacity
                .clamp(MIN_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY),
            prebuffer_while_paused: self.prebuffer_while_paused,
            pacing: self.pacing,
            speed_throttle_ms: self.speed_throttle_ms.min(MAX_SPEED_THROTTLE_MS),
            default_speed,
        }
    }

    /// Decode-side throttle base as a duration.
    #[must_use]
    pub fn speed_throttle(&self) -> Duration {
        Duration::from_millis(self.speed_throttle_ms)
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<PlayerConfig> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(PlayerConfig::default())
}

pub fn save(config: &PlayerConfig) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<PlayerConfig> {
    let content = fs::read_to_string(path)?;
    let config: PlayerConfig = toml::from_str(&content).unwrap_or_else(|err| {
        log::warn!(
            "Ignoring invalid config at {}: {}",
            path.display(),
            err.message()
        );
        PlayerConfig::default()
    });
    Ok(config.sanitized())
}

pub fn save_to_path(config: &PlayerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
