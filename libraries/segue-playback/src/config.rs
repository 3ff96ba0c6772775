//! Player configuration
//!
//! Every field has a default, so an empty file (or none) yields a working
//! player. Values are layered: defaults, then an optional TOML file, then
//! `SEGUE_*` environment variables (`SEGUE_BATCH_SIZE=unbounded`).

use crate::error::{PlaybackError, Result};
use crate::types::BatchSize;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Tracks decoded and scheduled per batch
    #[serde(default)]
    pub batch_size: BatchSize,

    /// Decoded buffers kept resident (FIFO eviction)
    #[serde(default = "default_max_cached")]
    pub max_cached: usize,

    /// Seconds between "now" and the first segment of a rebuilt batch
    #[serde(default = "default_lead_time")]
    pub lead_time: f64,

    /// Seconds between "now" and the first segment after a seek
    #[serde(default = "default_seek_lead")]
    pub seek_lead: f64,

    /// Seeks never land closer than this to the end of a track
    #[serde(default = "default_seek_end_guard")]
    pub seek_end_guard: f64,

    /// `prev` restarts the current track once this much has played
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold: f64,

    /// Metadata for the next track is pushed this early
    #[serde(default = "default_notify_ahead")]
    pub notify_ahead: f64,

    /// Period of position reports while playing
    #[serde(default = "default_position_interval_ms")]
    pub position_interval_ms: u64,

    /// Playlist index the first `play` starts from
    #[serde(default)]
    pub initial_cursor: usize,

    /// Initial output gain (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::default(),
            max_cached: default_max_cached(),
            lead_time: default_lead_time(),
            seek_lead: default_seek_lead(),
            seek_end_guard: default_seek_end_guard(),
            restart_threshold: default_restart_threshold(),
            notify_ahead: default_notify_ahead(),
            position_interval_ms: default_position_interval_ms(),
            initial_cursor: 0,
            volume: default_volume(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path).required(false));
        }

        // Override with environment variables (prefixed with SEGUE_)
        settings = settings.add_source(config::Environment::with_prefix("SEGUE").try_parsing(true));

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Position report period
    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_cached == 0 {
            return Err(PlaybackError::Config(
                "max_cached must be at least 1".to_string(),
            ));
        }

        let timings = [
            ("lead_time", self.lead_time),
            ("seek_lead", self.seek_lead),
            ("seek_end_guard", self.seek_end_guard),
            ("restart_threshold", self.restart_threshold),
            ("notify_ahead", self.notify_ahead),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(PlaybackError::Config(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, value
                )));
            }
        }

        if self.position_interval_ms == 0 {
            return Err(PlaybackError::Config(
                "position_interval_ms must be positive".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidVolume(self.volume));
        }

        Ok(())
    }
}

// Default values
fn default_max_cached() -> usize {
    8
}

fn default_lead_time() -> f64 {
    0.18
}

fn default_seek_lead() -> f64 {
    0.05
}

fn default_seek_end_guard() -> f64 {
    0.05
}

fn default_restart_threshold() -> f64 {
    3.0
}

fn default_notify_ahead() -> f64 {
    0.05
}

fn default_position_interval_ms() -> u64 {
    1000
}

fn default_volume() -> f32 {
    1.0
}
