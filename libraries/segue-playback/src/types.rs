//! Core types for batch playback

use crate::error::PlaybackError;
use segue_core::{Artwork, Track};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing scheduled
    #[default]
    Idle,

    /// Clock running over a scheduled batch
    Playing,

    /// Batch scheduled, clock suspended
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// How many consecutive tracks one batch schedules
///
/// Accepts a positive integer or the keyword `"unbounded"`, which clamps to
/// the playlist length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BatchSizeRepr", into = "BatchSizeRepr")]
pub enum BatchSize {
    /// At most this many tracks (always >= 1)
    Limited(usize),

    /// The whole playlist
    Unbounded,
}

impl BatchSize {
    /// Validated limited batch size
    pub fn limited(count: usize) -> Result<Self, PlaybackError> {
        if count == 0 {
            return Err(PlaybackError::InvalidBatchSize("0".to_string()));
        }
        Ok(BatchSize::Limited(count))
    }

    /// Tracks per batch for a playlist of `playlist_len`
    pub fn count(self, playlist_len: usize) -> usize {
        match self {
            BatchSize::Limited(n) => n.min(playlist_len),
            BatchSize::Unbounded => playlist_len,
        }
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        BatchSize::Limited(3)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchSize::Limited(n) => write!(f, "{}", n),
            BatchSize::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl FromStr for BatchSize {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(BatchSize::Unbounded);
        }
        s.parse::<usize>()
            .map_err(|_| PlaybackError::InvalidBatchSize(s.to_string()))
            .and_then(BatchSize::limited)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BatchSizeRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<BatchSizeRepr> for BatchSize {
    type Error = PlaybackError;

    fn try_from(repr: BatchSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            BatchSizeRepr::Count(n) => BatchSize::limited(n),
            BatchSizeRepr::Keyword(s) => s.parse(),
        }
    }
}

impl From<BatchSize> for BatchSizeRepr {
    fn from(size: BatchSize) -> Self {
        match size {
            BatchSize::Limited(n) => BatchSizeRepr::Count(n),
            BatchSize::Unbounded => BatchSizeRepr::Keyword("unbounded".to_string()),
        }
    }
}

/// One track placed on the playback clock
///
/// `end_time == start_time + (duration - start_offset)` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Playlist index of the track
    pub track_index: usize,

    /// Clock time the audible part starts
    pub start_time: f64,

    /// Clock time the track ends
    pub end_time: f64,

    /// Full track duration in seconds
    pub duration: f64,

    /// Seconds into the track where playback begins
    pub start_offset: f64,
}

impl Segment {
    /// Place a track at `start_time`, playing from `start_offset`
    pub fn new(track_index: usize, start_time: f64, duration: f64, start_offset: f64) -> Self {
        let duration = duration.max(0.0);
        let start_offset = start_offset.clamp(0.0, duration);
        Self {
            track_index,
            start_time,
            end_time: start_time + (duration - start_offset),
            duration,
            start_offset,
        }
    }

    /// Whether `now` falls in `[start_time, end_time)`
    pub fn contains(&self, now: f64) -> bool {
        now >= self.start_time && now < self.end_time
    }

    /// Audible length on the clock
    pub fn span(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Position within one track
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackProgress {
    /// Seconds into the track
    pub position: f64,

    /// Track duration in seconds
    pub duration: f64,

    /// `position / duration`, clamped to `[0, 1]`
    pub ratio: f64,
}

/// Position within the whole batch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Seconds elapsed across the batch
    pub position: f64,

    /// Sum of every segment's full duration
    pub duration: f64,
}

/// Now-playing metadata pushed to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork: Vec<Artwork>,
}

impl From<&Track> for NowPlaying {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            artwork: track.artwork.clone(),
        }
    }
}

/// Position report for the host's seek bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub duration: f64,
    pub rate: f64,
    pub position: f64,
}

impl From<TrackProgress> for PositionState {
    fn from(progress: TrackProgress) -> Self {
        Self {
            duration: progress.duration,
            rate: 1.0,
            position: progress.position.min(progress.duration),
        }
    }
}

/// Result of an async schedule operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The new batch is live
    Applied,

    /// A newer operation started while this one was decoding; its result was dropped
    Superseded,
}
