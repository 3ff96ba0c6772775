//! Error types for batch playback

use segue_core::SegueError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Source bytes could not be retrieved
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Source bytes could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The audio engine could not be created or driven
    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Playlist has no tracks
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Volume outside 0.0..=1.0
    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),

    /// Batch size of zero or unparsable
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Engine has no voice with this id (or it already ended)
    #[error("Voice not found: {0}")]
    VoiceNotFound(u64),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SegueError> for PlaybackError {
    fn from(err: SegueError) -> Self {
        match err {
            SegueError::Fetch(msg) => PlaybackError::Fetch(msg),
            SegueError::Decode(msg) => PlaybackError::Decode(msg),
            SegueError::EngineUnavailable(msg) => PlaybackError::EngineUnavailable(msg),
            SegueError::EmptyPlaylist => PlaybackError::EmptyPlaylist,
            SegueError::Io(e) => PlaybackError::Fetch(e.to_string()),
            SegueError::InvalidInput(msg) | SegueError::Other(msg) => {
                PlaybackError::Config(msg)
            }
        }
    }
}

impl From<config::ConfigError> for PlaybackError {
    fn from(err: config::ConfigError) -> Self {
        PlaybackError::Config(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
