/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Container could not be probed
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Container has no decodable audio track
    #[error("No audio tracks found")]
    NoAudioTrack,

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Sample rate conversion error
    #[error("Resample error: {0}")]
    ResampleError(String),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl From<AudioError> for segue_core::SegueError {
    fn from(err: AudioError) -> Self {
        segue_core::SegueError::decode(err.to_string())
    }
}
