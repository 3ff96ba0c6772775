/// Core error types for Segue
use thiserror::Error;

/// Result type alias using `SegueError`
pub type Result<T> = std::result::Result<T, SegueError>;

/// Core error type for Segue
///
/// The first three variants are the failure taxonomy every schedule
/// operation surfaces to its caller.
#[derive(Error, Debug)]
pub enum SegueError {
    /// Retrieving source bytes failed (network, HTTP status, file access)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Payload could not be decoded as audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Host audio engine could not be created or resumed
    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A playlist must contain at least one track
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SegueError {
    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an engine-unavailable error
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_matching_variant() {
        assert!(matches!(SegueError::fetch("404"), SegueError::Fetch(_)));
        assert!(matches!(SegueError::decode("junk"), SegueError::Decode(_)));
        assert!(matches!(
            SegueError::engine_unavailable("no device"),
            SegueError::EngineUnavailable(_)
        ));
    }

    #[test]
    fn display_includes_context() {
        let err = SegueError::fetch("HTTP 503 for a.mp3");
        assert_eq!(err.to_string(), "Fetch error: HTTP 503 for a.mp3");
    }
}
