//! Segue Core
//!
//! Platform-agnostic core types, traits, and error handling for Segue.
//!
//! This crate provides the foundational building blocks shared by the
//! decoder, the playback engine, and the desktop integration.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist`, `AudioBuffer`, `DecodedBuffer`
//! - **Core Traits**: `SourceFetcher`, `AudioDecoder`
//! - **Error Handling**: Unified `SegueError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use segue_core::{Playlist, Track};
//!
//! let playlist = Playlist::new(vec![
//!     Track::new("https://example.com/a.mp3", "First", "Artist"),
//!     Track::new("https://example.com/b.mp3", "Second", "Artist"),
//! ])
//! .unwrap();
//!
//! // Indexing is circular
//! assert_eq!(playlist.next_index(1), 0);
//! assert_eq!(playlist.prev_index(0), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SegueError};
pub use traits::{AudioDecoder, SourceFetcher};

pub use types::{Artwork, AudioBuffer, AudioFormat, DecodedBuffer, Playlist, SampleRate, Track};
