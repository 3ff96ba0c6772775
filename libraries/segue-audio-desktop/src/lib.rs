//! Desktop integration for Segue
//!
//! This crate provides the desktop implementations of the playback seams:
//!
//! - `CpalEngine`: `AudioEngine` over the default CPAL output device
//! - `HttpFetcher`, `FileFetcher`, `DesktopFetcher`: `SourceFetcher`s
//! - `ChannelMetadataSink`: `MetadataSink` feeding a crossbeam channel
//! - `DesktopPlayback`: a ready-to-use player wired from the above
//!
//! # Example
//!
//! ```no_run
//! use segue_audio_desktop::{DesktopPlayback, MediaSessionUpdate};
//! use segue_core::{Playlist, Track};
//! use segue_playback::PlayerConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let playlist = Playlist::new(vec![
//!     Track::new("https://cdn.example/01.mp3", "Intro", "Artist"),
//!     Track::new("/music/02.flac", "Theme", "Artist"),
//! ])?;
//!
//! let desktop = DesktopPlayback::new(playlist, PlayerConfig::default())?;
//! desktop.player().play().await?;
//!
//! for update in desktop.updates().try_iter() {
//!     if let MediaSessionUpdate::NowPlaying(now) = update {
//!         println!("{} - {}", now.artist, now.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
mod error;
pub mod playback;
pub mod session;
pub mod sources;

pub use engine::{default_output_rate, CpalEngine};
pub use error::{AudioError, Result};
pub use playback::DesktopPlayback;
pub use session::{ChannelMetadataSink, MediaSessionUpdate};
pub use sources::{DesktopFetcher, FileFetcher, HttpFetcher, SourceKind};
