//! Segue - Batch Playback
//!
//! Platform-agnostic gapless batch scheduling for Segue.
//!
//! This crate provides:
//! - Buffer cache (fetch + decode once, FIFO-bounded, shared in-flight loads)
//! - Timeline layout and clock queries (pure functions)
//! - Timeline scheduler (rebuild, seek, next/prev, play/pause, batch size)
//! - Track-change notifier (announces each track just before it starts)
//! - Media session output for now-playing metadata
//! - Batch player façade tying it all together
//!
//! # Architecture
//!
//! `segue-playback` is completely platform-agnostic:
//! - No dependency on CPAL (desktop audio)
//! - No dependency on a specific decoder or network stack
//!
//! Platform-specific code (audio engine, source fetching, decoding, media
//! session) is provided via traits: `AudioEngine`, `SourceFetcher`,
//! `AudioDecoder` and `MetadataSink`.
//!
//! # How batches work
//!
//! A batch is N consecutive playlist tracks, fully decoded and placed
//! back-to-back on one audio clock. The host only has to keep the clock
//! running; track boundaries need no wake-up. Every query about "what is
//! playing" is answered from the clock, so a host that was asleep for a
//! while gets the right answer as soon as it asks.
//!
//! # Example: Headless Playback
//!
//! ```rust,no_run
//! use segue_playback::{BatchPlayer, BatchSize, PlayerConfig, VirtualEngine};
//! # use segue_core::{AudioDecoder, Playlist, SourceFetcher};
//! # use std::sync::Arc;
//! # async fn example(
//! #     playlist: Playlist,
//! #     fetcher: Arc<dyn SourceFetcher>,
//! #     decoder: Arc<dyn AudioDecoder>,
//! # ) -> segue_playback::Result<()> {
//! let engine = VirtualEngine::new();
//! let config = PlayerConfig {
//!     batch_size: BatchSize::Limited(2),
//!     ..PlayerConfig::default()
//! };
//!
//! let player = BatchPlayer::builder(playlist, fetcher, decoder, engine.provider())
//!     .config(config)
//!     .build()?;
//!
//! player.play().await?;
//! engine.advance(12.0);
//! println!("now playing track {}", player.current_index());
//!
//! player.seek_relative(-5.0).await?;
//! for event in player.drain_events() {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
mod error;
pub mod events;
pub mod notifier;
mod player;
pub mod scheduler;
pub mod session;
pub mod timeline;
pub mod types;

// Public exports
pub use cache::BufferCache;
pub use config::PlayerConfig;
pub use engine::{AudioEngine, EngineProvider, VirtualEngine, VirtualVoice, VoiceId};
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use player::{BatchPlayer, BatchPlayerBuilder};
pub use session::{MediaSession, MetadataSink, NullSink, SinkCapabilities};
pub use types::{
    BatchProgress, BatchSize, NowPlaying, PlaybackState, PositionState, ScheduleOutcome, Segment,
    TrackProgress,
};
