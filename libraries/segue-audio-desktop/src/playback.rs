//! Desktop playback integration
//!
//! Combines `BatchPlayer` with the CPAL engine, the Symphonia decoder and a
//! channel-backed media session.

use crate::engine::{default_output_rate, CpalEngine};
use crate::session::{ChannelMetadataSink, MediaSessionUpdate};
use crate::sources::DesktopFetcher;
use crossbeam_channel::Receiver;
use segue_audio::SymphoniaDecoder;
use segue_core::{Playlist, SourceFetcher};
use segue_playback::{BatchPlayer, EngineProvider, PlayerConfig, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Desktop playback system
///
/// The audio device is opened on the first `play`, not here, so building
/// one on a machine without output never fails. Built inside a Tokio
/// runtime, it also reports the position every `position_interval_ms`
/// while playing.
pub struct DesktopPlayback {
    player: BatchPlayer,
    updates: Receiver<MediaSessionUpdate>,
    output_rate: Option<u32>,
    position_task: Option<JoinHandle<()>>,
}

impl DesktopPlayback {
    /// Create desktop playback reading `http(s)://` and file sources
    pub fn new(playlist: Playlist, config: PlayerConfig) -> Result<Self> {
        Self::with_fetcher(playlist, config, Arc::new(DesktopFetcher::default()))
    }

    /// Create desktop playback with settings from `path` and `SEGUE_*` variables
    pub fn from_config_file(playlist: Playlist, path: Option<&Path>) -> Result<Self> {
        Self::new(playlist, PlayerConfig::load(path)?)
    }

    /// Create desktop playback with a custom fetcher
    pub fn with_fetcher(
        playlist: Playlist,
        config: PlayerConfig,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Result<Self> {
        Self::with_provider(playlist, config, fetcher, CpalEngine::provider())
    }

    /// Create desktop playback on another output engine
    pub fn with_provider(
        playlist: Playlist,
        config: PlayerConfig,
        fetcher: Arc<dyn SourceFetcher>,
        provider: impl EngineProvider + 'static,
    ) -> Result<Self> {
        // Decoding straight to the device rate keeps resampling off the play path
        let output_rate = default_output_rate();
        let decoder = match output_rate {
            Some(rate) => SymphoniaDecoder::with_target_rate(rate),
            None => SymphoniaDecoder::new(),
        };

        let interval = config.position_interval();
        let (sink, updates) = ChannelMetadataSink::new();
        let player = BatchPlayer::builder(playlist, fetcher, Arc::new(decoder), provider)
            .config(config)
            .sink(Arc::new(sink))
            .build()?;

        let position_task = match Handle::try_current() {
            Ok(_) => Some(player.spawn_position_updates(interval)),
            Err(_) => {
                debug!("No Tokio runtime, position updates only on state changes");
                None
            }
        };

        info!(
            tracks = player.playlist().len(),
            batch_size = %player.batch_size(),
            output_rate = ?output_rate,
            "Desktop playback ready"
        );

        Ok(Self {
            player,
            updates,
            output_rate,
            position_task,
        })
    }

    /// The player; clone it to drive playback from other tasks
    pub fn player(&self) -> &BatchPlayer {
        &self.player
    }

    /// Media session updates for the host shell
    pub fn updates(&self) -> &Receiver<MediaSessionUpdate> {
        &self.updates
    }

    /// Sample rate sources are decoded to, when a device was found
    pub fn output_rate(&self) -> Option<u32> {
        self.output_rate
    }

    /// Whether the periodic position task is running
    pub fn reports_position(&self) -> bool {
        self.position_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for DesktopPlayback {
    fn drop(&mut self) {
        if let Some(task) = self.position_task.take() {
            task.abort();
        }
    }
}
