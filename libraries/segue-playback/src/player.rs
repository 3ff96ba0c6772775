//! Batch player
//!
//! Wires the buffer cache, scheduler, notifier and media session together
//! and drives the async half of every operation.

use crate::cache::BufferCache;
use crate::config::PlayerConfig;
use crate::engine::EngineProvider;
use crate::error::Result;
use crate::events::{EventQueue, PlayerEvent};
use crate::notifier::Notifier;
use crate::scheduler::{PlayAction, Scheduler};
use crate::session::{MediaSession, MetadataSink};
use crate::types::{
    BatchProgress, BatchSize, NowPlaying, PlaybackState, PositionState, ScheduleOutcome, Segment,
    TrackProgress,
};
use segue_core::{AudioDecoder, DecodedBuffer, Playlist, SourceFetcher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Builder for `BatchPlayer`
pub struct BatchPlayerBuilder {
    playlist: Playlist,
    config: PlayerConfig,
    fetcher: Arc<dyn SourceFetcher>,
    decoder: Arc<dyn AudioDecoder>,
    provider: Box<dyn EngineProvider>,
    session: MediaSession,
}

impl BatchPlayerBuilder {
    #[must_use]
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn MetadataSink>) -> Self {
        self.session = MediaSession::new(sink);
        self
    }

    pub fn build(self) -> Result<BatchPlayer> {
        self.config.validate()?;

        let cache = BufferCache::new(self.fetcher, self.decoder, self.config.max_cached);
        let scheduler = Scheduler::new(self.playlist, &self.config, self.provider);
        let notifier = Notifier::new(self.config.notify_ahead);

        Ok(BatchPlayer {
            inner: Arc::new(Inner {
                config: self.config,
                cache,
                scheduler: Mutex::new(scheduler),
                notifier,
                session: self.session,
                events: EventQueue::default(),
                published: Mutex::new(None),
            }),
        })
    }
}

/// Gapless batch player
///
/// Cheap to clone; clones drive the same player.
///
/// # Example
///
/// ```rust,no_run
/// use segue_playback::{BatchPlayer, PlayerConfig, VirtualEngine};
/// # use segue_core::{AudioDecoder, Playlist, SourceFetcher, Track};
/// # use std::sync::Arc;
/// # async fn example(
/// #     fetcher: Arc<dyn SourceFetcher>,
/// #     decoder: Arc<dyn AudioDecoder>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let playlist = Playlist::new(vec![
///     Track::new("/music/01.flac", "Intro", "Artist"),
///     Track::new("/music/02.flac", "Theme", "Artist"),
/// ])?;
///
/// let engine = VirtualEngine::new();
/// let player = BatchPlayer::builder(playlist, fetcher, decoder, engine.provider())
///     .config(PlayerConfig::default())
///     .build()?;
///
/// player.play().await?;
/// player.next().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BatchPlayer {
    inner: Arc<Inner>,
}

struct Inner {
    config: PlayerConfig,
    cache: BufferCache,
    scheduler: Mutex<Scheduler>,
    notifier: Notifier,
    session: MediaSession,
    events: EventQueue,
    /// Track index last pushed to the session
    published: Mutex<Option<usize>>,
}

impl BatchPlayer {
    pub fn builder(
        playlist: Playlist,
        fetcher: Arc<dyn SourceFetcher>,
        decoder: Arc<dyn AudioDecoder>,
        provider: impl EngineProvider + 'static,
    ) -> BatchPlayerBuilder {
        BatchPlayerBuilder {
            playlist,
            config: PlayerConfig::default(),
            fetcher,
            decoder,
            provider: Box::new(provider),
            session: MediaSession::disabled(),
        }
    }

    fn report<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(operation, error = %err, "Playback operation failed");
            self.inner.events.push(PlayerEvent::Error {
                message: err.to_string(),
            });
        }
        result
    }

    // ===== Playback Control =====

    /// Start or resume playback
    ///
    /// Schedules a batch from the cursor when nothing is scheduled, and from
    /// the track after the batch when the clock ran past its end.
    pub async fn play(&self) -> Result<()> {
        let result = self.inner.play().await;
        self.report("play", result)
    }

    /// Pause playback
    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Pause when playing, play otherwise
    pub async fn toggle(&self) -> Result<()> {
        let should_pause = self.inner.scheduler().should_pause();
        if should_pause {
            self.inner.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    /// Skip to the next track (wrapping)
    pub async fn next(&self) -> Result<ScheduleOutcome> {
        let (target, autostart) = {
            let scheduler = self.inner.scheduler();
            (scheduler.next_target(), scheduler.is_playing())
        };
        let result = self.inner.rebuild(target, autostart).await;
        self.report("next", result)
    }

    /// Restart the current track, or go back one if it just started
    pub async fn prev(&self) -> Result<ScheduleOutcome> {
        let (target, autostart) = {
            let scheduler = self.inner.scheduler();
            (scheduler.prev_target(), scheduler.is_playing())
        };
        let result = self.inner.rebuild(target, autostart).await;
        self.report("prev", result)
    }

    /// Jump to `position` seconds into the current track
    pub async fn seek_to(&self, position: f64) -> Result<ScheduleOutcome> {
        let result = self.inner.seek(position).await;
        self.report("seek", result)
    }

    /// Move `delta` seconds from the current position
    ///
    /// Before the start seeks to 0; past the end skips to the next track.
    pub async fn seek_relative(&self, delta: f64) -> Result<ScheduleOutcome> {
        let progress = self.inner.scheduler().track_progress();
        let result = match progress {
            None => self.inner.seek(delta.max(0.0)).await,
            Some(progress) => {
                let target = progress.position + delta;
                if target < 0.0 {
                    self.inner.seek(0.0).await
                } else if target >= progress.duration {
                    let (next, autostart) = {
                        let scheduler = self.inner.scheduler();
                        (scheduler.next_target(), scheduler.is_playing())
                    };
                    self.inner.rebuild(next, autostart).await
                } else {
                    self.inner.seek(target).await
                }
            }
        };
        self.report("seek_relative", result)
    }

    /// Schedule a fresh batch starting at `start_index`
    pub async fn rebuild_from(&self, start_index: usize, autostart: bool) -> Result<ScheduleOutcome> {
        let result = self.inner.rebuild(start_index, autostart).await;
        self.report("rebuild", result)
    }

    // ===== Settings =====

    /// Replace the playlist; playback stops
    pub fn set_playlist(&self, playlist: Playlist) {
        let len = playlist.len();
        let cursor = {
            let mut scheduler = self.inner.scheduler();
            scheduler.set_playlist(playlist);
            scheduler.cursor()
        };
        self.inner.notifier.cancel();
        *self.inner.published() = None;
        self.inner.publish_state(PlaybackState::Idle);
        info!(tracks = len, cursor, "Playlist replaced");
    }

    /// Change the batch size, rebuilding from the current track if a batch is live
    pub async fn set_batch_size(&self, size: BatchSize) -> Result<()> {
        let result = self.inner.set_batch_size(size).await;
        self.report("set_batch_size", result)
    }

    /// Set output gain (0.0 - 1.0)
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let result = self.inner.scheduler().set_volume(volume);
        self.report("set_volume", result)
    }

    // ===== Position =====

    /// Push the current position to the session
    pub fn sync_position(&self) {
        self.inner.push_position();
    }

    /// Re-derive the current track from the clock after a wake-up
    pub fn resync(&self) {
        self.inner.resync();
    }

    /// Report the position every `interval` while playing
    ///
    /// The task ends once every player handle is dropped.
    pub fn spawn_position_updates(&self, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let playing = inner.scheduler().is_playing();
                if playing {
                    inner.push_position();
                }
            }
        })
    }

    // ===== Queries =====

    pub fn state(&self) -> PlaybackState {
        self.inner.scheduler().state()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.scheduler().is_playing()
    }

    pub fn current_index(&self) -> usize {
        self.inner.scheduler().current_index()
    }

    pub fn current_segment(&self) -> Option<Segment> {
        self.inner.scheduler().current_segment()
    }

    pub fn track_progress(&self) -> Option<TrackProgress> {
        self.inner.scheduler().track_progress()
    }

    pub fn batch_progress(&self) -> BatchProgress {
        self.inner.scheduler().batch_progress()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.inner.scheduler().segments()
    }

    pub fn cursor(&self) -> usize {
        self.inner.scheduler().cursor()
    }

    pub fn now(&self) -> f64 {
        self.inner.scheduler().now()
    }

    pub fn playlist(&self) -> Playlist {
        self.inner.scheduler().playlist().clone()
    }

    pub fn batch_size(&self) -> BatchSize {
        self.inner.scheduler().batch_size()
    }

    pub fn volume(&self) -> f32 {
        self.inner.scheduler().volume()
    }

    pub fn generation(&self) -> u64 {
        self.inner.scheduler().generation()
    }

    pub fn cache(&self) -> &BufferCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Timers waiting to announce upcoming tracks
    pub fn pending_notifications(&self) -> usize {
        self.inner.notifier.pending()
    }

    // ===== Events =====

    /// Take every event queued since the last call
    pub fn drain_events(&self) -> Vec<PlayerEvent> {
        self.inner.events.drain()
    }

    pub fn has_pending_events(&self) -> bool {
        self.inner.events.has_pending()
    }
}

impl Inner {
    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn published(&self) -> MutexGuard<'_, Option<usize>> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch and decode sequentially, in batch order
    async fn load(&self, sources: &[String]) -> Result<Vec<DecodedBuffer>> {
        let mut buffers = Vec::with_capacity(sources.len());
        for source in sources {
            buffers.push(self.cache.get(source).await?);
        }
        Ok(buffers)
    }

    async fn play(self: &Arc<Self>) -> Result<()> {
        let action = self.scheduler().play_action()?;
        match action {
            PlayAction::Rebuild(index) => self.rebuild(index, true).await.map(|_| ()),
            PlayAction::Resumed { changed } => {
                if changed {
                    self.publish_state(PlaybackState::Playing);
                }
                self.arm_notifier();
                self.push_position();
                Ok(())
            }
        }
    }

    fn pause(&self) {
        let changed = self.scheduler().pause();
        self.notifier.cancel();
        if changed {
            self.publish_state(PlaybackState::Paused);
        }
    }

    async fn rebuild(self: &Arc<Self>, start_index: usize, autostart: bool) -> Result<ScheduleOutcome> {
        let plan = self.scheduler().begin_rebuild(start_index)?;
        self.notifier.cancel();

        let buffers = match self.load(&plan.sources).await {
            Ok(buffers) => buffers,
            Err(err) => {
                let current = self.scheduler().fail_rebuild(plan.generation);
                if !current {
                    return Ok(self.superseded(plan.generation));
                }
                self.publish_state(PlaybackState::Idle);
                return Err(err);
            }
        };

        let outcome = self.scheduler().commit_rebuild(&plan, buffers, autostart);
        self.finish(outcome, plan.generation, plan.start_index)
    }

    async fn seek(self: &Arc<Self>, position: f64) -> Result<ScheduleOutcome> {
        let plan = self.scheduler().begin_seek(position)?;

        let buffers = match self.load(&plan.sources).await {
            Ok(buffers) => buffers,
            Err(err) => {
                // The old batch was never stopped; keep announcing it
                let (current, playing) = {
                    let scheduler = self.scheduler();
                    (scheduler.generation() == plan.generation, scheduler.is_playing())
                };
                if !current {
                    return Ok(self.superseded(plan.generation));
                }
                if playing {
                    self.arm_notifier();
                }
                return Err(err);
            }
        };

        let outcome = self.scheduler().commit_seek(&plan, buffers);
        self.finish(outcome, plan.generation, plan.track_index)
    }

    async fn set_batch_size(self: &Arc<Self>, size: BatchSize) -> Result<()> {
        let (active, current, playing) = {
            let mut scheduler = self.scheduler();
            scheduler.set_batch_size(size)?;
            (
                scheduler.has_batch(),
                scheduler.current_index(),
                scheduler.is_playing(),
            )
        };
        debug!(batch_size = %size, active, "Batch size changed");
        if active {
            self.rebuild(current, playing).await?;
        }
        Ok(())
    }

    fn finish(
        self: &Arc<Self>,
        outcome: Result<ScheduleOutcome>,
        generation: u64,
        index: usize,
    ) -> Result<ScheduleOutcome> {
        match outcome {
            Ok(ScheduleOutcome::Applied) => {
                self.after_schedule(generation, index);
                Ok(ScheduleOutcome::Applied)
            }
            Ok(ScheduleOutcome::Superseded) => Ok(self.superseded(generation)),
            Err(err) => {
                self.publish_state(PlaybackState::Idle);
                Err(err)
            }
        }
    }

    fn superseded(&self, generation: u64) -> ScheduleOutcome {
        debug!(generation, "Discarding superseded schedule");
        self.events.push(PlayerEvent::RebuildSuperseded { generation });
        ScheduleOutcome::Superseded
    }

    fn after_schedule(self: &Arc<Self>, generation: u64, index: usize) {
        let (state, segments) = {
            let scheduler = self.scheduler();
            (scheduler.state(), scheduler.segments().len())
        };

        self.events.push(PlayerEvent::BatchScheduled {
            generation,
            start_index: index,
            segments,
        });
        self.publish_track(index);
        self.publish_state(state);
        self.push_position();
        if state == PlaybackState::Playing {
            self.arm_notifier();
        }
    }

    fn publish_track(&self, index: usize) {
        let track = self.scheduler().playlist().get(index).clone();
        self.session.set_now_playing(&NowPlaying::from(&track));
        *self.published() = Some(track.index);
        self.events.push(PlayerEvent::TrackChanged {
            index: track.index,
            title: track.title,
        });
    }

    fn publish_state(&self, state: PlaybackState) {
        self.session.set_playback_state(state);
        self.events.push(PlayerEvent::StateChanged { state });
    }

    fn push_position(&self) {
        let progress = self.scheduler().track_progress();
        if let Some(progress) = progress {
            let position = PositionState::from(progress);
            self.session.set_position(&position);
            self.events.push(PlayerEvent::PositionUpdate {
                position: position.position,
                duration: position.duration,
            });
        }
    }

    /// Arm timers for every upcoming segment except the current one when its
    /// track is already published
    fn arm_notifier(self: &Arc<Self>) {
        let (segments, current, now, generation) = {
            let scheduler = self.scheduler();
            (
                scheduler.segments(),
                scheduler.current_segment(),
                scheduler.now(),
                scheduler.generation(),
            )
        };

        let published = *self.published();
        let upcoming: Vec<Segment> = segments
            .into_iter()
            .filter(|segment| {
                let announced = current.is_some_and(|c| c.start_time == segment.start_time)
                    && published == Some(segment.track_index);
                !announced
            })
            .collect();

        let weak = Arc::downgrade(self);
        self.notifier.arm(&upcoming, now, move |index| {
            if let Some(inner) = weak.upgrade() {
                inner.on_segment_start(generation, index);
            }
        });
    }

    fn on_segment_start(&self, generation: u64, index: usize) {
        let current = self.scheduler().generation() == generation;
        if !current {
            return;
        }
        debug!(generation, index, "Upcoming track announced");
        self.publish_track(index);
    }

    fn resync(self: &Arc<Self>) {
        let (current, state) = {
            let scheduler = self.scheduler();
            (
                scheduler.current_segment().map(|s| s.track_index),
                scheduler.state(),
            )
        };

        if let Some(index) = current {
            let published = *self.published();
            if published != Some(index) {
                debug!(index, ?published, "Resync found a new current track");
                self.publish_track(index);
            }
        }
        self.push_position();
        if state == PlaybackState::Playing {
            self.arm_notifier();
        }
    }
}
