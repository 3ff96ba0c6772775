//! Timeline scheduler
//!
//! Owns the engine, the live batch and the cursor. Every method is
//! synchronous; the async parts of a rebuild or seek (fetch and decode)
//! happen between a `begin_*` call, which captures a generation, and the
//! matching `commit_*`, which applies the result only if no newer
//! operation has started since.

use crate::config::PlayerConfig;
use crate::engine::{AudioEngine, EngineProvider, VoiceId};
use crate::error::{PlaybackError, Result};
use crate::timeline::{self, Placement};
use crate::types::{
    BatchProgress, BatchSize, PlaybackState, ScheduleOutcome, Segment, TrackProgress,
};
use segue_core::{DecodedBuffer, Playlist};
use tracing::{debug, info};

/// A segment and the engine voice playing it
struct ScheduledVoice {
    segment: Segment,
    voice: VoiceId,
    // Keeps the samples alive even if the cache evicts them
    _buffer: DecodedBuffer,
}

/// Tracks to decode for a rebuild
#[derive(Debug, Clone)]
pub struct RebuildPlan {
    pub generation: u64,
    pub start_index: usize,
    pub indices: Vec<usize>,
    pub sources: Vec<String>,
}

/// Tracks to decode for a seek
#[derive(Debug, Clone)]
pub struct SeekPlan {
    pub generation: u64,
    pub track_index: usize,
    pub position: f64,
    pub indices: Vec<usize>,
    pub sources: Vec<String>,
}

/// What `play` has to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    /// Nothing scheduled or the batch ran out: rebuild from this index
    Rebuild(usize),
    /// Clock resumed over the existing batch
    Resumed {
        /// State was not `Playing` before
        changed: bool,
    },
}

pub struct Scheduler {
    provider: Box<dyn EngineProvider>,
    engine: Option<Box<dyn AudioEngine>>,
    playlist: Playlist,
    batch_size: BatchSize,
    batch: Vec<ScheduledVoice>,
    cursor: usize,
    state: PlaybackState,
    generation: u64,
    volume: f32,
    lead_time: f64,
    seek_lead: f64,
    seek_end_guard: f64,
    restart_threshold: f64,
}

impl Scheduler {
    pub fn new(playlist: Playlist, config: &PlayerConfig, provider: Box<dyn EngineProvider>) -> Self {
        Self {
            provider,
            engine: None,
            cursor: playlist.wrap(config.initial_cursor),
            playlist,
            batch_size: config.batch_size,
            batch: Vec::new(),
            state: PlaybackState::Idle,
            generation: 0,
            volume: config.volume.clamp(0.0, 1.0),
            lead_time: config.lead_time,
            seek_lead: config.seek_lead,
            seek_end_guard: config.seek_end_guard,
            restart_threshold: config.restart_threshold,
        }
    }

    /// Engine, created on first use
    fn ensure_engine(&mut self) -> Result<&mut dyn AudioEngine> {
        if self.engine.is_none() {
            let mut engine = self.provider.create()?;
            engine.set_gain(self.volume);
            info!(sample_rate = engine.sample_rate(), "Audio engine created");
            self.engine = Some(engine);
        }
        match self.engine.as_deref_mut() {
            Some(engine) => Ok(engine),
            None => Err(PlaybackError::EngineUnavailable(
                "engine was not created".to_string(),
            )),
        }
    }

    /// Stop every voice and forget the batch
    fn stop_batch(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        let Some(engine) = self.engine.as_deref_mut() else {
            return;
        };
        for scheduled in batch {
            if let Err(e) = engine.stop_voice(scheduled.voice) {
                debug!(voice = %scheduled.voice, error = %e, "Ignoring voice stop failure");
            }
        }
    }

    fn suspend_clock(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            if let Err(e) = engine.suspend() {
                debug!(error = %e, "Ignoring suspend failure");
            }
        }
    }

    /// Drop the batch and go idle
    fn abandon(&mut self) {
        self.stop_batch();
        self.suspend_clock();
        self.state = PlaybackState::Idle;
    }

    /// Start a voice per segment; on failure nothing stays scheduled
    fn start_segments(&mut self, segments: Vec<Segment>, buffers: Vec<DecodedBuffer>) -> Result<()> {
        let engine = self.ensure_engine()?;
        let mut started = Vec::with_capacity(segments.len());
        let mut failure = None;

        for (segment, buffer) in segments.into_iter().zip(buffers) {
            match engine.start_voice(buffer.clone(), segment.start_time, segment.start_offset) {
                Ok(voice) => started.push(ScheduledVoice {
                    segment,
                    voice,
                    _buffer: buffer,
                }),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.batch = started;
        match failure {
            Some(e) => {
                self.abandon();
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Apply the play state after a new batch went live
    fn settle(&mut self, run: bool) -> Result<()> {
        if run {
            let resumed = self.ensure_engine()?.resume();
            if let Err(e) = resumed {
                self.abandon();
                return Err(e);
            }
            self.state = PlaybackState::Playing;
        } else {
            self.suspend_clock();
            self.state = PlaybackState::Paused;
        }
        Ok(())
    }

    fn plan_sources(&self, start: usize) -> (Vec<usize>, Vec<String>) {
        let count = self.batch_size.count(self.playlist.len());
        let indices = timeline::batch_indices(start, count, self.playlist.len());
        let sources = indices
            .iter()
            .map(|&i| self.playlist[i].source_key.clone())
            .collect();
        (indices, sources)
    }

    // ===== Rebuild =====

    /// Stop the current batch and plan a new one from `start_index`
    pub fn begin_rebuild(&mut self, start_index: usize) -> Result<RebuildPlan> {
        self.ensure_engine()?;
        self.generation += 1;
        self.stop_batch();

        let start_index = self.playlist.wrap(start_index);
        let (indices, sources) = self.plan_sources(start_index);

        debug!(
            generation = self.generation,
            start_index,
            count = indices.len(),
            "Rebuild started"
        );

        Ok(RebuildPlan {
            generation: self.generation,
            start_index,
            indices,
            sources,
        })
    }

    /// Lay out decoded buffers back-to-back after the lead time
    pub fn commit_rebuild(
        &mut self,
        plan: &RebuildPlan,
        buffers: Vec<DecodedBuffer>,
        autostart: bool,
    ) -> Result<ScheduleOutcome> {
        if plan.generation != self.generation {
            return Ok(ScheduleOutcome::Superseded);
        }

        let placements: Vec<Placement> = plan
            .indices
            .iter()
            .zip(&buffers)
            .map(|(&index, buffer)| Placement::whole(index, buffer.duration()))
            .collect();

        let lead_time = self.lead_time;
        let start_at = self.ensure_engine()?.now() + lead_time;
        let segments = timeline::layout(start_at, &placements);
        let count = segments.len();

        self.start_segments(segments, buffers)?;
        self.cursor = plan.start_index;
        self.settle(autostart)?;

        info!(
            generation = plan.generation,
            start_index = plan.start_index,
            segments = count,
            start_at,
            autostart,
            "Batch scheduled"
        );
        Ok(ScheduleOutcome::Applied)
    }

    /// Give up on a rebuild whose decode failed
    ///
    /// Returns false (and changes nothing) if the rebuild was superseded.
    pub fn fail_rebuild(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.abandon();
        true
    }

    // ===== Seek =====

    /// Plan a seek within the current track; the live batch keeps playing
    pub fn begin_seek(&mut self, position: f64) -> Result<SeekPlan> {
        self.ensure_engine()?;
        self.generation += 1;

        let track_index = self.current_index();
        let (indices, sources) = self.plan_sources(track_index);
        let position = if position.is_nan() { 0.0 } else { position };

        debug!(
            generation = self.generation,
            track_index,
            position,
            "Seek started"
        );

        Ok(SeekPlan {
            generation: self.generation,
            track_index,
            position,
            indices,
            sources,
        })
    }

    /// Replace the batch with one starting `position` into the current track
    pub fn commit_seek(
        &mut self,
        plan: &SeekPlan,
        buffers: Vec<DecodedBuffer>,
    ) -> Result<ScheduleOutcome> {
        if plan.generation != self.generation {
            return Ok(ScheduleOutcome::Superseded);
        }

        let duration = buffers.first().map_or(0.0, DecodedBuffer::duration);
        let latest = (duration - self.seek_end_guard).max(0.0);
        let offset = plan.position.clamp(0.0, latest);

        let placements: Vec<Placement> = plan
            .indices
            .iter()
            .zip(&buffers)
            .enumerate()
            .map(|(i, (&index, buffer))| Placement {
                track_index: index,
                duration: buffer.duration(),
                start_offset: if i == 0 { offset } else { 0.0 },
            })
            .collect();

        let was_running = self.ensure_engine()?.is_running();
        self.stop_batch();

        let seek_lead = self.seek_lead;
        let start_at = self.ensure_engine()?.now() + seek_lead;
        let segments = timeline::layout(start_at, &placements);

        self.start_segments(segments, buffers)?;
        self.cursor = plan.track_index;
        self.settle(was_running)?;

        info!(
            generation = plan.generation,
            track_index = plan.track_index,
            offset,
            "Seek scheduled"
        );
        Ok(ScheduleOutcome::Applied)
    }

    // ===== Transport =====

    /// Resume the clock, or say where to rebuild from
    pub fn play_action(&mut self) -> Result<PlayAction> {
        let segments = self.segments();
        let Some(last) = segments.last() else {
            return Ok(PlayAction::Rebuild(self.cursor));
        };
        if timeline::is_exhausted(&segments, self.now()) {
            return Ok(PlayAction::Rebuild(
                self.playlist.next_index(last.track_index),
            ));
        }

        self.ensure_engine()?.resume()?;
        let changed = self.state != PlaybackState::Playing;
        self.state = PlaybackState::Playing;
        Ok(PlayAction::Resumed { changed })
    }

    /// Freeze the clock; returns true if the state changed
    pub fn pause(&mut self) -> bool {
        self.suspend_clock();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            return true;
        }
        false
    }

    /// Whether `toggle` should pause rather than play
    pub fn should_pause(&self) -> bool {
        self.is_running() && self.state == PlaybackState::Playing
    }

    /// Index `next` rebuilds from
    pub fn next_target(&self) -> usize {
        self.playlist.next_index(self.current_index())
    }

    /// Index `prev` rebuilds from: the current track once its position is
    /// past the restart threshold, otherwise the one before
    ///
    /// Position includes the start offset, so a track seeked into counts
    /// the skipped part as played.
    pub fn prev_target(&self) -> usize {
        let current = self.current_index();
        let position = self.track_progress().map_or(0.0, |p| p.position);

        if position > self.restart_threshold {
            current
        } else {
            self.playlist.prev_index(current)
        }
    }

    // ===== Settings =====

    pub fn set_batch_size(&mut self, size: BatchSize) -> Result<()> {
        if size == BatchSize::Limited(0) {
            return Err(PlaybackError::InvalidBatchSize("0".to_string()));
        }
        self.batch_size = size;
        Ok(())
    }

    /// Swap the playlist; playback stops and in-flight work is superseded
    pub fn set_playlist(&mut self, playlist: Playlist) {
        self.generation += 1;
        self.abandon();
        self.cursor = self.cursor.min(playlist.len() - 1);
        self.playlist = playlist;
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.volume = volume;
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.set_gain(volume);
        }
        Ok(())
    }

    // ===== Queries =====

    /// Clock reading (0 before the engine exists)
    pub fn now(&self) -> f64 {
        self.engine.as_deref().map_or(0.0, |engine| engine.now())
    }

    pub fn is_running(&self) -> bool {
        self.engine.as_deref().is_some_and(|engine| engine.is_running())
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.batch.iter().map(|s| s.segment).collect()
    }

    pub fn has_batch(&self) -> bool {
        !self.batch.is_empty()
    }

    pub fn current_segment(&self) -> Option<Segment> {
        let segments = self.segments();
        timeline::current_segment(&segments, self.now()).copied()
    }

    /// Track playing now, or the cursor when nothing is scheduled
    pub fn current_index(&self) -> usize {
        self.current_segment()
            .map_or(self.cursor, |segment| segment.track_index)
    }

    pub fn track_progress(&self) -> Option<TrackProgress> {
        self.current_segment()
            .map(|segment| timeline::track_progress(&segment, self.now()))
    }

    pub fn batch_progress(&self) -> BatchProgress {
        timeline::batch_progress(&self.segments(), self.now())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}
