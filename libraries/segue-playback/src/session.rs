//! Now-playing metadata output
//!
//! Hosts that show track info (lock screen, media keys, tray) implement
//! `MetadataSink`. `MediaSession` guards every call so hosts without one
//! need no special casing.

use crate::types::{NowPlaying, PlaybackState, PositionState};
use std::sync::Arc;

/// What the host sink can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkCapabilities {
    pub available: bool,
}

/// Receives metadata updates
pub trait MetadataSink: Send + Sync {
    fn capabilities(&self) -> SinkCapabilities;

    fn set_now_playing(&self, now_playing: &NowPlaying);

    fn set_playback_state(&self, state: PlaybackState);

    fn set_position(&self, position: &PositionState);
}

/// Sink for hosts without a media session
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetadataSink for NullSink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities { available: false }
    }

    fn set_now_playing(&self, _now_playing: &NowPlaying) {}

    fn set_playback_state(&self, _state: PlaybackState) {}

    fn set_position(&self, _position: &PositionState) {}
}

/// Optional sink wrapper; calls are dropped when no sink is available
#[derive(Clone, Default)]
pub struct MediaSession {
    sink: Option<Arc<dyn MetadataSink>>,
}

impl MediaSession {
    pub fn new(sink: Arc<dyn MetadataSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Session that ignores every update
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    fn sink(&self) -> Option<&Arc<dyn MetadataSink>> {
        self.sink
            .as_ref()
            .filter(|sink| sink.capabilities().available)
    }

    pub fn is_available(&self) -> bool {
        self.sink().is_some()
    }

    pub fn set_now_playing(&self, now_playing: &NowPlaying) {
        if let Some(sink) = self.sink() {
            sink.set_now_playing(now_playing);
        }
    }

    /// Forward state; `Idle` is reported as paused
    pub fn set_playback_state(&self, state: PlaybackState) {
        if let Some(sink) = self.sink() {
            let state = match state {
                PlaybackState::Idle => PlaybackState::Paused,
                other => other,
            };
            sink.set_playback_state(state);
        }
    }

    pub fn set_position(&self, position: &PositionState) {
        if let Some(sink) = self.sink() {
            sink.set_position(position);
        }
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("available", &self.is_available())
            .finish()
    }
}
