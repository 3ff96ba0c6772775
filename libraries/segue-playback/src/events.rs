//! Player Events
//!
//! Event-based communication for UI synchronization. Events are queued as
//! they happen and handed out by `BatchPlayer::drain_events`:
//! - State changes (idle/playing/paused)
//! - Track changes (on schedule and when the notifier fires)
//! - Batch scheduling and superseded rebuilds
//! - Position updates (periodic)
//! - Failed operations

use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Playback state changed
    StateChanged {
        /// The new playback state
        state: PlaybackState,
    },

    /// Now-playing track changed
    TrackChanged {
        /// Playlist index of the new track
        index: usize,
        /// Its title
        title: String,
    },

    /// A new batch is live on the clock
    BatchScheduled {
        generation: u64,
        /// Playlist index of the first segment
        start_index: usize,
        /// Number of segments
        segments: usize,
    },

    /// A rebuild or seek finished after a newer one started and was dropped
    RebuildSuperseded {
        generation: u64,
    },

    /// Position update (periodic, typically every second)
    PositionUpdate {
        /// Seconds into the current track
        position: f64,
        /// Current track duration
        duration: f64,
    },

    /// An operation failed
    Error {
        /// Error message
        message: String,
    },
}

/// Pending event queue
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    pending: Mutex<Vec<PlayerEvent>>,
}

impl EventQueue {
    pub(crate) fn push(&self, event: PlayerEvent) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub(crate) fn drain(&self) -> Vec<PlayerEvent> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
