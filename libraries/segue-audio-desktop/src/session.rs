//! Media session updates over a channel
//!
//! The desktop shell (tray, media keys, OS now-playing widget) drains the
//! receiver on its own thread.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use segue_playback::{MetadataSink, NowPlaying, PlaybackState, PositionState, SinkCapabilities};
use tracing::{debug, trace};

/// Updates queued before new ones are dropped
const UPDATE_CAPACITY: usize = 64;

/// One change for the host media session
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSessionUpdate {
    NowPlaying(NowPlaying),
    State(PlaybackState),
    Position(PositionState),
}

/// `MetadataSink` that forwards every update to a channel
///
/// Never blocks the player: updates are dropped when the host stops
/// draining.
#[derive(Debug, Clone)]
pub struct ChannelMetadataSink {
    tx: Sender<MediaSessionUpdate>,
}

impl ChannelMetadataSink {
    /// Sink and the receiver the host drains
    pub fn new() -> (Self, Receiver<MediaSessionUpdate>) {
        let (tx, rx) = bounded(UPDATE_CAPACITY);
        (Self { tx }, rx)
    }

    fn send(&self, update: MediaSessionUpdate) {
        match self.tx.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                debug!(?update, "Media session queue full, update dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                trace!("Media session receiver gone");
            }
        }
    }
}

impl MetadataSink for ChannelMetadataSink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities { available: true }
    }

    fn set_now_playing(&self, now_playing: &NowPlaying) {
        self.send(MediaSessionUpdate::NowPlaying(now_playing.clone()));
    }

    fn set_playback_state(&self, state: PlaybackState) {
        self.send(MediaSessionUpdate::State(state));
    }

    fn set_position(&self, position: &PositionState) {
        self.send(MediaSessionUpdate::Position(*position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now_playing(title: &str) -> NowPlaying {
        NowPlaying {
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: None,
            artwork: Vec::new(),
        }
    }

    #[test]
    fn updates_arrive_in_order() {
        let (sink, rx) = ChannelMetadataSink::new();
        sink.set_now_playing(&now_playing("Intro"));
        sink.set_playback_state(PlaybackState::Playing);
        sink.set_position(&PositionState {
            duration: 10.0,
            rate: 1.0,
            position: 2.5,
        });

        let updates: Vec<_> = rx.try_iter().collect();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0], MediaSessionUpdate::NowPlaying(now_playing("Intro")));
        assert_eq!(updates[1], MediaSessionUpdate::State(PlaybackState::Playing));
        assert!(matches!(
            updates[2],
            MediaSessionUpdate::Position(PositionState { position, .. }) if position == 2.5
        ));
    }

    #[test]
    fn full_queue_never_blocks() {
        let (sink, rx) = ChannelMetadataSink::new();
        for _ in 0..UPDATE_CAPACITY + 10 {
            sink.set_playback_state(PlaybackState::Paused);
        }
        assert_eq!(rx.len(), UPDATE_CAPACITY);
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (sink, rx) = ChannelMetadataSink::new();
        drop(rx);
        sink.set_playback_state(PlaybackState::Playing);
    }
}
