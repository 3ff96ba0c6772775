//! Shared fixtures for playback integration tests
//!
//! Sources are fake: the fetched "bytes" are the track duration as text and
//! the decoder turns that into silence, so tests control durations exactly.

#![allow(dead_code)]

use async_trait::async_trait;
use segue_core::{AudioBuffer, AudioDecoder, DecodedBuffer, Playlist, SegueError, SourceFetcher, Track};
use segue_playback::{
    BatchPlayer, BatchSize, MetadataSink, NowPlaying, PlaybackState, PlayerConfig, PositionState,
    SinkCapabilities, VirtualEngine,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::Notify;

static INIT: Once = Once::new();

/// Route player logs to the test writer once per binary (`RUST_LOG` overrides)
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("segue_playback=debug"));
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(filter)
            .try_init();
    });
}

/// Low rate keeps long silent tracks cheap
pub const RATE: u32 = 100;

#[derive(Default)]
pub struct FakeFetcher {
    durations: HashMap<String, f64>,
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fetches: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(durations: &[f64]) -> Self {
        Self {
            durations: durations
                .iter()
                .enumerate()
                .map(|(i, &d)| (source_key(i), d))
                .collect(),
            ..Self::default()
        }
    }

    /// Make every fetch of track `index` fail
    pub fn fail(&self, index: usize) {
        self.failing.lock().unwrap().insert(source_key(index));
    }

    /// Hold fetches of track `index` until the returned notify fires
    pub fn gate(&self, index: usize) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(source_key(index), Arc::clone(&notify));
        notify
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, index: usize) -> usize {
        let key = source_key(index);
        self.fetches().iter().filter(|k| **k == key).count()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, key: &str) -> segue_core::Result<Vec<u8>> {
        self.fetches.lock().unwrap().push(key.to_string());

        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if self.failing.lock().unwrap().contains(key) {
            return Err(SegueError::fetch(format!("HTTP 404 for {}", key)));
        }
        let duration = self
            .durations
            .get(key)
            .ok_or_else(|| SegueError::fetch(format!("unknown source {}", key)))?;
        Ok(duration.to_string().into_bytes())
    }
}

/// Decodes "<seconds>" into that much stereo silence
pub struct SilenceDecoder;

impl AudioDecoder for SilenceDecoder {
    fn decode(&self, bytes: Vec<u8>, _hint: Option<&str>) -> segue_core::Result<AudioBuffer> {
        let text = String::from_utf8(bytes).map_err(|e| SegueError::decode(e.to_string()))?;
        let seconds: f64 = text
            .parse()
            .map_err(|_| SegueError::decode(format!("not audio: {}", text)))?;
        let buffer = DecodedBuffer::silence(seconds, RATE);
        Ok((**buffer.audio()).clone())
    }
}

/// Sink recording everything it is told
#[derive(Default)]
pub struct RecordingSink {
    pub titles: Mutex<Vec<String>>,
    pub states: Mutex<Vec<PlaybackState>>,
    pub positions: Mutex<Vec<PositionState>>,
}

impl MetadataSink for RecordingSink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities { available: true }
    }

    fn set_now_playing(&self, now_playing: &NowPlaying) {
        self.titles.lock().unwrap().push(now_playing.title.clone());
    }

    fn set_playback_state(&self, state: PlaybackState) {
        self.states.lock().unwrap().push(state);
    }

    fn set_position(&self, position: &PositionState) {
        self.positions.lock().unwrap().push(*position);
    }
}

pub fn source_key(index: usize) -> String {
    format!("https://cdn.example/tracks/{index}.wav")
}

pub fn playlist(len: usize) -> Playlist {
    Playlist::new(
        (0..len)
            .map(|i| Track::new(source_key(i), format!("Track {i}"), "Artist"))
            .collect(),
    )
    .unwrap()
}

pub struct Harness {
    pub player: BatchPlayer,
    pub engine: VirtualEngine,
    pub fetcher: Arc<FakeFetcher>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(durations: &[f64], batch_size: usize) -> Self {
        Self::with_config(
            durations,
            PlayerConfig {
                batch_size: BatchSize::Limited(batch_size),
                ..PlayerConfig::default()
            },
        )
    }

    pub fn with_config(durations: &[f64], config: PlayerConfig) -> Self {
        init_tracing();
        let engine = VirtualEngine::new();
        let fetcher = Arc::new(FakeFetcher::new(durations));
        let sink = Arc::new(RecordingSink::default());

        let player = BatchPlayer::builder(
            playlist(durations.len()),
            fetcher.clone(),
            Arc::new(SilenceDecoder),
            engine.provider(),
        )
        .config(config)
        .sink(sink.clone())
        .build()
        .unwrap();

        Self {
            player,
            engine,
            fetcher,
            sink,
        }
    }

    /// Advance the clock to `secs` after the first segment's start
    pub fn advance_past_lead(&self, secs: f64) {
        let start = self.player.segments()[0].start_time;
        let target = start + secs;
        let now = self.player.now();
        self.engine.advance(target - now);
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
