//! Audio engine seam
//!
//! The scheduler only needs a monotonic clock and the ability to start and
//! stop decoded buffers at clock times. Desktop hosts implement this over
//! CPAL; `VirtualEngine` implements it with a manually advanced clock.

use crate::error::{PlaybackError, Result};
use segue_core::DecodedBuffer;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Handle to one started buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Clocked audio output
///
/// The clock starts at 0 when the engine is created and advances only
/// while running. `resume` on a running engine and `suspend` on a
/// suspended one are no-ops.
pub trait AudioEngine: Send {
    /// Current clock reading in seconds
    fn now(&self) -> f64;

    /// Whether the clock is advancing
    fn is_running(&self) -> bool;

    /// Start the clock
    fn resume(&mut self) -> Result<()>;

    /// Freeze the clock
    fn suspend(&mut self) -> Result<()>;

    /// Play `buffer` from `offset` seconds in, starting at clock time `when`
    fn start_voice(&mut self, buffer: DecodedBuffer, when: f64, offset: f64) -> Result<VoiceId>;

    /// Stop a voice before it ends
    ///
    /// # Errors
    /// `VoiceNotFound` if the voice is unknown or already finished
    fn stop_voice(&mut self, voice: VoiceId) -> Result<()>;

    /// Master gain (0.0 - 1.0)
    fn set_gain(&mut self, gain: f32);

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;
}

/// Lazily creates the engine on first use
pub trait EngineProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn AudioEngine>>;
}

impl<F> EngineProvider for F
where
    F: Fn() -> Result<Box<dyn AudioEngine>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn AudioEngine>> {
        self()
    }
}

/// A voice as recorded by `VirtualEngine`
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualVoice {
    pub id: VoiceId,
    pub when: f64,
    pub offset: f64,
    pub duration: f64,
    pub stopped: bool,
}

impl VirtualVoice {
    /// Clock time the voice runs out of samples
    pub fn end_time(&self) -> f64 {
        self.when + (self.duration - self.offset).max(0.0)
    }
}

#[derive(Debug)]
struct VirtualState {
    now: f64,
    running: bool,
    gain: f32,
    sample_rate: u32,
    next_voice: u64,
    voices: Vec<VirtualVoice>,
}

/// Engine with a clock that moves only when told to
///
/// Clones share state, so a test can keep one handle to advance time and
/// inspect voices while the player owns another.
#[derive(Debug, Clone)]
pub struct VirtualEngine {
    state: Arc<Mutex<VirtualState>>,
}

impl Default for VirtualEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualEngine {
    /// Suspended engine at clock 0
    pub fn new() -> Self {
        Self::with_sample_rate(48_000)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                now: 0.0,
                running: false,
                gain: 1.0,
                sample_rate,
                next_voice: 0,
                voices: Vec::new(),
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward by `secs` if it is running
    pub fn advance(&self, secs: f64) {
        let mut state = self.state();
        if state.running {
            state.now += secs.max(0.0);
        }
    }

    /// Every voice ever started, in start order
    pub fn voices(&self) -> Vec<VirtualVoice> {
        self.state().voices.clone()
    }

    /// Voices neither stopped nor finished
    pub fn active_voices(&self) -> Vec<VirtualVoice> {
        let state = self.state();
        state
            .voices
            .iter()
            .filter(|v| !v.stopped && v.end_time() > state.now)
            .cloned()
            .collect()
    }

    /// Last gain set
    pub fn gain(&self) -> f32 {
        self.state().gain
    }

    /// Provider handing out handles to this engine
    pub fn provider(&self) -> impl EngineProvider + 'static {
        let engine = self.clone();
        move || -> Result<Box<dyn AudioEngine>> { Ok(Box::new(engine.clone())) }
    }
}

impl AudioEngine for VirtualEngine {
    fn now(&self) -> f64 {
        self.state().now
    }

    fn is_running(&self) -> bool {
        self.state().running
    }

    fn resume(&mut self) -> Result<()> {
        self.state().running = true;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        self.state().running = false;
        Ok(())
    }

    fn start_voice(&mut self, buffer: DecodedBuffer, when: f64, offset: f64) -> Result<VoiceId> {
        let mut state = self.state();
        let id = VoiceId(state.next_voice);
        state.next_voice += 1;
        state.voices.push(VirtualVoice {
            id,
            when,
            offset,
            duration: buffer.duration(),
            stopped: false,
        });
        Ok(id)
    }

    fn stop_voice(&mut self, voice: VoiceId) -> Result<()> {
        let mut state = self.state();
        let now = state.now;
        match state.voices.iter_mut().find(|v| v.id == voice) {
            Some(v) if !v.stopped && v.end_time() > now => {
                v.stopped = true;
                Ok(())
            }
            _ => Err(PlaybackError::VoiceNotFound(voice.0)),
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.state().gain = gain;
    }

    fn sample_rate(&self) -> u32 {
        self.state().sample_rate
    }
}
