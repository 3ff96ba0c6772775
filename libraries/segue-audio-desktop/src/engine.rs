//! CPAL-backed audio engine
//!
//! A dedicated audio thread owns the CPAL stream, so the engine itself stays
//! `Send` on every platform. The clock is the number of frames the device
//! callback has rendered while running; it is frozen while suspended.
//! Voices are mixed sample-accurately from their start frame.

use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use segue_audio::{resample_buffer, ResamplingQuality};
use segue_core::{AudioBuffer, DecodedBuffer};
use segue_playback::{AudioEngine, EngineProvider, PlaybackError, VoiceId};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Commands sent to the audio thread
enum AudioCommand {
    /// Start the device stream
    Resume(Sender<Result<()>>),
    /// Pause the device stream
    Suspend,
    /// Shutdown the audio thread
    Shutdown,
}

/// One buffer placed on the clock
struct Voice {
    id: VoiceId,
    audio: Arc<AudioBuffer>,
    /// Clock frame the voice starts sounding
    start_frame: u64,
    /// First buffer frame played
    first_frame: usize,
}

impl Voice {
    /// Clock frame after the last sample
    fn end_frame(&self) -> u64 {
        self.start_frame + self.audio.frames().saturating_sub(self.first_frame) as u64
    }

    /// Stereo pair sounding at `clock`, if any
    fn frame_at(&self, clock: u64) -> Option<(f32, f32)> {
        if clock < self.start_frame {
            return None;
        }
        let index = self.first_frame + (clock - self.start_frame) as usize;
        if index >= self.audio.frames() {
            return None;
        }

        let channels = self.audio.format.channels as usize;
        let base = index * channels;
        let samples = &self.audio.samples;
        Some(if channels == 1 {
            (samples[base], samples[base])
        } else {
            (samples[base], samples[base + 1])
        })
    }
}

/// State shared between the engine handle and the audio callback
struct Shared {
    /// Frames rendered while running
    frames: AtomicU64,
    running: AtomicBool,
    /// Gain as f32 bits
    gain: AtomicU32,
    voices: Mutex<Vec<Voice>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            frames: AtomicU64::new(0),
            running: AtomicBool::new(false),
            gain: AtomicU32::new(1.0f32.to_bits()),
            voices: Mutex::new(Vec::new()),
        }
    }

    fn voices(&self) -> MutexGuard<'_, Vec<Voice>> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Add a stereo pair to one device frame
fn write_stereo(frame: &mut [f32], left: f32, right: f32) {
    match frame {
        [] => {}
        [mono] => *mono += (left + right) * 0.5,
        [l, r, ..] => {
            *l += left;
            *r += right;
        }
    }
}

/// Render `voices` into an interleaved device buffer starting at `base_frame`
fn mix(output: &mut [f32], channels: usize, voices: &[Voice], base_frame: u64, gain: f32) {
    output.fill(0.0);
    if channels == 0 {
        return;
    }

    for (i, frame) in output.chunks_exact_mut(channels).enumerate() {
        let clock = base_frame + i as u64;
        for voice in voices {
            if let Some((left, right)) = voice.frame_at(clock) {
                write_stereo(frame, left * gain, right * gain);
            }
        }
    }

    for sample in output.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

/// Output device sample rate, if a default device exists
pub fn default_output_rate() -> Option<u32> {
    let device = cpal::default_host().default_output_device()?;
    let config = device.default_output_config().ok()?;
    Some(config.sample_rate())
}

/// CPAL audio engine
///
/// **Architecture**: The CPAL `Stream` lives on a dedicated audio thread.
/// This handle talks to it over a channel and shares the clock and voice
/// list with the device callback.
pub struct CpalEngine {
    command_tx: Sender<AudioCommand>,
    shared: Arc<Shared>,
    sample_rate: u32,
    channels: usize,
    quality: ResamplingQuality,
    next_voice: u64,
    _audio_thread: Option<JoinHandle<()>>,
}

impl CpalEngine {
    /// Open the default output device
    ///
    /// The engine starts suspended at clock 0.
    ///
    /// # Errors
    /// Returns an error if no device is found or the stream cannot be built
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared::new());
        let (command_tx, command_rx) = bounded::<AudioCommand>(32);
        let (ready_tx, ready_rx) = bounded::<Result<(u32, usize)>>(1);

        let thread_shared = Arc::clone(&shared);
        let audio_thread = thread::Builder::new()
            .name("segue-audio".to_string())
            .spawn(move || Self::audio_thread_run(thread_shared, command_rx, ready_tx))
            .map_err(|e| AudioError::ThreadGone(e.to_string()))?;

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|e| AudioError::ThreadGone(e.to_string()))??;

        info!(sample_rate, channels, "Audio engine opened");

        Ok(Self {
            command_tx,
            shared,
            sample_rate,
            channels,
            quality: ResamplingQuality::default(),
            next_voice: 0,
            _audio_thread: Some(audio_thread),
        })
    }

    /// Quality used when a buffer arrives at another sample rate
    #[must_use]
    pub fn with_quality(mut self, quality: ResamplingQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Device channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Provider opening a new engine on first use
    pub fn provider() -> impl EngineProvider + 'static {
        || -> segue_playback::Result<Box<dyn AudioEngine>> {
            let engine = CpalEngine::new()?;
            Ok(Box::new(engine))
        }
    }

    /// Audio thread main loop
    ///
    /// Owns the CPAL Stream for its whole life and reports the outcome of
    /// opening it through `ready_tx`.
    fn audio_thread_run(
        shared: Arc<Shared>,
        command_rx: Receiver<AudioCommand>,
        ready_tx: Sender<Result<(u32, usize)>>,
    ) {
        let stream = match Self::open_stream(&shared) {
            Ok((stream, sample_rate, channels)) => {
                let _ = ready_tx.send(Ok((sample_rate, channels)));
                stream
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                AudioCommand::Resume(reply) => {
                    let result = stream.play().map_err(AudioError::from);
                    if result.is_ok() {
                        shared.running.store(true, Ordering::Release);
                    }
                    let _ = reply.send(result);
                }
                AudioCommand::Suspend => {
                    // Some backends cannot pause; the clock is frozen by the flag anyway
                    if let Err(e) = stream.pause() {
                        debug!(error = %e, "Stream pause not supported");
                    }
                }
                AudioCommand::Shutdown => break,
            }
        }

        drop(stream);
        debug!("Audio thread exited");
    }

    fn open_stream(shared: &Arc<Shared>) -> Result<(Stream, u32, usize)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound)?;

        let supported = device.default_output_config()?;
        let sample_rate = supported.sample_rate();
        let config: StreamConfig = supported.config();
        let channels = config.channels as usize;

        let callback_state = Arc::clone(shared);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                Self::audio_callback(data, channels, &callback_state);
            },
            |err| error!(error = %err, "Audio stream error"),
            None,
        )?;

        Ok((stream, sample_rate, channels))
    }

    /// Audio callback function (runs in real-time audio thread)
    fn audio_callback(output: &mut [f32], channels: usize, shared: &Shared) {
        if !shared.running.load(Ordering::Acquire) || channels == 0 {
            output.fill(0.0);
            return;
        }

        let base = shared.frames.load(Ordering::Acquire);
        let gain = f32::from_bits(shared.gain.load(Ordering::Relaxed));
        let end = base + (output.len() / channels) as u64;

        let mut voices = shared.voices();
        mix(output, channels, &voices, base, gain);
        voices.retain(|voice| voice.end_frame() > end);
        drop(voices);

        shared.frames.store(end, Ordering::Release);
    }

    /// The buffer's audio at the device rate
    fn at_device_rate(&self, buffer: &DecodedBuffer) -> Result<Arc<AudioBuffer>> {
        let audio = buffer.audio();
        let source_rate = audio.format.sample_rate.as_hz();
        if source_rate == self.sample_rate {
            return Ok(Arc::clone(audio));
        }

        debug!(
            source_rate,
            target_rate = self.sample_rate,
            "Resampling buffer for output device"
        );
        Ok(Arc::new(resample_buffer(audio, self.sample_rate, self.quality)?))
    }
}

impl AudioEngine for CpalEngine {
    fn now(&self) -> f64 {
        self.shared.frames.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn resume(&mut self) -> segue_playback::Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(AudioCommand::Resume(reply_tx))
            .map_err(|e| AudioError::ThreadGone(e.to_string()))?;
        reply_rx
            .recv()
            .map_err(|e| AudioError::ThreadGone(e.to_string()))??;
        Ok(())
    }

    fn suspend(&mut self) -> segue_playback::Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.shared.running.store(false, Ordering::Release);
        self.command_tx
            .send(AudioCommand::Suspend)
            .map_err(|e| AudioError::ThreadGone(e.to_string()))?;
        Ok(())
    }

    fn start_voice(
        &mut self,
        buffer: DecodedBuffer,
        when: f64,
        offset: f64,
    ) -> segue_playback::Result<VoiceId> {
        if buffer.audio().format.channels == 0 {
            return Err(PlaybackError::Decode("buffer has no channels".to_string()));
        }

        let audio = self.at_device_rate(&buffer)?;
        let rate = f64::from(self.sample_rate);
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;

        let voice = Voice {
            id,
            audio,
            start_frame: (when.max(0.0) * rate).round() as u64,
            first_frame: (offset.max(0.0) * rate).round() as usize,
        };
        debug!(voice = %id, when, offset, "Voice scheduled");
        self.shared.voices().push(voice);
        Ok(id)
    }

    fn stop_voice(&mut self, voice: VoiceId) -> segue_playback::Result<()> {
        let mut voices = self.shared.voices();
        match voices.iter().position(|v| v.id == voice) {
            Some(index) => {
                voices.remove(index);
                Ok(())
            }
            None => Err(PlaybackError::VoiceNotFound(voice.0)),
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.shared
            .gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        // Audio thread drops the stream and exits
        let _ = self.command_tx.send(AudioCommand::Shutdown);
    }
}
