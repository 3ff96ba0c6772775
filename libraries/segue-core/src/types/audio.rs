/// Audio-related types
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of channels (1 = mono, 2 = stereo, etc.)
    pub channels: u16,

    /// Bits per sample
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Create a new audio format
    pub fn new(sample_rate: SampleRate, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 32-bit float stereo at the given rate (decoder output format)
    pub fn float_stereo(sample_rate: SampleRate) -> Self {
        Self::new(sample_rate, 2, 32)
    }
}

/// Audio buffer containing decoded samples
///
/// Samples are stored as f32 in the range [-1.0, 1.0]
/// Interleaved format: [L, R, L, R, ...] for stereo
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio samples (f32, interleaved)
    pub samples: Vec<f32>,

    /// Audio format information
    pub format: AudioFormat,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        match self.format.sample_rate.as_hz() {
            0 => 0.0,
            hz => self.frames() as f64 / hz as f64,
        }
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A fully decoded, playable track
///
/// Shares its samples behind an `Arc`, so a scheduled segment keeps the
/// audio alive even after the cache has evicted the entry.
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    audio: Arc<AudioBuffer>,
    duration: f64,
}

impl DecodedBuffer {
    /// Wrap a decoded audio buffer
    pub fn new(audio: AudioBuffer) -> Self {
        let duration = audio.duration_secs().max(0.0);
        Self {
            audio: Arc::new(audio),
            duration,
        }
    }

    /// Silent stereo buffer of the given length
    ///
    /// Useful for hosts without real sources and for tests; a low sample
    /// rate keeps long silent tracks cheap.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let frames = (duration_secs.max(0.0) * sample_rate as f64).round() as usize;
        let format = AudioFormat::float_stereo(SampleRate::new(sample_rate));
        let mut buffer = Self::new(AudioBuffer::new(vec![0.0; frames * 2], format));
        // Keep the requested duration exact rather than frame-rounded
        buffer.duration = duration_secs.max(0.0);
        buffer
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Shared decoded samples
    pub fn audio(&self) -> &Arc<AudioBuffer> {
        &self.audio
    }

    /// Whether two handles point at the same decoded samples
    pub fn same_audio(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.audio, &other.audio)
    }
}
