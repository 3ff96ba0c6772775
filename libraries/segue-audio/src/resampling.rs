//! Whole-buffer sample rate conversion
//!
//! Decoded tracks are fully in memory, so conversion runs once over the
//! complete buffer rather than chunk-by-chunk in the audio callback. The
//! output is trimmed of the resampler's latency and has exactly
//! `round(frames * ratio)` frames, so durations survive conversion.

use crate::error::{AudioError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use segue_core::{AudioBuffer, AudioFormat, SampleRate};
use tracing::trace;

/// Frames fed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Resampling quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplingQuality {
    /// Short filter, linear interpolation
    Fast,
    /// Good default for playback
    #[default]
    Balanced,
    /// Long filter for critical listening
    High,
}

impl ResamplingQuality {
    fn params(self) -> SincInterpolationParameters {
        match self {
            Self::Fast => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.9,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::Blackman,
            },
            Self::Balanced => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris,
            },
            Self::High => SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.99,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 512,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

/// Convert `buffer` to `target_rate`
///
/// Returns a clone when the rates already match. Channel count is kept.
pub fn resample_buffer(
    buffer: &AudioBuffer,
    target_rate: u32,
    quality: ResamplingQuality,
) -> Result<AudioBuffer> {
    let source_rate = buffer.format.sample_rate.as_hz();
    let channels = buffer.format.channels as usize;

    if target_rate == 0 || source_rate == 0 {
        return Err(AudioError::ResampleError(format!(
            "Invalid rates: {} -> {}",
            source_rate, target_rate
        )));
    }

    let format = AudioFormat::new(
        SampleRate::new(target_rate),
        buffer.format.channels,
        buffer.format.bits_per_sample,
    );

    if source_rate == target_rate {
        return Ok(buffer.clone());
    }
    if buffer.is_empty() || channels == 0 {
        return Ok(AudioBuffer::new(Vec::new(), format));
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let frames = buffer.frames();
    let expected = (frames as f64 * ratio).round() as usize;

    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, quality.params(), CHUNK_FRAMES, channels)
            .map_err(|e| AudioError::ResampleError(e.to_string()))?;
    let delay = resampler.output_delay();

    let planar = deinterleave(&buffer.samples, channels);
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    let mut position = 0;
    while frames - position >= resampler.input_frames_next() {
        let take = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar
            .iter()
            .map(|ch| &ch[position..position + take])
            .collect();
        let out = resampler
            .process(&chunk, None)
            .map_err(|e| AudioError::ResampleError(e.to_string()))?;
        append(&mut output, out);
        position += take;
    }

    if position < frames {
        let rest: Vec<&[f32]> = planar.iter().map(|ch| &ch[position..]).collect();
        let out = resampler
            .process_partial(Some(&rest), None)
            .map_err(|e| AudioError::ResampleError(e.to_string()))?;
        append(&mut output, out);
    }

    // Drain the filter tail until the delayed signal is complete
    while output[0].len() < expected + delay {
        let out = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| AudioError::ResampleError(e.to_string()))?;
        if out.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut output, out);
    }

    let mut samples = Vec::with_capacity(expected * channels);
    for frame in delay..delay + expected {
        for ch in &output {
            samples.push(ch.get(frame).copied().unwrap_or(0.0));
        }
    }

    trace!(
        from = source_rate,
        to = target_rate,
        frames_in = frames,
        frames_out = expected,
        "Resampled buffer"
    );

    Ok(AudioBuffer::new(samples, format))
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in planar.iter_mut().zip(frame) {
            ch.push(*sample);
        }
    }
    planar
}

fn append(output: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
    for (dst, src) in output.iter_mut().zip(chunk) {
        dst.extend(src);
    }
}
