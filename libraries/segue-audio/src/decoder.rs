/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use crate::resampling::{resample_buffer, ResamplingQuality};
use segue_core::{AudioBuffer, AudioDecoder, AudioFormat, SampleRate};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// ITU-R BS.775-1 coefficient for center and surround channels (-3dB)
const CENTER_MIX: f32 = 0.707;

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
///
/// Decodes a complete in-memory payload into interleaved stereo f32.
/// When a target rate is configured the result is resampled so buffers
/// arrive at the output device's rate.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    target_rate: Option<u32>,
    quality: ResamplingQuality,
}

impl SymphoniaDecoder {
    /// Create a decoder that keeps the source sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that resamples every buffer to `sample_rate`
    pub fn with_target_rate(sample_rate: u32) -> Self {
        Self {
            target_rate: Some(sample_rate),
            quality: ResamplingQuality::default(),
        }
    }

    /// Set the resampling quality preset
    #[must_use]
    pub fn with_quality(mut self, quality: ResamplingQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Target sample rate, if any
    pub fn target_rate(&self) -> Option<u32> {
        self.target_rate
    }

    /// Decode every packet of the default track
    fn decode_all(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<AudioBuffer> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension_hint {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::Symphonia(format!("Error reading packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame; skip it and keep the rest of the track
                    warn!(error = %e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            downmix_to_stereo(buf.samples(), channels, &mut samples);
        }

        if samples.is_empty() {
            return Err(AudioError::DecodeError("Stream contained no audio".to_string()));
        }

        Ok(AudioBuffer::new(
            samples,
            AudioFormat::float_stereo(SampleRate::new(sample_rate)),
        ))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(
        &self,
        bytes: Vec<u8>,
        extension_hint: Option<&str>,
    ) -> segue_core::Result<AudioBuffer> {
        let size = bytes.len();
        let buffer = Self::decode_all(bytes, extension_hint)?;

        debug!(
            bytes = size,
            hint = ?extension_hint,
            sample_rate = buffer.format.sample_rate.as_hz(),
            duration = buffer.duration_secs(),
            "Decoded source"
        );

        match self.target_rate {
            Some(rate) if rate != buffer.format.sample_rate.as_hz() => {
                Ok(resample_buffer(&buffer, rate, self.quality)?)
            }
            _ => Ok(buffer),
        }
    }
}

/// Append interleaved `input` with `channels` channels to `output` as stereo
///
/// Multi-channel audio is downmixed using ITU-R BS.775-1 coefficients:
/// - L_out = L + 0.707*C + 0.707*Ls
/// - R_out = R + 0.707*C + 0.707*Rs
fn downmix_to_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
    if channels == 0 {
        return;
    }

    for frame in input.chunks_exact(channels) {
        let (l, r) = match channels {
            1 => (frame[0], frame[0]),
            2 => (frame[0], frame[1]),
            3 => {
                // L, R, C
                let c = frame[2] * CENTER_MIX;
                (frame[0] + c, frame[1] + c)
            }
            4 => {
                // Quad: L, R, SL, SR
                (
                    frame[0] + frame[2] * CENTER_MIX,
                    frame[1] + frame[3] * CENTER_MIX,
                )
            }
            5 => {
                // 5.0: L, R, C, SL, SR
                let c = frame[2] * CENTER_MIX;
                (
                    frame[0] + c + frame[3] * CENTER_MIX,
                    frame[1] + c + frame[4] * CENTER_MIX,
                )
            }
            _ => {
                // 5.1 and wider: FL, FR, C, LFE, SL, SR, ...
                let c = frame[2] * CENTER_MIX;
                let lfe = frame[3] * CENTER_MIX;
                (
                    frame[0] + c + lfe + frame[4] * CENTER_MIX,
                    frame[1] + c + lfe + frame[5] * CENTER_MIX,
                )
            }
        };
        output.push(l.clamp(-1.0, 1.0));
        output.push(r.clamp(-1.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let mut out = Vec::new();
        downmix_to_stereo(&[0.25, -0.5], 1, &mut out);
        assert_eq!(out, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn stereo_passes_through() {
        let mut out = Vec::new();
        downmix_to_stereo(&[0.1, 0.2, 0.3, 0.4], 2, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn center_is_split_between_sides() {
        let mut out = Vec::new();
        downmix_to_stereo(&[0.0, 0.0, 1.0], 3, &mut out);
        assert!((out[0] - CENTER_MIX).abs() < 1e-6);
        assert!((out[1] - CENTER_MIX).abs() < 1e-6);
    }

    #[test]
    fn surround_mix_is_clamped() {
        let mut out = Vec::new();
        downmix_to_stereo(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 6, &mut out);
        assert_eq!(out, vec![1.0, 1.0]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let decoder = SymphoniaDecoder::new();
        let result = decoder.decode(b"definitely not audio".to_vec(), Some("mp3"));
        assert!(matches!(result, Err(segue_core::SegueError::Decode(_))));
    }

    #[test]
    fn target_rate_is_reported() {
        assert_eq!(SymphoniaDecoder::new().target_rate(), None);
        assert_eq!(
            SymphoniaDecoder::with_target_rate(48_000).target_rate(),
            Some(48_000)
        );
    }
}
