//! Segue Audio
//!
//! Audio decoding and sample-rate conversion for Segue.
//!
//! This crate provides:
//! - In-memory decoding via Symphonia (MP3, FLAC, OGG/Vorbis, WAV, AAC)
//! - Downmixing of any channel layout to interleaved stereo f32
//! - Whole-buffer resampling via rubato, length-exact so scheduled
//!   durations stay correct after conversion
//!
//! # Example: Decoding Audio
//!
//! ```rust,no_run
//! use segue_audio::SymphoniaDecoder;
//! use segue_core::AudioDecoder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("/music/song.flac")?;
//! let decoder = SymphoniaDecoder::new();
//! let buffer = decoder.decode(bytes, Some("flac"))?;
//!
//! println!("Decoded {:.1}s at {} Hz", buffer.duration_secs(), buffer.format.sample_rate.as_hz());
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;
pub mod resampling;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use resampling::{resample_buffer, ResamplingQuality};
