mod audio;
mod playlist;
mod track;

pub use audio::{AudioBuffer, AudioFormat, DecodedBuffer, SampleRate};
pub use playlist::Playlist;
pub use track::{Artwork, Track};
