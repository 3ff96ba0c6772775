/// Core traits for Segue
use crate::error::Result;
use crate::types::AudioBuffer;
use async_trait::async_trait;

/// Source fetcher trait
///
/// Resolves a track's `source_key` to the raw encoded bytes. Implementers
/// must always request fresh bytes: the only cache the engine trusts is its
/// own in-memory buffer cache.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the encoded bytes for `source_key`
    ///
    /// # Errors
    /// Returns `SegueError::Fetch` if the source cannot be retrieved
    async fn fetch(&self, source_key: &str) -> Result<Vec<u8>>;
}

/// Audio decoder trait
///
/// Implementers decode a complete in-memory payload into an `AudioBuffer`.
/// Decoding is CPU bound; callers run it off the async executor.
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` into interleaved f32 samples
    ///
    /// `extension_hint` is the lowercase file extension of the source, if
    /// one could be derived from its key.
    ///
    /// # Errors
    /// Returns `SegueError::Decode` if the payload is not decodable audio
    fn decode(&self, bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<AudioBuffer>;
}
