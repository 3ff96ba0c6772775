/// Track domain type
use serde::{Deserialize, Serialize};

/// Artwork reference pushed to the now-playing display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    /// Image location (URL or path)
    pub src: String,

    /// Size hint such as "512x512"
    #[serde(default)]
    pub sizes: Option<String>,

    /// MIME type such as "image/png"
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Artwork {
    /// Create an artwork reference with no size or type hints
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            sizes: None,
            mime_type: None,
        }
    }
}

/// Playlist entry
///
/// Immutable once placed in a `Playlist`; `index` is its position there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Position in the ordered playlist (assigned by `Playlist::new`)
    #[serde(default)]
    pub index: usize,

    /// Key the source fetcher resolves to encoded bytes (URL or path)
    pub source_key: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    #[serde(default)]
    pub album: Option<String>,

    /// Artwork references
    #[serde(default)]
    pub artwork: Vec<Artwork>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(
        source_key: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            index: 0,
            source_key: source_key.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            artwork: Vec::new(),
        }
    }

    /// Set the album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Add an artwork reference
    #[must_use]
    pub fn with_artwork(mut self, artwork: Artwork) -> Self {
        self.artwork.push(artwork);
        self
    }
}
