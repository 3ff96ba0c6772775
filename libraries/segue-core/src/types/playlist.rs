/// Playlist domain type
use crate::error::{Result, SegueError};
use crate::types::Track;
use std::ops::Index;
use std::sync::Arc;

/// Ordered, circular playlist
///
/// Always holds at least one track. Index arithmetic wraps modulo the
/// length, so there is no end-of-list sentinel. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    tracks: Arc<[Track]>,
}

impl Playlist {
    /// Build a playlist, re-indexing tracks by position
    ///
    /// # Errors
    /// Returns `SegueError::EmptyPlaylist` if `tracks` is empty
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(SegueError::EmptyPlaylist);
        }

        let tracks: Vec<Track> = tracks
            .into_iter()
            .enumerate()
            .map(|(index, mut track)| {
                track.index = index;
                track
            })
            .collect();

        Ok(Self {
            tracks: tracks.into(),
        })
    }

    /// Number of tracks (always >= 1)
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always false; kept for API symmetry with collections
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Reduce any index into range
    pub fn wrap(&self, index: usize) -> usize {
        index % self.len()
    }

    /// Index after `index`, wrapping to the start
    pub fn next_index(&self, index: usize) -> usize {
        (self.wrap(index) + 1) % self.len()
    }

    /// Index before `index`, wrapping to the end
    pub fn prev_index(&self, index: usize) -> usize {
        let len = self.len();
        (self.wrap(index) + len - 1) % len
    }

    /// Track at `index` (wrapped)
    pub fn get(&self, index: usize) -> &Track {
        &self.tracks[self.wrap(index)]
    }

    /// All tracks in order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Iterate tracks in order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

impl Index<usize> for Playlist {
    type Output = Track;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index)
    }
}
