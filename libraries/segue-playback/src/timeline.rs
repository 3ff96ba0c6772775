//! Batch layout and clock queries
//!
//! Pure functions over segments and a clock reading. Nothing here touches
//! the engine, so every rule about "what is playing now" can be tested in
//! isolation.

use crate::types::{BatchProgress, Segment, TrackProgress};

/// A track waiting to be laid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub track_index: usize,
    pub duration: f64,
    pub start_offset: f64,
}

impl Placement {
    /// Whole track from the beginning
    pub fn whole(track_index: usize, duration: f64) -> Self {
        Self {
            track_index,
            duration,
            start_offset: 0.0,
        }
    }
}

/// Lay placements back-to-back starting at `start_at`
pub fn layout(start_at: f64, placements: &[Placement]) -> Vec<Segment> {
    let mut cursor = start_at;
    placements
        .iter()
        .map(|p| {
            let segment = Segment::new(p.track_index, cursor, p.duration, p.start_offset);
            cursor = segment.end_time;
            segment
        })
        .collect()
}

/// `count` playlist indices starting at `start`, wrapping at `len`
pub fn batch_indices(start: usize, count: usize, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    (0..count).map(|i| (start + i) % len).collect()
}

/// Segment audible at `now`
///
/// Before the batch starts this is the first segment; after it ends, the
/// last. `None` only for an empty batch.
pub fn current_segment(batch: &[Segment], now: f64) -> Option<&Segment> {
    let first = batch.first()?;
    if now < first.start_time {
        return Some(first);
    }
    batch
        .iter()
        .find(|segment| segment.contains(now))
        .or_else(|| batch.last())
}

/// Position within `segment` at `now`
pub fn track_progress(segment: &Segment, now: f64) -> TrackProgress {
    let elapsed = (now - segment.start_time).max(0.0);
    let position = (segment.start_offset + elapsed).min(segment.duration);
    let ratio = if segment.duration > 0.0 {
        (position / segment.duration).clamp(0.0, 1.0)
    } else {
        0.0
    };

    TrackProgress {
        position,
        duration: segment.duration,
        ratio,
    }
}

/// Position within the whole batch at `now`
///
/// The sum of every segment's track position: elapsed segments count their
/// full duration, future ones their start offset. A seeked segment counts
/// the skipped part as played, so the position never jumps at a boundary.
pub fn batch_progress(batch: &[Segment], now: f64) -> BatchProgress {
    let duration = batch.iter().map(|s| s.duration).sum();
    let position = batch
        .iter()
        .map(|segment| track_progress(segment, now).position)
        .sum();

    BatchProgress { position, duration }
}

/// Whether the clock has run past the final segment
pub fn is_exhausted(batch: &[Segment], now: f64) -> bool {
    batch.last().is_some_and(|last| now >= last.end_time)
}
