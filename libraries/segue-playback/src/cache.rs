//! Decoded buffer cache
//!
//! Bounded by entry count with FIFO eviction: the oldest insertion goes
//! first and reads never refresh an entry. Concurrent requests for one key
//! share a single fetch+decode.

use crate::error::{PlaybackError, Result};
use segue_core::{AudioDecoder, DecodedBuffer, SourceFetcher};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

type Slot = Arc<OnceCell<DecodedBuffer>>;

#[derive(Default)]
struct CacheState {
    /// Resident and in-flight entries
    slots: HashMap<String, Slot>,
    /// Resident keys, oldest first
    order: VecDeque<String>,
}

/// Fetch + decode cache keyed by source key
pub struct BufferCache {
    fetcher: Arc<dyn SourceFetcher>,
    decoder: Arc<dyn AudioDecoder>,
    max_cached: usize,
    state: Mutex<CacheState>,
}

impl BufferCache {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        decoder: Arc<dyn AudioDecoder>,
        max_cached: usize,
    ) -> Self {
        Self {
            fetcher,
            decoder,
            max_cached: max_cached.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decoded buffer for `source_key`, loading it on a miss
    pub async fn get(&self, source_key: &str) -> Result<DecodedBuffer> {
        let slot = {
            let mut state = self.state();
            state
                .slots
                .entry(source_key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(buffer) = slot.get() {
            debug!(source_key, "Cache hit");
            return Ok(buffer.clone());
        }

        let result = slot.get_or_try_init(|| self.load(source_key)).await;

        let mut state = self.state();
        let current = state
            .slots
            .get(source_key)
            .is_some_and(|s| Arc::ptr_eq(s, &slot));

        match result {
            Ok(buffer) => {
                let buffer = buffer.clone();
                if current && !state.order.iter().any(|k| k == source_key) {
                    state.order.push_back(source_key.to_string());
                    while state.order.len() > self.max_cached {
                        if let Some(evicted) = state.order.pop_front() {
                            state.slots.remove(&evicted);
                            debug!(source_key = %evicted, "Evicted decoded buffer");
                        }
                    }
                }
                Ok(buffer)
            }
            Err(err) => {
                // Leave no failed slot behind so the next request retries
                if current && slot.get().is_none() {
                    state.slots.remove(source_key);
                }
                Err(err)
            }
        }
    }

    async fn load(&self, source_key: &str) -> Result<DecodedBuffer> {
        debug!(source_key, "Cache miss, fetching");
        let bytes = self.fetcher.fetch(source_key).await?;

        let decoder = Arc::clone(&self.decoder);
        let hint = extension_hint(source_key);
        let audio = tokio::task::spawn_blocking(move || decoder.decode(bytes, hint.as_deref()))
            .await
            .map_err(|e| PlaybackError::Decode(format!("decode task failed: {}", e)))?
            .map_err(PlaybackError::from)?;

        let buffer = DecodedBuffer::new(audio);
        debug!(source_key, duration = buffer.duration(), "Decoded");
        Ok(buffer)
    }

    /// Whether `source_key` is resident
    pub fn contains(&self, source_key: &str) -> bool {
        self.state().order.iter().any(|k| k == source_key)
    }

    /// Resident entry count
    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resident keys, oldest first
    pub fn keys(&self) -> Vec<String> {
        self.state().order.iter().cloned().collect()
    }

    /// Drop every resident entry
    ///
    /// In-flight loads still complete for their waiters but are not kept.
    pub fn clear(&self) {
        let mut state = self.state();
        state.slots.clear();
        state.order.clear();
    }

    pub fn max_cached(&self) -> usize {
        self.max_cached
    }
}

/// Lowercase file extension of a source key, ignoring query and fragment
pub(crate) fn extension_hint(source_key: &str) -> Option<String> {
    let path = source_key
        .split(['?', '#'])
        .next()
        .unwrap_or(source_key);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
