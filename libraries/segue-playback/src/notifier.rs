//! Track-change timers
//!
//! One tokio task per upcoming segment, firing shortly before the segment
//! becomes audible. Re-arming aborts every earlier timer.

use crate::types::Segment;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Notifier {
    notify_ahead: f64,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl Notifier {
    pub fn new(notify_ahead: f64) -> Self {
        Self {
            notify_ahead: notify_ahead.max(0.0),
            timers: Mutex::new(Vec::new()),
        }
    }

    fn timers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all timers with one per segment starting after `now`
    ///
    /// `on_fire` receives the segment's track index. Clock seconds map 1:1
    /// to wall seconds while the clock runs. Returns the number armed.
    pub fn arm<F>(&self, segments: &[Segment], now: f64, on_fire: F) -> usize
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let mut timers = self.timers();
        for timer in timers.drain(..) {
            timer.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No tokio runtime, track-change timers not armed");
            return 0;
        };

        let on_fire = Arc::new(on_fire);
        for segment in segments.iter().filter(|s| s.start_time > now) {
            let delay = (segment.start_time - self.notify_ahead - now).max(0.0);
            let track_index = segment.track_index;
            let on_fire = Arc::clone(&on_fire);
            timers.push(runtime.spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                on_fire(track_index);
            }));
        }

        debug!(armed = timers.len(), now, "Track-change timers armed");
        timers.len()
    }

    /// Abort every pending timer
    pub fn cancel(&self) {
        for timer in self.timers().drain(..) {
            timer.abort();
        }
    }

    /// Timers that have not fired yet
    pub fn pending(&self) -> usize {
        self.timers().iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.cancel();
    }
}
