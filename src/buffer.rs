//! Bounded FIFO between the producer and the listeners.
//!
//! Pushing blocks while the buffer is full; popping never blocks. The
//! asymmetry is the point: model inference is slow and its latency
//! unpredictable, while a listener asking for the next track must get an
//! answer (a track or "buffering") right away.
//!
//! All state sits behind one mutex, so two listeners racing for the last
//! track resolve to exactly one winner.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::track::Track;
use crate::{Error, Result};

/// Fixed-capacity, thread-safe track queue.
#[derive(Debug)]
pub struct TrackBuffer {
    capacity: usize,
    queue: Mutex<VecDeque<Track>>,
    /// Signalled whenever a pop frees a slot.
    slot_freed: Condvar,
}

impl TrackBuffer {
    /// Create an empty buffer holding at most `capacity` tracks.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("track buffer capacity must be > 0".into()));
        }
        Ok(Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            slot_freed: Condvar::new(),
        })
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Track>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a track, waiting for a free slot if the buffer is full.
    pub fn push(&self, track: Track) {
        let mut queue = self.lock();
        while queue.len() >= self.capacity {
            queue = self
                .slot_freed
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
        queue.push_back(track);
    }

    /// Like [`push`](Self::push) but gives the track back if no slot frees
    /// up within `timeout`.
    pub fn push_timeout(&self, track: Track, timeout: Duration) -> std::result::Result<(), Track> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        while queue.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(track);
            }
            let (guard, _) = self
                .slot_freed
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;
        }
        queue.push_back(track);
        Ok(())
    }

    /// Append without waiting; a full buffer hands the track back.
    pub fn try_push(&self, track: Track) -> std::result::Result<(), Track> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(track);
        }
        queue.push_back(track);
        Ok(())
    }

    /// Remove and return the oldest track, or `None` when empty. Never blocks
    /// on production.
    pub fn pop_or_empty(&self) -> Option<Track> {
        let track = self.lock().pop_front();
        if track.is_some() {
            self.slot_freed.notify_one();
        }
        track
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
