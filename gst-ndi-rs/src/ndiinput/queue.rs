// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Bounded hand-off between the capture thread and a source element.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::trace;

struct QueueState<T> {
    items: VecDeque<T>,
    flushing: bool,
    dropped: u64,
}

/// FIFO that drops its oldest item when full.
///
/// The producer never blocks; a slow consumer loses the oldest frames
/// instead of building up latency.
pub struct FrameQueue<T> {
    capacity: usize,
    state: Mutex<QueueState<T>>,
    cond: Condvar,
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                flushing: false,
                dropped: 0,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `item`, evicting the oldest item if the queue is full.
    ///
    /// # Returns
    /// `true` if an item was evicted.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        state.items.push_back(item);
        let evicted = state.items.len() > self.capacity;
        if evicted {
            state.items.pop_front();
            state.dropped += 1;
            trace!("Queue full, dropped oldest item ({} total)", state.dropped);
        }
        drop(state);
        self.cond.notify_one();
        evicted
    }

    /// Waits up to `timeout` for an item.
    ///
    /// Returns `None` on timeout, or immediately while flushing.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let state = self.lock();
        let (mut state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| s.items.is_empty() && !s.flushing)
            .unwrap_or_else(|e| e.into_inner());
        if state.flushing {
            return None;
        }
        state.items.pop_front()
    }

    /// Wakes up waiters and makes [`pop_timeout`](Self::pop_timeout) return
    /// `None` until flushing is turned off again.
    pub fn set_flushing(&self, flushing: bool) {
        self.lock().flushing = flushing;
        self.cond.notify_all();
    }

    pub fn is_flushing(&self) -> bool {
        self.lock().flushing
    }

    pub fn clear(&self) {
        self.lock().items.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Number of items evicted since creation.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}
