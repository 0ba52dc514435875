// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Background discovery of NDI sources.
//!
//! A polling thread keeps the list of sources on the network and reports
//! additions and removals to subscribers. Sources are identified by their
//! url address; a source that changes its name is reported as removed and
//! added again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use ndi::Source;
use tracing::{debug, trace};

/// Wait of the first poll, long enough for sources to answer.
const FIRST_WAIT: Duration = Duration::from_millis(500);

/// Wait of every following poll.
const POLL_WAIT: Duration = Duration::from_millis(100);

/// Pause between polls.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChange {
    Added(Source),
    Removed(Source),
}

/// Changes turning the `known` source list into `current`.
///
/// Removals come first so a renamed source is removed before its new name
/// is added.
pub fn diff_sources(known: &[Source], current: &[Source]) -> Vec<DeviceChange> {
    let mut changes = known
        .iter()
        .filter(|old| !current.contains(old))
        .cloned()
        .map(DeviceChange::Removed)
        .collect::<Vec<_>>();

    changes.extend(
        current
            .iter()
            .filter(|new| !known.contains(new))
            .cloned()
            .map(DeviceChange::Added),
    );

    changes
}

/// Source of discovery results, normally an NDI finder.
pub trait SourceDiscovery: Send {
    /// Waits up to `timeout` for the source list to change.
    fn wait_for_sources(&mut self, timeout: Duration) -> bool;

    fn current_sources(&mut self) -> Vec<Source>;
}

impl SourceDiscovery for ndi::FindInstance {
    fn wait_for_sources(&mut self, timeout: Duration) -> bool {
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        ndi::FindInstance::wait_for_sources(self, timeout_ms)
    }

    fn current_sources(&mut self) -> Vec<Source> {
        ndi::FindInstance::current_sources(self)
    }
}

type Callback = Arc<dyn Fn(&DeviceChange) + Send + Sync>;

#[derive(Default)]
struct Shared {
    known: Mutex<Vec<Source>>,
    callbacks: Mutex<HashMap<u64, Callback>>,
    next_id: AtomicU64,
    running: AtomicBool,
    first_update: Mutex<bool>,
    first_update_done: Condvar,
}

impl Shared {
    fn known(&self) -> MutexGuard<'_, Vec<Source>> {
        self.known.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, discovery: &mut dyn SourceDiscovery, timeout: Duration) {
        if discovery.wait_for_sources(timeout) {
            trace!("Source list changed");
        }
        let current = discovery.current_sources();

        let changes = {
            let mut known = self.known();
            let changes = diff_sources(&known, &current);
            *known = current;
            changes
        };

        if changes.is_empty() {
            return;
        }
        // Called without the lock so a callback may unsubscribe.
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for change in &changes {
            debug!("Device change: {:?}", change);
            for callback in &callbacks {
                callback(change);
            }
        }
    }

    fn run(&self, mut discovery: Box<dyn SourceDiscovery>) {
        self.update(discovery.as_mut(), FIRST_WAIT);
        *self.first_update.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.first_update_done.notify_all();

        while self.running.load(Ordering::SeqCst) {
            self.update(discovery.as_mut(), POLL_WAIT);
            std::thread::sleep(POLL_INTERVAL);
        }
        debug!("Finder thread stopped");
    }
}

/// Polls for NDI sources on a background thread.
#[derive(Default)]
pub struct Finder {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Finder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling `discovery`; returns once the first poll is done.
    ///
    /// Does nothing if the finder is already running.
    pub fn start(&self, discovery: Box<dyn SourceDiscovery>) -> std::io::Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(|e| e.into_inner());
        if thread.is_some() {
            return Ok(());
        }

        *self.shared.first_update.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        *thread = Some(
            std::thread::Builder::new()
                .name("ndi-finder".into())
                .spawn(move || shared.run(discovery))?,
        );
        drop(thread);

        let done = self.shared.first_update.lock().unwrap_or_else(|e| e.into_inner());
        let _done = self
            .shared
            .first_update_done
            .wait_while(done, |done| !*done)
            .unwrap_or_else(|e| e.into_inner());
        Ok(())
    }

    /// Stops the polling thread and forgets the known sources.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        self.shared.known().clear();
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Sources seen by the last poll.
    pub fn sources(&self) -> Vec<Source> {
        self.shared.known().clone()
    }

    /// Registers `callback` for every future change.
    ///
    /// # Returns
    /// An id for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, callback: impl Fn(&DeviceChange) + Send + Sync + 'static) -> u64 {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(callback));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

impl Drop for Finder {
    fn drop(&mut self) {
        self.stop();
    }
}
