// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Shared NDI Receivers
//!
//! One network connection per NDI source, shared by up to one video and one
//! audio source element. The first element to acquire a source connects the
//! receiver and starts its capture thread; the last one to release it stops
//! the thread and destroys the receiver.
//!
//! ## Responsibilities
//! - Keys inputs by device id (the source's url address)
//! - Enforces one consumer per media kind and input
//! - Runs the capture loop and tracks the latest video and audio formats
//! - Hands frames to consumers through bounded drop-oldest queues
//!
//! ## Architecture
//! ```text
//! ndivideosrc ──acquire(id, Video)──┐
//!                                   ├─► InputRegistry ─► Input ─► capture thread ─► FrameSource
//! ndiaudiosrc ──acquire(id, Audio)──┘                      │
//!                                        video queue ◄─────┤
//!                                        audio queue ◄─────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, LazyLock, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use ndi::{FourCC, FrameFormat};
use tracing::{debug, trace};

use crate::caps;


/// Bounded drop-oldest queue
pub(crate) mod queue;

/// Real receiver backed by the NDI SDK
mod receiver;

/// Scripted frame sources for tests
#[cfg(test)]
pub(crate) mod scripted;

pub use queue::FrameQueue;
pub use receiver::NdiConnector;

/// GStreamer debug category shared by the input and output plumbing.
pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new("ndi", gst::DebugColorFlags::empty(), Some("NDI native"))
});

/// Timeout of a single capture call on the receiver.
pub(crate) const CAPTURE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause after a failed capture before trying again.
pub(crate) const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Video frames kept per consumer before the oldest is dropped.
pub(crate) const VIDEO_QUEUE_LENGTH: usize = 10;

/// Audio frames kept per consumer before the oldest is dropped.
pub(crate) const AUDIO_QUEUE_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Another element already consumes this kind of media from the input.
    #[error("{kind} input of {id} is busy")]
    Busy { id: String, kind: MediaKind },

    #[error("Failed to connect to {id}: {source}")]
    Connect {
        id: String,
        #[source]
        source: ndi::Error,
    },
}

/// Format of the video frames currently received.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFormat {
    pub width: i32,
    pub height: i32,
    pub fps_n: i32,
    pub fps_d: i32,
    pub picture_aspect_ratio: f32,
    pub fourcc: FourCC,
    pub frame_format: FrameFormat,
    pub stride: i32,
}

impl VideoFormat {
    /// Caps describing this format, `None` for layouts GStreamer cannot name.
    pub fn caps(&self) -> Option<gst::Caps> {
        let format = self.fourcc.name()?;
        Some(
            gst::Caps::builder("video/x-raw")
                .field("format", format)
                .field("width", self.width)
                .field("height", self.height)
                .field("framerate", gst::Fraction::new(self.fps_n, self.fps_d.max(1)))
                .field(
                    "pixel-aspect-ratio",
                    caps::pixel_aspect_ratio(self.width, self.height, self.picture_aspect_ratio),
                )
                .field("interlace-mode", caps::interlace_mode(self.frame_format))
                .build(),
        )
    }

    /// Duration of one frame; 1 ms when the sender announces no rate.
    pub fn buffer_duration(&self) -> gst::ClockTime {
        if self.fps_n <= 0 || self.fps_d <= 0 {
            return gst::ClockTime::MSECOND;
        }
        gst::ClockTime::SECOND
            .mul_div_floor(self.fps_d as u64, self.fps_n as u64)
            .unwrap_or(gst::ClockTime::MSECOND)
    }

    /// Minimum latency: one frame, rounded up.
    pub fn latency(&self) -> gst::ClockTime {
        if self.fps_n <= 0 || self.fps_d <= 0 {
            return gst::ClockTime::MSECOND;
        }
        gst::ClockTime::SECOND
            .mul_div_ceil(self.fps_d as u64, self.fps_n as u64)
            .unwrap_or(gst::ClockTime::MSECOND)
    }

    /// Payload size of one frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.fourcc.payload_size(
            self.stride.max(0) as usize,
            self.width.max(0) as usize,
            self.height.max(0) as usize,
        )
    }
}

/// Format of the audio frames currently received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: i32,
    pub rate: i32,
    /// Samples per channel in one frame.
    pub samples: i32,
}

impl AudioFormat {
    pub fn caps(&self) -> gst::Caps {
        gst::Caps::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("channels", self.channels)
            .field("rate", self.rate)
            .field("layout", "interleaved")
            .field("channel-mask", caps::channel_mask(self.channels))
            .build()
    }

    /// Whether two formats produce the same caps (frame sizes may differ).
    pub fn same_caps(&self, other: &AudioFormat) -> bool {
        self.channels == other.channels && self.rate == other.rate
    }

    /// Size of one interleaved F32LE frame in bytes.
    pub fn buffer_size(&self) -> usize {
        (self.samples.max(0) as usize) * (self.channels.max(0) as usize) * std::mem::size_of::<f32>()
    }

    /// Duration of a buffer of `size` bytes.
    pub fn duration_of(&self, size: usize) -> gst::ClockTime {
        let bytes_per_second =
            self.rate.max(0) as u64 * self.channels.max(0) as u64 * std::mem::size_of::<f32>() as u64;
        if bytes_per_second == 0 {
            return gst::ClockTime::ZERO;
        }
        gst::ClockTime::SECOND
            .mul_div_floor(size as u64, bytes_per_second)
            .unwrap_or(gst::ClockTime::ZERO)
    }

    pub fn buffer_duration(&self) -> gst::ClockTime {
        self.duration_of(self.buffer_size())
    }
}

pub struct VideoItem {
    pub format: VideoFormat,
    pub buffer: gst::Buffer,
}

pub struct AudioItem {
    pub format: AudioFormat,
    pub buffer: gst::Buffer,
}

/// A frame copied out of the receiver.
pub enum CapturedFrame {
    Video(VideoItem),
    Audio(AudioItem),
}

/// Something frames can be captured from, normally an NDI receiver.
pub trait FrameSource: Send {
    /// Waits up to `timeout` for the next frame.
    ///
    /// `Ok(None)` means nothing of interest arrived in time.
    fn capture(&mut self, timeout: Duration) -> Result<Option<CapturedFrame>, ndi::Error>;
}

/// Opens [`FrameSource`]s by device id.
pub trait Connector: Send + Sync {
    fn connect(&self, id: &str) -> Result<Box<dyn FrameSource>, ndi::Error>;
}

#[derive(Default)]
struct InputState {
    video_format: Option<VideoFormat>,
    audio_format: Option<AudioFormat>,
    video_attached: bool,
    audio_attached: bool,
}

/// A shared connection to one NDI source.
pub struct Input {
    id: String,
    state: Mutex<InputState>,
    format_changed: Condvar,
    video_queue: FrameQueue<VideoItem>,
    audio_queue: FrameQueue<AudioItem>,
    stop: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Input {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            state: Mutex::new(InputState::default()),
            format_changed: Condvar::new(),
            video_queue: FrameQueue::new(VIDEO_QUEUE_LENGTH),
            audio_queue: FrameQueue::new(AUDIO_QUEUE_LENGTH),
            stop: AtomicBool::new(false),
            thread: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InputState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn video_queue(&self) -> &FrameQueue<VideoItem> {
        &self.video_queue
    }

    pub fn audio_queue(&self) -> &FrameQueue<AudioItem> {
        &self.audio_queue
    }

    pub fn video_format(&self) -> Option<VideoFormat> {
        self.lock().video_format.clone()
    }

    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.lock().audio_format
    }

    /// Blocks until an audio frame has been seen or `timeout` elapses.
    pub fn wait_audio_format(&self, timeout: Duration) -> Option<AudioFormat> {
        let state = self.lock();
        let (state, _) = self
            .format_changed
            .wait_timeout_while(state, timeout, |s| s.audio_format.is_none())
            .unwrap_or_else(|e| e.into_inner());
        state.audio_format
    }

    /// Claims the consumer slot of `kind`; false if it is taken.
    fn attach(&self, kind: MediaKind) -> bool {
        let mut state = self.lock();
        let slot = match kind {
            MediaKind::Video => &mut state.video_attached,
            MediaKind::Audio => &mut state.audio_attached,
        };
        !std::mem::replace(slot, true)
    }

    /// Records the frame's format and forwards it to the attached consumer.
    fn handle_frame(&self, frame: CapturedFrame) {
        match frame {
            CapturedFrame::Video(item) => {
                let attached = {
                    let mut state = self.lock();
                    if state.video_format.as_ref() != Some(&item.format) {
                        debug!("Input {} video format now {:?}", self.id, item.format);
                        state.video_format = Some(item.format.clone());
                        self.format_changed.notify_all();
                    }
                    state.video_attached
                };
                if attached {
                    self.video_queue.push(item);
                }
            }
            CapturedFrame::Audio(item) => {
                let attached = {
                    let mut state = self.lock();
                    let changed = state
                        .audio_format
                        .is_none_or(|format| !format.same_caps(&item.format));
                    state.audio_format = Some(item.format);
                    if changed {
                        debug!("Input {} audio format now {:?}", self.id, item.format);
                        self.format_changed.notify_all();
                    }
                    state.audio_attached
                };
                if attached {
                    self.audio_queue.push(item);
                }
            }
        }
    }

    fn capture_loop(&self, mut source: Box<dyn FrameSource>) {
        gst::debug!(CAT, "Capture thread for {} started", self.id);
        while !self.stop.load(Ordering::SeqCst) {
            match source.capture(CAPTURE_TIMEOUT) {
                Ok(Some(frame)) => self.handle_frame(frame),
                Ok(None) => {}
                Err(err) => {
                    gst::debug!(CAT, "Receive error on {}: {}", self.id, err);
                    // Error frames come back without waiting.
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        gst::debug!(CAT, "Capture thread for {} stopped", self.id);
    }

    fn start(self: &Arc<Self>, source: Box<dyn FrameSource>) -> std::io::Result<()> {
        let input = self.clone();
        let handle = std::thread::Builder::new()
            .name("ndi-input-capture".into())
            .spawn(move || input.capture_loop(source))?;
        *self.thread.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Stops and joins the capture thread, dropping the receiver with it.
    fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.video_queue.set_flushing(true);
        self.audio_queue.set_flushing(true);
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                gst::error!(CAT, "Capture thread for {} panicked", self.id);
            }
        }
        self.video_queue.clear();
        self.audio_queue.clear();
    }
}

/// All inputs of the process, keyed by device id.
pub struct InputRegistry {
    connector: Box<dyn Connector>,
    inputs: Mutex<HashMap<String, Arc<Input>>>,
}

static GLOBAL: LazyLock<Arc<InputRegistry>> =
    LazyLock::new(|| Arc::new(InputRegistry::new(Box::new(NdiConnector))));

impl InputRegistry {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            inputs: Mutex::new(HashMap::new()),
        }
    }

    /// The registry used by the elements.
    pub fn global() -> Arc<InputRegistry> {
        GLOBAL.clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Input>>> {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims the `kind` consumer slot of the input for `id`.
    ///
    /// Connects the receiver and starts the capture thread if this is the
    /// first consumer of the input.
    ///
    /// # Errors
    /// * [`InputError::Busy`] if the slot is already taken
    /// * [`InputError::Connect`] if the receiver could not be created
    pub fn acquire(self: &Arc<Self>, id: &str, kind: MediaKind) -> Result<InputHandle, InputError> {
        let mut inputs = self.lock();
        gst::info!(CAT, "Acquire {} input {}. Total inputs: {}", kind, id, inputs.len());

        let (input, source) = match inputs.get(id) {
            Some(input) => (input.clone(), None),
            None => {
                let source = self.connector.connect(id).map_err(|source| InputError::Connect {
                    id: id.to_owned(),
                    source,
                })?;
                (Arc::new(Input::new(id)), Some(source))
            }
        };

        if !input.attach(kind) {
            gst::error!(CAT, "{} input of {} is busy", kind, id);
            return Err(InputError::Busy {
                id: id.to_owned(),
                kind,
            });
        }

        // The slot is claimed before capturing so the first frames are queued.
        if let Some(source) = source {
            input.start(source).map_err(|err| InputError::Connect {
                id: id.to_owned(),
                source: ndi::Error::Other(format!("capture thread: {err}")),
            })?;
            inputs.insert(id.to_owned(), input.clone());
            gst::info!(CAT, "Added input {}", id);
        }

        match kind {
            MediaKind::Video => input.video_queue.set_flushing(false),
            MediaKind::Audio => input.audio_queue.set_flushing(false),
        }

        Ok(InputHandle {
            registry: self.clone(),
            input,
            kind,
        })
    }

    /// Frees the consumer slot; the last release tears the input down.
    fn release(&self, input: &Arc<Input>, kind: MediaKind) {
        let removed = {
            let mut inputs = self.lock();
            let empty = {
                let mut state = input.lock();
                match kind {
                    MediaKind::Video => state.video_attached = false,
                    MediaKind::Audio => state.audio_attached = false,
                }
                !state.video_attached && !state.audio_attached
            };
            match kind {
                MediaKind::Video => input.video_queue.clear(),
                MediaKind::Audio => input.audio_queue.clear(),
            }
            gst::info!(CAT, "Released {} input of {}", kind, input.id);

            let current = inputs.get(&input.id).is_some_and(|i| Arc::ptr_eq(i, input));
            if empty && current {
                inputs.remove(&input.id)
            } else {
                None
            }
        };

        // Joining may take up to one capture timeout; not under the lock.
        if let Some(input) = removed {
            trace!("Shutting down input {}", input.id);
            input.shutdown();
        }
    }

    /// Number of live inputs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }
}

/// A claimed consumer slot of an [`Input`]; released on drop.
pub struct InputHandle {
    registry: Arc<InputRegistry>,
    input: Arc<Input>,
    kind: MediaKind,
}

impl InputHandle {
    pub fn input(&self) -> &Arc<Input> {
        &self.input
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.registry.release(&self.input, self.kind);
    }
}
