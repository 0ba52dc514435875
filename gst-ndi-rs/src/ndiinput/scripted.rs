// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Frame sources replaying what a test feeds them, in place of NDI receivers.
//!
//! Frames fed before a source connects wait in its channel and are captured
//! once the input starts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use ndi::{FourCC, FrameFormat};

use crate::ndiinput::{
    AudioFormat, AudioItem, CapturedFrame, Connector, FrameSource, InputRegistry, VideoFormat,
    VideoItem,
};

type Scripted = Result<CapturedFrame, ndi::Error>;

pub(crate) struct ScriptedSource {
    frames: Receiver<Scripted>,
    dropped: Arc<AtomicBool>,
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self, timeout: Duration) -> Result<Option<CapturedFrame>, ndi::Error> {
        let timeout = timeout.min(Duration::from_millis(20));
        match self.frames.recv_timeout(timeout) {
            Ok(scripted) => scripted.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

struct Channel {
    sender: Sender<Scripted>,
    pending: Option<Receiver<Scripted>>,
}

impl Channel {
    fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            pending: Some(receiver),
        }
    }
}

#[derive(Default)]
pub(crate) struct ScriptedConnector {
    pub connects: AtomicUsize,
    pub fail: AtomicBool,
    channels: Mutex<HashMap<String, Channel>>,
    dropped: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl ScriptedConnector {
    fn send(&self, id: &str, scripted: Scripted) {
        let mut channels = self.channels.lock().unwrap();
        let channel = channels.entry(id.to_owned()).or_insert_with(Channel::new);
        if let Err(mpsc::SendError(scripted)) = channel.sender.send(scripted) {
            // The last source is gone; keep the frame for the next connect.
            *channel = Channel::new();
            channel.sender.send(scripted).unwrap();
        }
    }

    /// Queues `frame` for the source `id`.
    pub fn feed(&self, id: &str, frame: CapturedFrame) {
        self.send(id, Ok(frame));
    }

    /// Makes the next capture on `id` fail with an error frame.
    pub fn fail_capture(&self, id: &str) {
        self.send(id, Err(ndi::Error::Capture));
    }

    pub fn source_dropped(&self, id: &str) -> bool {
        self.dropped
            .lock()
            .unwrap()
            .get(id)
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

impl Connector for Arc<ScriptedConnector> {
    fn connect(&self, id: &str) -> Result<Box<dyn FrameSource>, ndi::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ndi::Error::CreateFailed("receiver"));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);

        let frames = {
            let mut channels = self.channels.lock().unwrap();
            let channel = channels.entry(id.to_owned()).or_insert_with(Channel::new);
            match channel.pending.take() {
                Some(frames) => frames,
                None => {
                    *channel = Channel::new();
                    channel.pending.take().unwrap()
                }
            }
        };
        let dropped = Arc::new(AtomicBool::new(false));
        self.dropped.lock().unwrap().insert(id.to_owned(), dropped.clone());

        Ok(Box::new(ScriptedSource { frames, dropped }))
    }
}

/// A registry whose inputs replay frames fed to the returned connector.
pub(crate) fn scripted_registry() -> (Arc<ScriptedConnector>, Arc<InputRegistry>) {
    gst::init().unwrap();
    let connector = Arc::new(ScriptedConnector::default());
    let registry = Arc::new(InputRegistry::new(Box::new(connector.clone())));
    (connector, registry)
}

/// 30000/1001 UYVY, two lines high.
pub(crate) fn video_format(width: i32) -> VideoFormat {
    VideoFormat {
        width,
        height: 2,
        fps_n: 30000,
        fps_d: 1001,
        picture_aspect_ratio: 0.0,
        fourcc: FourCC::Uyvy,
        frame_format: FrameFormat::Progressive,
        stride: width * 2,
    }
}

/// A video frame whose every byte is `fill`.
pub(crate) fn filled_video_frame(width: i32, fill: u8) -> CapturedFrame {
    let format = video_format(width);
    let buffer = gst::Buffer::from_slice(vec![fill; format.frame_size()]);
    CapturedFrame::Video(VideoItem { format, buffer })
}

pub(crate) fn video_frame(width: i32) -> CapturedFrame {
    filled_video_frame(width, 0)
}

/// An audio frame of `samples` per channel filled with 0.5.
pub(crate) fn audio_frame_at(rate: i32, channels: i32, samples: i32) -> CapturedFrame {
    let format = AudioFormat {
        channels,
        rate,
        samples,
    };
    let bytes = std::iter::repeat_n(0.5f32, (channels * samples) as usize)
        .flat_map(f32::to_le_bytes)
        .collect::<Vec<u8>>();
    let buffer = gst::Buffer::from_slice(bytes);
    CapturedFrame::Audio(AudioItem { format, buffer })
}

pub(crate) fn audio_frame(channels: i32, samples: i32) -> CapturedFrame {
    audio_frame_at(48000, channels, samples)
}

/// Polls `condition` for up to five seconds.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// `src ! appsink`, keeping every buffer that reaches the sink.
pub(crate) struct SinkPipeline {
    pipeline: gst::Pipeline,
    sink: gst_app::AppSink,
    buffers: Arc<Mutex<Vec<gst::Buffer>>>,
}

impl SinkPipeline {
    pub fn new(src: &gst::Element) -> Self {
        let buffers = Arc::new(Mutex::new(Vec::new()));
        let sink = gst_app::AppSink::builder()
            .sync(false)
            .callbacks(
                gst_app::AppSinkCallbacks::builder()
                    .new_sample({
                        let buffers = buffers.clone();
                        move |appsink| {
                            let Ok(sample) = appsink.pull_sample() else {
                                return Err(gst::FlowError::Flushing);
                            };
                            if let Some(buffer) = sample.buffer_owned() {
                                buffers.lock().unwrap().push(buffer);
                            }
                            Ok(gst::FlowSuccess::Ok)
                        }
                    })
                    .build(),
            )
            .build();

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many([src, sink.upcast_ref::<gst::Element>()])
            .unwrap();
        src.link(&sink).unwrap();

        Self {
            pipeline,
            sink,
            buffers,
        }
    }

    pub fn set_state(&self, state: gst::State) {
        self.pipeline.set_state(state).unwrap();
    }

    pub fn buffers(&self) -> Vec<gst::Buffer> {
        self.buffers.lock().unwrap().clone()
    }

    /// Caps last received by the sink.
    pub fn caps(&self) -> Option<gst::Caps> {
        self.sink.static_pad("sink").and_then(|pad| pad.current_caps())
    }

    /// Waits up to five seconds for EOS; false on timeout or error.
    pub fn wait_eos(&self) -> bool {
        let bus = self.pipeline.bus().unwrap();
        bus.timed_pop_filtered(
            gst::ClockTime::from_seconds(5),
            &[gst::MessageType::Eos, gst::MessageType::Error],
        )
        .is_some_and(|msg| msg.type_() == gst::MessageType::Eos)
    }
}

impl Drop for SinkPipeline {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
