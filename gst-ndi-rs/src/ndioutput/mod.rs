// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! Shared NDI Senders
//!
//! One NDI sender per announced name, shared by up to one video and one
//! audio sink element. Sinks without a name share the sender keyed `"_"`,
//! whose network name is picked by the SDK.
//!
//! ## Responsibilities
//! - Creates the sender on first acquire and destroys it on last release
//! - Enforces one producer per media kind and sender
//! - Turns negotiated caps into NDI frame descriptions
//! - Maps buffers and sends them with a timecode derived from their PTS

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use gstreamer as gst;
use gstreamer_audio as gst_audio;
use gstreamer_video as gst_video;
use ndi::{AudioFrameDesc, FourCC, FrameFormat, VideoFrameDesc};
use tracing::trace;

use crate::ndiinput::{CAT, MediaKind};

/// Output tests (registry, caps conversion, sending)
mod output_tests;

/// Real sender backed by the NDI SDK
mod sender;

pub use sender::NdiSenderFactory;

/// Registry key of the sender used when no name is set.
const UNNAMED_KEY: &str = "_";

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("{kind} output of {name} is busy")]
    Busy { name: String, kind: MediaKind },

    #[error("Failed to create sender {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: ndi::Error,
    },

    #[error("Unsupported caps: {0}")]
    UnsupportedCaps(String),

    #[error("{0} output is not configured")]
    NotConfigured(MediaKind),

    #[error("Failed to map buffer")]
    Map,

    #[error("Failed to send: {0}")]
    Send(#[from] ndi::Error),
}

/// Something frames can be published through, normally an NDI sender.
pub trait FrameSender: Send + Sync {
    fn send_video(&self, desc: &VideoFrameDesc, timecode: i64, data: &[u8]) -> Result<(), ndi::Error>;

    fn send_audio(&self, desc: &AudioFrameDesc, timecode: i64, samples: &[f32]) -> Result<(), ndi::Error>;
}

/// Creates [`FrameSender`]s by network name.
pub trait SenderFactory: Send + Sync {
    fn create(&self, name: Option<&str>) -> Result<Box<dyn FrameSender>, ndi::Error>;
}

/// NDI timecode (100 ns units) of a buffer timestamp.
///
/// Buffers without a PTS let the SDK synthesize the timecode.
pub(crate) fn timecode(pts: Option<gst::ClockTime>) -> i64 {
    match pts {
        Some(pts) => (pts.nseconds() / 100) as i64,
        None => ndi::TIMECODE_SYNTHESIZE,
    }
}

/// Converts negotiated video caps into a frame description.
///
/// # Errors
/// [`OutputError::UnsupportedCaps`] for formats other than UYVY, BGRA,
/// RGBA, I420 and NV12, and for field-based interlacing.
pub fn video_desc(caps: &gst::CapsRef) -> Result<VideoFrameDesc, OutputError> {
    let info = gst_video::VideoInfo::from_caps(caps)
        .map_err(|_| OutputError::UnsupportedCaps(caps.to_string()))?;

    let width = info.width() as i32;
    let height = info.height() as i32;
    let (fourcc, line_stride) = match info.format() {
        gst_video::VideoFormat::Uyvy => (FourCC::Uyvy, width * 2),
        gst_video::VideoFormat::Bgra => (FourCC::Bgra, width * 4),
        gst_video::VideoFormat::Rgba => (FourCC::Rgba, width * 4),
        gst_video::VideoFormat::I420 => (FourCC::I420, width),
        gst_video::VideoFormat::Nv12 => (FourCC::Nv12, width),
        _ => return Err(OutputError::UnsupportedCaps(caps.to_string())),
    };

    let frame_format = match info.interlace_mode() {
        gst_video::VideoInterlaceMode::Progressive => FrameFormat::Progressive,
        gst_video::VideoInterlaceMode::Interleaved => FrameFormat::Interleaved,
        _ => return Err(OutputError::UnsupportedCaps(caps.to_string())),
    };

    let par = info.par();
    let picture_aspect_ratio = if height > 0 && par.denom() != 0 {
        (width as f32 / height as f32) * (par.numer() as f32 / par.denom() as f32)
    } else {
        0.0
    };

    Ok(VideoFrameDesc {
        width,
        height,
        fourcc,
        frame_rate_n: info.fps().numer(),
        frame_rate_d: info.fps().denom(),
        picture_aspect_ratio,
        frame_format,
        line_stride,
    })
}

/// Converts negotiated audio caps into a frame description.
///
/// Only interleaved F32LE is accepted.
pub fn audio_desc(caps: &gst::CapsRef) -> Result<AudioFrameDesc, OutputError> {
    let info = gst_audio::AudioInfo::from_caps(caps)
        .map_err(|_| OutputError::UnsupportedCaps(caps.to_string()))?;

    if info.format() != gst_audio::AudioFormat::F32le
        || info.layout() != gst_audio::AudioLayout::Interleaved
    {
        return Err(OutputError::UnsupportedCaps(caps.to_string()));
    }

    Ok(AudioFrameDesc {
        sample_rate: info.rate() as i32,
        channels: info.channels() as i32,
    })
}

#[derive(Default)]
struct OutputState {
    video: Option<VideoFrameDesc>,
    audio: Option<AudioFrameDesc>,
    video_attached: bool,
    audio_attached: bool,
}

/// A shared NDI sender.
pub struct Output {
    key: String,
    sender: Box<dyn FrameSender>,
    state: Mutex<OutputState>,
}

impl Output {
    fn lock(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registry key: the sender name, or `"_"` for the unnamed sender.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn configure_video(&self, caps: &gst::CapsRef) -> Result<(), OutputError> {
        let desc = video_desc(caps)?;
        gst::debug!(CAT, "Output {} video configured: {:?}", self.key, desc);
        self.lock().video = Some(desc);
        Ok(())
    }

    pub fn configure_audio(&self, caps: &gst::CapsRef) -> Result<(), OutputError> {
        let desc = audio_desc(caps)?;
        gst::debug!(CAT, "Output {} audio configured: {:?}", self.key, desc);
        self.lock().audio = Some(desc);
        Ok(())
    }

    pub fn video_desc(&self) -> Option<VideoFrameDesc> {
        self.lock().video.clone()
    }

    pub fn audio_desc(&self) -> Option<AudioFrameDesc> {
        self.lock().audio
    }

    /// Sends one video buffer laid out as the configured caps describe.
    pub fn send_video(&self, buffer: &gst::BufferRef) -> Result<(), OutputError> {
        let desc = self
            .video_desc()
            .ok_or(OutputError::NotConfigured(MediaKind::Video))?;
        let map = buffer.map_readable().map_err(|_| OutputError::Map)?;
        self.sender
            .send_video(&desc, timecode(buffer.pts()), map.as_slice())?;
        Ok(())
    }

    /// Sends one interleaved F32LE buffer.
    pub fn send_audio(&self, buffer: &gst::BufferRef) -> Result<(), OutputError> {
        let desc = self
            .audio_desc()
            .ok_or(OutputError::NotConfigured(MediaKind::Audio))?;
        let map = buffer.map_readable().map_err(|_| OutputError::Map)?;
        let samples = map
            .as_slice()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<f32>>();
        trace!(
            "Sending {} samples per channel",
            samples.len() / desc.channels.max(1) as usize
        );
        self.sender
            .send_audio(&desc, timecode(buffer.pts()), &samples)?;
        Ok(())
    }
}

/// All senders of the process, keyed by name.
pub struct OutputRegistry {
    factory: Box<dyn SenderFactory>,
    outputs: Mutex<HashMap<String, Arc<Output>>>,
}

static GLOBAL: LazyLock<Arc<OutputRegistry>> =
    LazyLock::new(|| Arc::new(OutputRegistry::new(Box::new(NdiSenderFactory))));

impl OutputRegistry {
    pub fn new(factory: Box<dyn SenderFactory>) -> Self {
        Self {
            factory,
            outputs: Mutex::new(HashMap::new()),
        }
    }

    /// The registry used by the elements.
    pub fn global() -> Arc<OutputRegistry> {
        GLOBAL.clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Output>>> {
        self.outputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims the `kind` producer slot of the sender called `name`.
    ///
    /// # Errors
    /// * [`OutputError::Busy`] if the slot is already taken
    /// * [`OutputError::Create`] if the sender could not be created
    pub fn acquire(
        self: &Arc<Self>,
        name: Option<&str>,
        kind: MediaKind,
    ) -> Result<OutputHandle, OutputError> {
        let name = name.filter(|n| !n.is_empty());
        let key = name.unwrap_or(UNNAMED_KEY);
        let mut outputs = self.lock();
        gst::info!(CAT, "Acquire {} output {}. Total outputs: {}", kind, key, outputs.len());

        let output = match outputs.get(key) {
            Some(output) => output.clone(),
            None => {
                let sender = self.factory.create(name).map_err(|source| OutputError::Create {
                    name: key.to_owned(),
                    source,
                })?;
                let output = Arc::new(Output {
                    key: key.to_owned(),
                    sender,
                    state: Mutex::new(OutputState::default()),
                });
                outputs.insert(key.to_owned(), output.clone());
                gst::info!(CAT, "Added output {}", key);
                output
            }
        };

        {
            let mut state = output.lock();
            let slot = match kind {
                MediaKind::Video => &mut state.video_attached,
                MediaKind::Audio => &mut state.audio_attached,
            };
            if *slot {
                gst::error!(CAT, "{} output of {} is busy", kind, key);
                return Err(OutputError::Busy {
                    name: key.to_owned(),
                    kind,
                });
            }
            *slot = true;
        }

        Ok(OutputHandle {
            registry: self.clone(),
            output,
            kind,
        })
    }

    /// Frees the producer slot; the last release destroys the sender.
    fn release(&self, output: &Arc<Output>, kind: MediaKind) {
        let removed = {
            let mut outputs = self.lock();
            let empty = {
                let mut state = output.lock();
                match kind {
                    MediaKind::Video => {
                        state.video_attached = false;
                        state.video = None;
                    }
                    MediaKind::Audio => {
                        state.audio_attached = false;
                        state.audio = None;
                    }
                }
                !state.video_attached && !state.audio_attached
            };
            gst::info!(CAT, "Released {} output of {}", kind, output.key);

            let current = outputs
                .get(&output.key)
                .is_some_and(|o| Arc::ptr_eq(o, output));
            if empty && current {
                outputs.remove(&output.key)
            } else {
                None
            }
        };

        if let Some(output) = removed {
            trace!("Destroying output {}", output.key);
        }
    }

    /// Number of live senders.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

/// A claimed producer slot of an [`Output`]; released on drop.
pub struct OutputHandle {
    registry: Arc<OutputRegistry>,
    output: Arc<Output>,
    kind: MediaKind,
}

impl OutputHandle {
    pub fn output(&self) -> &Arc<Output> {
        &self.output
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.registry.release(&self.output, self.kind);
    }
}
