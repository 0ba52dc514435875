// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

//! State Management for the NDI Video Source

use std::sync::Arc;
use std::time::Duration;

use gstreamer as gst;

use crate::ndiinput::{InputHandle, InputRegistry, VideoFormat};

/// Default value for device-path (empty = must be set by user)
pub(crate) const DEFAULT_DEVICE_PATH: &str = "";

/// Default value for device-name
pub(crate) const DEFAULT_DEVICE_NAME: &str = "";

/// How long start() waits for the first frame of the source.
pub(crate) const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// User-configurable settings for the ndivideosrc element.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// URL address of the NDI source
    pub device_path: Option<String>,

    /// NDI source name
    pub device_name: Option<String>,
}

/// Runtime state, present between start() and stop().
pub struct State {
    /// Claimed video slot of the shared input; released on drop
    pub handle: InputHandle,

    /// Format the caps were derived from
    pub format: VideoFormat,

    /// Caps offered to downstream
    pub caps: gst::Caps,

    /// Most recent frame, repeated when no new frame arrives in time
    pub last_buffer: gst::Buffer,

    /// Number of buffers produced so far
    pub n_frames: u64,

    /// Set once the sender changed format; create() then returns EOS
    pub eos: bool,
}

#[derive(Default)]
pub struct Context {
    /// The element's state (None when stopped, Some when started)
    pub state: Option<State>,

    /// Registry start() claims from; the global one when unset
    pub registry: Option<Arc<InputRegistry>>,
}
