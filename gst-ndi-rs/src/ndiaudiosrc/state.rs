// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use crate::ndiinput::{AudioFormat, InputHandle, InputRegistry};

pub(crate) const DEFAULT_DEVICE_PATH: &str = "";

pub(crate) const DEFAULT_DEVICE_NAME: &str = "";

/// How long caps negotiation waits for the first audio frame.
pub(crate) const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// How long create() waits for a frame before emitting silence.
pub(crate) const FRAME_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub device_path: Option<String>,
    pub device_name: Option<String>,
}

pub struct State {
    /// Claimed audio slot of the shared input; released on drop
    pub handle: InputHandle,

    /// Negotiated format, set by set_caps()
    pub format: Option<AudioFormat>,

    /// Size in bytes of the last frame, used for silence
    pub last_size: usize,

    /// Samples per channel produced so far
    pub n_samples: u64,

    /// True once a real frame has been output
    pub received: bool,

    /// Set once the sender changed format; create() then returns EOS
    pub eos: bool,
}

#[derive(Default)]
pub struct Context {
    pub state: Option<State>,

    /// Registry start() claims from; the global one when unset
    pub registry: Option<Arc<InputRegistry>>,
}
