// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use crate::ndioutput::OutputHandle;

/// Default value for device-name (empty = let the SDK choose)
pub(crate) const DEFAULT_DEVICE_NAME: &str = "";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// NDI sender name
    pub device_name: Option<String>,
}

#[derive(Default)]
pub struct Context {
    /// Claimed video slot of the shared sender (None when stopped)
    pub handle: Option<OutputHandle>,
}
