// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use crate::ndioutput::OutputHandle;

pub(crate) const DEFAULT_DEVICE_NAME: &str = "";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub device_name: Option<String>,
}

#[derive(Default)]
pub struct Context {
    pub handle: Option<OutputHandle>,
}
