// SPDX-FileCopyrightText: 2025 Contributors to the gst-ndi project.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::CStr;

/// An NDI source announced on the network.
///
/// The url address is unique per source and is used as its identity
/// throughout the plugin; the name is the human readable label and may
/// change while the address stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub name: String,
    pub url_address: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_address: url_address.into(),
        }
    }

    /// Copies a source record out of SDK-owned memory.
    ///
    /// # Safety
    /// Both string pointers must be null or point to valid C strings.
    pub(crate) unsafe fn from_raw(raw: &ndi_sys::NDIlib_source_t) -> Self {
        let name = unsafe { c_string_or_empty(raw.p_ndi_name) };
        let url_address = unsafe { c_string_or_empty(raw.p_url_address) };
        Self { name, url_address }
    }
}

unsafe fn c_string_or_empty(ptr: *const std::os::raw::c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}
